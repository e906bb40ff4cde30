// Copyright 2026 roster Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use roster_common::{id_set::IdSet, snowflake::Id};
use roster_memory::{BoxCacheView, EmptyView, EntityRecord, IdSubset, MappingView, Merge};

use super::Registry;
use crate::{
    model::{Channel, GuildChannel, PrivateChannel},
    payload::{GuildChannelPayload, PrivateChannelPayload},
    record::PrivateChannelRecord,
};

impl Registry {
    pub(super) fn channel_ids(&self, guild_id: Id) -> impl Iterator<Item = Id> + '_ {
        self.guilds
            .get(&guild_id)
            .and_then(|r| r.channels.as_ref())
            .into_iter()
            .flat_map(IdSet::iter)
    }

    /// Insert or merge a channel of `guild_id`.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_guild_channel"))]
    pub fn parse_guild_channel(&mut self, payload: &GuildChannelPayload, guild_id: Id) -> GuildChannel {
        Self::check_guild("guild channel", payload.guild_id, guild_id);
        let channel = match self.guild_channels.get_mut(&payload.id) {
            Some(channel) => {
                channel.merge(payload);
                channel.clone()
            }
            None => {
                let channel = GuildChannel::from_payload(payload, guild_id);
                self.guild_channels.insert(channel.id, channel.clone());
                channel
            }
        };
        self.guild_mut(guild_id)
            .channels
            .get_or_insert_with(IdSet::new)
            .add(channel.id);
        tracing::trace!(%guild_id, channel_id = %channel.id, "[registry]: parse guild channel");
        channel
    }

    /// Merge a channel update.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_guild_channel"))]
    pub fn update_guild_channel(&mut self, payload: &GuildChannelPayload) -> Option<(GuildChannel, GuildChannel)> {
        let channel = self.guild_channels.get_mut(&payload.id)?;
        let old = channel.clone();
        channel.merge(payload);
        Some((old, channel.clone()))
    }

    /// Remove a guild channel.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_guild_channel"))]
    pub fn delete_guild_channel(&mut self, channel_id: Id) -> Option<GuildChannel> {
        let channel = self.guild_channels.remove(&channel_id)?;
        if let Some(channels) = self.guilds.get_mut(&channel.guild_id).and_then(|r| r.channels.as_mut()) {
            channels.discard(channel_id);
        }
        self.discard_guild_if_empty(channel.guild_id);
        tracing::trace!(guild_id = %channel.guild_id, %channel_id, "[registry]: delete guild channel");
        Some(channel)
    }

    /// Remove every channel of a guild.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::clear_guild_channels_for_guild"))]
    pub fn clear_guild_channels_for_guild(&mut self, guild_id: Id) -> Vec<GuildChannel> {
        self.channel_ids(guild_id)
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|channel_id| self.delete_guild_channel(channel_id))
            .collect()
    }

    /// Look up a guild channel.
    pub fn get_guild_channel_by_id(&self, channel_id: Id) -> Option<GuildChannel> {
        self.guild_channels.get(&channel_id).cloned()
    }

    /// Look up any channel, guild or private.
    pub fn get_channel_by_id(&self, channel_id: Id) -> Option<Channel> {
        self.get_guild_channel_by_id(channel_id)
            .map(Channel::Guild)
            .or_else(|| self.get_private_channel_by_id(channel_id).map(Channel::Private))
    }

    /// The channels of a guild.
    pub fn guild_channels_view(&self, guild_id: Id) -> BoxCacheView<'_, Id, GuildChannel> {
        match self.guilds.get(&guild_id).and_then(|r| r.channels.as_ref()) {
            Some(ids) => Box::new(MappingView::new(IdSubset::new(ids, &self.guild_channels))),
            None => Box::new(EmptyView),
        }
    }

    /// Every cached guild channel.
    pub fn all_guild_channels_view(&self) -> BoxCacheView<'_, Id, GuildChannel> {
        Box::new(MappingView::new(&self.guild_channels))
    }

    fn build_private_channel(&self, record: &PrivateChannelRecord) -> PrivateChannel {
        record.build(self.held_user(record.recipient_id))
    }

    /// Drop private channels evicted as idle, except `keep`, which the caller is re-inserting.
    pub(super) fn release_private_channels(&mut self, evicted: Vec<(Id, PrivateChannelRecord)>, keep: Option<Id>) {
        for (channel_id, record) in evicted {
            if Some(channel_id) == keep {
                continue;
            }
            self.release_user(record.recipient_id);
        }
    }

    /// Insert or refresh a private channel.
    ///
    /// Private channels are kept while they see messages and forgotten once idle for longer than the configured
    /// expiry.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_private_channel"))]
    pub fn parse_private_channel(&mut self, payload: &PrivateChannelPayload) -> PrivateChannel {
        let channel_id = payload.id;
        let prev = self.private_channels.get(&channel_id).cloned();
        let recipient = self
            .swap_user(prev.as_ref().map(|r| r.recipient_id), Some(&payload.recipient))
            .unwrap_or_default();

        let mut record = prev.clone().unwrap_or_else(|| PrivateChannelRecord {
            id: channel_id,
            ..Default::default()
        });
        record.merge(payload);
        record.recipient_id = recipient.id;
        let channel = record.build(recipient);

        self.put_private_channel(record, prev.and_then(|r| r.last_message_id));
        tracing::trace!(%channel_id, "[registry]: parse private channel");
        channel
    }

    /// Store `record`, moving it to the back only if its activity is newer than `prev_activity`.
    pub(super) fn put_private_channel(&mut self, record: PrivateChannelRecord, prev_activity: Option<Id>) {
        let channel_id = record.id;
        if let Some(slot) = self.private_channels.get_mut(&channel_id) {
            if record.last_message_id <= prev_activity {
                *slot = record;
                return;
            }
        }
        let evicted = self.private_channels.insert(channel_id, record);
        self.release_private_channels(evicted, Some(channel_id));
    }

    /// Remove a private channel, dropping any channel that went idle meanwhile.
    pub fn delete_private_channel(&mut self, channel_id: Id) -> Option<PrivateChannel> {
        let (record, evicted) = self.private_channels.remove(&channel_id);
        self.release_private_channels(evicted, None);
        let record = record?;
        let channel = self.build_private_channel(&record);
        self.release_user(record.recipient_id);
        Some(channel)
    }

    /// Remove every private channel.
    pub fn clear_private_channels(&mut self) -> Vec<PrivateChannel> {
        let drained = self.private_channels.drain();
        let channels = drained.iter().map(|(_, r)| self.build_private_channel(r)).collect();
        for (_, record) in drained {
            self.release_user(record.recipient_id);
        }
        channels
    }

    /// Look up a private channel.
    pub fn get_private_channel_by_id(&self, channel_id: Id) -> Option<PrivateChannel> {
        self.private_channels
            .get(&channel_id)
            .map(|r| self.build_private_channel(r))
    }

    /// Every cached private channel, least recently active first.
    pub fn private_channels_view(&self) -> BoxCacheView<'_, Id, PrivateChannel> {
        Box::new(MappingView::with_builder(
            &self.private_channels,
            |_, r: &PrivateChannelRecord| Some(self.build_private_channel(r)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::DateTime;
    use roster_common::clock::ManualClock;
    use roster_memory::CacheView;
    use serde_json::json;

    use super::*;
    use crate::{model::ChannelType, RegistryBuilder};

    fn dm(channel_id: u64, user_id: u64, last_message_id: Option<Id>) -> PrivateChannelPayload {
        let mut payload: PrivateChannelPayload = serde_json::from_value(json!({
            "id": channel_id.to_string(),
            "type": 1,
            "recipients": [{ "id": user_id.to_string(), "username": format!("user{user_id}") }],
        }))
        .unwrap();
        payload.last_message_id = Some(last_message_id);
        payload
    }

    #[test_log::test]
    fn test_guild_channel_lifecycle() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        let payload = GuildChannelPayload {
            id: Id::new(5),
            guild_id: Some(Id::new(1)),
            kind: Some(ChannelType::GuildText),
            name: Some("general".into()),
            ..Default::default()
        };
        let first = registry.parse_guild_channel(&payload, Id::new(1));
        let second = registry.parse_guild_channel(&payload, Id::new(1));
        assert_eq!(first, second);
        assert_eq!(registry.guild_channels_view(Id::new(1)).len(), 1);

        let (old, new) = registry
            .update_guild_channel(&GuildChannelPayload {
                id: Id::new(5),
                topic: Some(Some("crabs only".into())),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(old.topic, None);
        assert_eq!(new.topic.as_deref(), Some("crabs only"));
        assert_eq!(new.name, "general");

        assert!(registry.get_channel_by_id(Id::new(5)).unwrap().as_guild().is_some());
        registry.delete_guild_channel(Id::new(5)).unwrap();
        assert!(registry.get_channel_by_id(Id::new(5)).is_none());
        assert!(registry.guild_channels_view(Id::new(1)).is_empty());
        assert!(registry.delete_guild_channel(Id::new(5)).is_none());
    }

    #[test_log::test]
    fn test_clear_guild_channels() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        for (channel_id, guild_id) in [(5, 1), (6, 1), (7, 2)] {
            registry.parse_guild_channel(
                &GuildChannelPayload {
                    id: Id::new(channel_id),
                    name: Some(format!("channel{channel_id}")),
                    ..Default::default()
                },
                Id::new(guild_id),
            );
        }

        let mut cleared = registry.clear_guild_channels_for_guild(Id::new(1));
        cleared.sort_by_key(|c| c.id);
        assert_eq!(cleared.iter().map(|c| c.id).collect::<Vec<_>>(), vec![Id::new(5), Id::new(6)]);
        assert!(registry.guild_channels_view(Id::new(1)).is_empty());
        assert!(registry.get_guild_channel_by_id(Id::new(5)).is_none());
        assert_eq!(registry.all_guild_channels_view().len(), 1);
        assert!(registry.clear_guild_channels_for_guild(Id::new(1)).is_empty());
    }

    #[test_log::test]
    fn test_delete_private_channel_sweeps_idle() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);
        let mut registry = RegistryBuilder::new()
            .with_private_channel_expiry(Duration::from_secs(60))
            .with_clock(clock.clone())
            .build()
            .unwrap();

        registry.parse_private_channel(&dm(10, 20, Some(Id::from_datetime(start))));
        let later = start + chrono::TimeDelta::seconds(30);
        registry.parse_private_channel(&dm(11, 21, Some(Id::from_datetime(later))));
        registry.parse_private_channel(&dm(12, 22, Some(Id::from_datetime(later))));

        clock.advance(Duration::from_secs(70));
        let channel = registry.delete_private_channel(Id::new(12)).unwrap();
        assert_eq!(channel.recipient.id, Id::new(22));
        assert_eq!(registry.private_channels_view().keys().collect::<Vec<_>>(), vec![Id::new(11)]);
        assert!(registry.get_user_by_id(Id::new(20)).is_none());
        assert!(registry.get_user_by_id(Id::new(22)).is_none());
        assert!(registry.get_user_by_id(Id::new(21)).is_some());
    }

    #[test_log::test]
    fn test_private_channels_expire_oldest_first() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);
        let mut registry = RegistryBuilder::new()
            .with_private_channel_expiry(Duration::from_secs(60))
            .with_clock(clock.clone())
            .build()
            .unwrap();

        for (i, offset) in [0i64, 10, 20].into_iter().enumerate() {
            let at = start + chrono::TimeDelta::seconds(offset);
            registry.parse_private_channel(&dm(10 + i as u64, 20 + i as u64, Some(Id::from_datetime(at))));
        }
        clock.advance(Duration::from_secs(65));

        let at = start + chrono::TimeDelta::seconds(65);
        registry.parse_private_channel(&dm(13, 23, Some(Id::from_datetime(at))));

        let ids = registry.private_channels_view().keys().collect::<Vec<_>>();
        assert_eq!(ids, vec![Id::new(11), Id::new(12), Id::new(13)]);
        assert!(registry.get_user_by_id(Id::new(20)).is_none());
        assert!(registry.get_user_by_id(Id::new(21)).is_some());
    }

    #[test_log::test]
    fn test_reparse_keeps_recipient_held() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);
        let mut registry = RegistryBuilder::new()
            .with_private_channel_expiry(Duration::from_secs(60))
            .with_clock(clock.clone())
            .build()
            .unwrap();

        registry.parse_private_channel(&dm(10, 20, Some(Id::from_datetime(start))));
        clock.advance(Duration::from_secs(120));
        let now = Id::from_datetime(start + chrono::TimeDelta::seconds(120));
        let channel = registry.parse_private_channel(&dm(10, 20, Some(now)));

        assert_eq!(channel.recipient.id, Id::new(20));
        assert_eq!(registry.get_user_by_id(Id::new(20)).unwrap().username, "user20");
        assert_eq!(registry.private_channels_view().len(), 1);

        let cleared = registry.clear_private_channels();
        assert_eq!(cleared.len(), 1);
        assert!(registry.users_view().is_empty());
    }
}
