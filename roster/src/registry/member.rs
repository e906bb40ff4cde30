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

use hashbrown::HashMap;
use itertools::Itertools;
use roster_common::{
    assert::{release_count, retain_count},
    snowflake::Id,
};
use roster_memory::{BoxCacheView, EmptyView, EntityRecord, MappingView, Tombstone};

use super::Registry;
use crate::{
    model::{Member, MemberPresence, VoiceState},
    payload::{MemberPayload, PresencePayload, VoiceStatePayload},
    record::{MemberRecord, PresenceRecord, VoiceStateRecord},
};

impl Registry {
    fn member_record(&self, guild_id: Id, user_id: Id) -> Option<&MemberRecord> {
        self.guilds.get(&guild_id)?.members.as_ref()?.get(&user_id)
    }

    fn member_record_mut(&mut self, guild_id: Id, user_id: Id) -> Option<&mut MemberRecord> {
        self.guilds.get_mut(&guild_id)?.members.as_mut()?.get_mut(&user_id)
    }

    fn build_member(&self, record: &MemberRecord) -> Member {
        record.build(self.held_user(record.user_id))
    }

    pub(super) fn member_ids(&self, guild_id: Id) -> impl Iterator<Item = Id> + '_ {
        self.guilds
            .get(&guild_id)
            .and_then(|r| r.members.as_ref())
            .into_iter()
            .flat_map(|m| m.iter().filter(|(_, r)| !r.has_been_deleted).map(|(id, _)| *id))
    }

    /// Insert or merge a member of `guild_id`, merging its user as well.
    ///
    /// Parsing a member that was deleted while a voice state still referred to it brings it back.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_member"))]
    pub fn parse_member(&mut self, payload: &MemberPayload, guild_id: Id) -> Member {
        Self::check_guild("member", payload.guild_id, guild_id);
        let user_id = payload.user.id;
        let is_new = self.member_record(guild_id, user_id).is_none();
        let user = self.upsert_user(&payload.user, is_new);

        let record = self
            .guild_mut(guild_id)
            .members
            .get_or_insert_with(HashMap::new)
            .entry(user_id)
            .or_insert_with(|| MemberRecord {
                guild_id,
                user_id,
                ..Default::default()
            });
        record.has_been_deleted = false;
        record.merge(payload);
        tracing::trace!(%guild_id, %user_id, is_new, "[registry]: parse member");
        record.build(user)
    }

    /// Merge a member update.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_member"))]
    pub fn update_member(&mut self, payload: &MemberPayload, guild_id: Id) -> Option<(Member, Member)> {
        let user_id = payload.user.id;
        let old = self
            .member_record(guild_id, user_id)
            .filter(|r| !r.has_been_deleted)
            .map(|r| self.build_member(r))?;

        let user = self.upsert_user(&payload.user, false);
        let record = self.member_record_mut(guild_id, user_id)?;
        record.merge(payload);
        Some((old, record.build(user)))
    }

    /// Remove a member.
    ///
    /// A member a voice state still refers to is kept as a tombstone: it disappears from lookups and views,
    /// and the voice state reports it as deleted.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_member"))]
    pub fn delete_member(&mut self, guild_id: Id, user_id: Id) -> Option<Member> {
        let record = self.member_record_mut(guild_id, user_id)?;
        if record.has_been_deleted {
            return None;
        }
        record.has_been_deleted = true;
        let collectable = record.is_collectable();
        let record = record.clone();

        let member = self.build_member(&record);
        if collectable {
            if let Some(members) = self.guilds.get_mut(&guild_id).and_then(|r| r.members.as_mut()) {
                members.remove(&user_id);
            }
            self.release_user(user_id);
            self.discard_guild_if_empty(guild_id);
        } else {
            tracing::debug!(%guild_id, %user_id, refs = record.ref_count, "[registry]: keep deleted member as tombstone");
        }
        Some(member)
    }

    /// Remove every member of a guild.
    pub fn clear_members_for_guild(&mut self, guild_id: Id) -> Vec<Member> {
        self.member_ids(guild_id)
            .collect_vec()
            .into_iter()
            .filter_map(|user_id| self.delete_member(guild_id, user_id))
            .collect()
    }

    /// Look up a member. Deleted members miss.
    pub fn get_member(&self, guild_id: Id, user_id: Id) -> Option<Member> {
        self.member_record(guild_id, user_id)
            .filter(|r| !r.has_been_deleted)
            .map(|r| self.build_member(r))
    }

    /// The members of a guild.
    pub fn members_view(&self, guild_id: Id) -> BoxCacheView<'_, Id, Member> {
        match self.guilds.get(&guild_id).and_then(|r| r.members.as_ref()) {
            Some(members) => Box::new(
                MappingView::with_builder(members, |_, r: &MemberRecord| Some(self.build_member(r)))
                    .with_predicate(|_, r| !r.has_been_deleted),
            ),
            None => Box::new(EmptyView),
        }
    }

    pub(super) fn presence_ids(&self, guild_id: Id) -> impl Iterator<Item = Id> + '_ {
        self.guilds
            .get(&guild_id)
            .and_then(|r| r.presences.as_ref())
            .into_iter()
            .flat_map(|p| p.keys().copied())
    }

    fn build_presence(&self, record: &PresenceRecord) -> MemberPresence {
        let emojis = record
            .activities
            .iter()
            .map(|a| a.emoji.as_ref().and_then(|e| self.resolve_emoji(e)))
            .collect();
        record.build(emojis)
    }

    /// Insert or merge the presence of a member of `guild_id`.
    ///
    /// Activities in the payload replace the cached ones. Their emojis are held until replaced.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_presence"))]
    pub fn parse_presence(&mut self, payload: &PresencePayload, guild_id: Id) -> MemberPresence {
        Self::check_guild("presence", payload.guild_id, guild_id);
        let user_id = payload.user.id;
        let activities = payload
            .activities
            .as_ref()
            .map(|activities| activities.iter().map(|a| self.capture_activity(a)).collect_vec());

        let record = self
            .guild_mut(guild_id)
            .presences
            .get_or_insert_with(HashMap::new)
            .entry(user_id)
            .or_insert_with(|| PresenceRecord {
                user_id,
                guild_id,
                ..Default::default()
            });
        record.merge(payload);
        let replaced = activities
            .map(|activities| std::mem::replace(&mut record.activities, activities))
            .unwrap_or_default();
        let record = record.clone();

        for activity in replaced {
            if let Some(emoji) = &activity.emoji {
                self.release_emoji(emoji);
            }
        }
        tracing::trace!(%guild_id, %user_id, "[registry]: parse presence");
        self.build_presence(&record)
    }

    /// Merge a presence update.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_presence"))]
    pub fn update_presence(
        &mut self,
        payload: &PresencePayload,
        guild_id: Id,
    ) -> Option<(MemberPresence, MemberPresence)> {
        let old = self.get_presence(guild_id, payload.user.id)?;
        let new = self.parse_presence(payload, guild_id);
        Some((old, new))
    }

    /// Remove a presence, releasing the emojis its activities held.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_presence"))]
    pub fn delete_presence(&mut self, guild_id: Id, user_id: Id) -> Option<MemberPresence> {
        let record = self.guilds.get_mut(&guild_id)?.presences.as_mut()?.remove(&user_id)?;
        let presence = self.build_presence(&record);
        for emoji in record.emoji_refs() {
            self.release_emoji(emoji);
        }
        self.discard_guild_if_empty(guild_id);
        Some(presence)
    }

    /// Remove every presence of a guild.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::clear_presences_for_guild"))]
    pub fn clear_presences_for_guild(&mut self, guild_id: Id) -> Vec<MemberPresence> {
        self.presence_ids(guild_id)
            .collect_vec()
            .into_iter()
            .filter_map(|user_id| self.delete_presence(guild_id, user_id))
            .collect()
    }

    /// Look up a presence.
    pub fn get_presence(&self, guild_id: Id, user_id: Id) -> Option<MemberPresence> {
        let record = self.guilds.get(&guild_id)?.presences.as_ref()?.get(&user_id)?;
        Some(self.build_presence(record))
    }

    /// The presences of a guild.
    pub fn presences_view(&self, guild_id: Id) -> BoxCacheView<'_, Id, MemberPresence> {
        match self.guilds.get(&guild_id).and_then(|r| r.presences.as_ref()) {
            Some(presences) => Box::new(MappingView::with_builder(presences, |_, r: &PresenceRecord| {
                Some(self.build_presence(r))
            })),
            None => Box::new(EmptyView),
        }
    }

    pub(super) fn voice_state_ids(&self, guild_id: Id) -> impl Iterator<Item = Id> + '_ {
        self.guilds
            .get(&guild_id)
            .and_then(|r| r.voice_states.as_ref())
            .into_iter()
            .flat_map(|v| v.keys().copied())
    }

    fn build_voice_state(&self, record: &VoiceStateRecord) -> VoiceState {
        let member = self.member_record(record.guild_id, record.user_id);
        roster_common::strict_assert!(member.is_some(), "voice state of {} holds no member", record.user_id);
        let member = member.map_or_else(
            || Member {
                guild_id: record.guild_id,
                user: self.held_user(record.user_id),
                ..Default::default()
            },
            |member| self.build_member(member),
        );
        record.build(member)
    }

    /// Insert or merge a voice state of `guild_id`. The voice state holds its member.
    ///
    /// The member is taken from the payload, or from the cache if the payload carries none. Returns `None` and
    /// caches nothing if the member is in neither.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_voice_state"))]
    pub fn parse_voice_state(&mut self, payload: &VoiceStatePayload, guild_id: Id) -> Option<VoiceState> {
        Self::check_guild("voice state", payload.guild_id, guild_id);
        let user_id = payload.user_id;
        match &payload.member {
            Some(member) => {
                self.parse_member(member, guild_id);
            }
            None if self.member_record(guild_id, user_id).is_some() => {}
            None => {
                tracing::warn!(%guild_id, %user_id, "[registry]: voice state of an unknown member, skipped");
                return None;
            }
        }

        let record = self.guild_mut(guild_id);
        let states = record.voice_states.get_or_insert_with(HashMap::new);
        let is_new = !states.contains_key(&user_id);
        let state = states.entry(user_id).or_insert_with(|| VoiceStateRecord {
            guild_id,
            user_id,
            ..Default::default()
        });
        state.merge(payload);
        let state = state.clone();

        if is_new {
            if let Some(member) = record.members.as_mut().and_then(|m| m.get_mut(&user_id)) {
                retain_count(&mut member.ref_count, 1);
            }
        }
        tracing::trace!(%guild_id, %user_id, is_new, "[registry]: parse voice state");
        Some(self.build_voice_state(&state))
    }

    /// Merge a voice state update.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_voice_state"))]
    pub fn update_voice_state(
        &mut self,
        payload: &VoiceStatePayload,
        guild_id: Id,
    ) -> Option<(VoiceState, VoiceState)> {
        let old = self.get_voice_state(guild_id, payload.user_id)?;
        let new = self.parse_voice_state(payload, guild_id)?;
        Some((old, new))
    }

    /// Remove a voice state, releasing its member. A deleted member nothing else refers to goes with it.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_voice_state"))]
    pub fn delete_voice_state(&mut self, guild_id: Id, user_id: Id) -> Option<VoiceState> {
        let record = self.guilds.get_mut(&guild_id)?.voice_states.as_mut()?.remove(&user_id)?;
        let state = self.build_voice_state(&record);

        let collect = match self.member_record_mut(guild_id, user_id) {
            Some(member) => {
                release_count(&mut member.ref_count);
                member.is_collectable()
            }
            None => false,
        };
        if collect {
            if let Some(members) = self.guilds.get_mut(&guild_id).and_then(|r| r.members.as_mut()) {
                members.remove(&user_id);
            }
            self.release_user(user_id);
            tracing::debug!(%guild_id, %user_id, "[registry]: collect deleted member with its last voice state");
        }
        self.discard_guild_if_empty(guild_id);
        Some(state)
    }

    /// Remove every voice state of a guild.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::clear_voice_states_for_guild"))]
    pub fn clear_voice_states_for_guild(&mut self, guild_id: Id) -> Vec<VoiceState> {
        self.voice_state_ids(guild_id)
            .collect_vec()
            .into_iter()
            .filter_map(|user_id| self.delete_voice_state(guild_id, user_id))
            .collect()
    }

    /// Remove the voice states of a guild connected to `channel_id`.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::clear_voice_states_for_channel"))]
    pub fn clear_voice_states_for_channel(&mut self, guild_id: Id, channel_id: Id) -> Vec<VoiceState> {
        let user_ids = self
            .guilds
            .get(&guild_id)
            .and_then(|r| r.voice_states.as_ref())
            .into_iter()
            .flat_map(|states| states.values())
            .filter(|state| state.channel_id == Some(channel_id))
            .map(|state| state.user_id)
            .collect_vec();
        user_ids
            .into_iter()
            .filter_map(|user_id| self.delete_voice_state(guild_id, user_id))
            .collect()
    }

    /// Look up a voice state.
    pub fn get_voice_state(&self, guild_id: Id, user_id: Id) -> Option<VoiceState> {
        let record = self.guilds.get(&guild_id)?.voice_states.as_ref()?.get(&user_id)?;
        Some(self.build_voice_state(record))
    }

    /// The voice states of a guild.
    pub fn voice_states_view(&self, guild_id: Id) -> BoxCacheView<'_, Id, VoiceState> {
        match self.guilds.get(&guild_id).and_then(|r| r.voice_states.as_ref()) {
            Some(states) => Box::new(MappingView::with_builder(states, |_, r: &VoiceStateRecord| {
                Some(self.build_voice_state(r))
            })),
            None => Box::new(EmptyView),
        }
    }

    /// The voice states of a guild connected to `channel_id`.
    pub fn voice_states_view_for_channel(&self, guild_id: Id, channel_id: Id) -> BoxCacheView<'_, Id, VoiceState> {
        match self.guilds.get(&guild_id).and_then(|r| r.voice_states.as_ref()) {
            Some(states) => Box::new(
                MappingView::with_builder(states, |_, r: &VoiceStateRecord| Some(self.build_voice_state(r)))
                    .with_predicate(move |_, r| r.channel_id == Some(channel_id)),
            ),
            None => Box::new(EmptyView),
        }
    }
}

#[cfg(test)]
mod tests {
    use roster_memory::CacheView;
    use serde_json::json;

    use super::*;
    use crate::{model::Status, payload::UserPayload, RegistryBuilder};

    const GUILD: Id = Id::new(100);

    fn member(user_id: u64, nick: Option<&str>) -> MemberPayload {
        MemberPayload {
            user: UserPayload {
                id: Id::new(user_id),
                username: Some(format!("user{user_id}")),
                ..Default::default()
            },
            nick: nick.map(|n| Some(n.to_string())),
            roles: Some(vec![]),
            ..Default::default()
        }
    }

    fn voice(user_id: u64, channel_id: u64) -> VoiceStatePayload {
        VoiceStatePayload {
            user_id: Id::new(user_id),
            channel_id: Some(Some(Id::new(channel_id))),
            session_id: Some("abc".into()),
            ..Default::default()
        }
    }

    #[test_log::test]
    fn test_parse_member_idempotent() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        let first = registry.parse_member(&member(1, Some("crab")), GUILD);
        let second = registry.parse_member(&member(1, Some("crab")), GUILD);
        assert_eq!(first, second);
        assert_eq!(registry.users.get(&Id::new(1)).unwrap().ref_count(), 1);
        assert_eq!(registry.member_record(GUILD, Id::new(1)).unwrap().ref_count, 0);
    }

    #[test_log::test]
    fn test_update_member_keeps_omitted() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        assert!(registry.update_member(&member(1, None), GUILD).is_none());
        assert!(registry.get_member(GUILD, Id::new(1)).is_none());

        registry.parse_member(&member(1, Some("crab")), GUILD);
        let (old, new) = registry
            .update_member(
                &MemberPayload {
                    user: UserPayload {
                        id: Id::new(1),
                        ..Default::default()
                    },
                    deaf: Some(true),
                    ..Default::default()
                },
                GUILD,
            )
            .unwrap();
        assert!(!old.is_deaf);
        assert!(new.is_deaf);
        assert_eq!(new.nickname.as_deref(), Some("crab"));
        assert_eq!(new.user.username, "user1");
    }

    #[test_log::test]
    fn test_voice_state_keeps_deleted_member() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.parse_member(&member(1, None), GUILD);
        registry.parse_voice_state(&voice(1, 50), GUILD).unwrap();

        let deleted = registry.delete_member(GUILD, Id::new(1)).unwrap();
        assert!(deleted.is_deleted);
        assert!(registry.get_member(GUILD, Id::new(1)).is_none());
        assert!(registry.members_view(GUILD).is_empty());

        let state = registry.get_voice_state(GUILD, Id::new(1)).unwrap();
        assert!(state.member.is_deleted);
        assert_eq!(state.member.user.username, "user1");
        assert!(registry.delete_member(GUILD, Id::new(1)).is_none());

        registry.delete_voice_state(GUILD, Id::new(1)).unwrap();
        assert!(registry.get_user_by_id(Id::new(1)).is_none());
        assert!(registry.guilds.get(&GUILD).is_none());
    }

    #[test_log::test]
    fn test_voice_state_without_member_is_skipped() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        assert!(registry.parse_voice_state(&voice(1, 50), GUILD).is_none());
        assert!(registry.voice_states_view(GUILD).is_empty());

        let mut payload = voice(2, 50);
        payload.member = Some(member(2, None));
        let state = registry.parse_voice_state(&payload, GUILD).unwrap();
        assert_eq!(state.member.user.id, Id::new(2));
        registry.parse_voice_state(&voice(2, 51), GUILD).unwrap();
        assert_eq!(registry.member_record(GUILD, Id::new(2)).unwrap().ref_count, 1);

        assert_eq!(registry.voice_states_view_for_channel(GUILD, Id::new(51)).len(), 1);
        assert!(registry.voice_states_view_for_channel(GUILD, Id::new(50)).is_empty());
    }

    #[test_log::test]
    fn test_clear_voice_states() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        for (user_id, channel_id) in [(1, 50), (2, 50), (3, 51)] {
            let mut payload = voice(user_id, channel_id);
            payload.member = Some(member(user_id, None));
            registry.parse_voice_state(&payload, GUILD).unwrap();
        }
        registry.delete_member(GUILD, Id::new(1));

        let mut cleared = registry.clear_voice_states_for_channel(GUILD, Id::new(50));
        cleared.sort_by_key(|s| s.user_id);
        assert_eq!(cleared.iter().map(|s| s.user_id).collect_vec(), vec![Id::new(1), Id::new(2)]);
        assert!(registry.voice_states_view_for_channel(GUILD, Id::new(50)).is_empty());
        // The deleted member went with its last voice state; the live one stays.
        assert!(registry.get_user_by_id(Id::new(1)).is_none());
        assert_eq!(registry.member_record(GUILD, Id::new(2)).unwrap().ref_count, 0);

        let cleared = registry.clear_voice_states_for_guild(GUILD);
        assert_eq!(cleared.len(), 1);
        assert!(registry.voice_states_view(GUILD).is_empty());
        assert_eq!(registry.members_view(GUILD).len(), 2);
        assert!(registry.clear_voice_states_for_guild(GUILD).is_empty());
    }

    #[test_log::test]
    fn test_clear_presences() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        for user_id in ["1", "2"] {
            registry.parse_presence(
                &serde_json::from_value(json!({ "user": { "id": user_id }, "status": "online" })).unwrap(),
                GUILD,
            );
        }
        registry.parse_presence(
            &serde_json::from_value(json!({ "user": { "id": "1" }, "status": "dnd" })).unwrap(),
            Id::new(101),
        );

        let cleared = registry.clear_presences_for_guild(GUILD);
        assert_eq!(cleared.len(), 2);
        assert!(registry.presences_view(GUILD).is_empty());
        assert!(registry.guilds.get(&GUILD).is_none());
        assert_eq!(registry.get_presence(Id::new(101), Id::new(1)).unwrap().status, Status::Dnd);
    }

    #[test_log::test]
    fn test_presence_update() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        let payload: PresencePayload = serde_json::from_value(json!({
            "user": { "id": "1" },
            "status": "online",
            "activities": [{ "name": "Rust", "type": 0 }],
            "client_status": { "desktop": "online" },
        }))
        .unwrap();
        assert!(registry.update_presence(&payload, GUILD).is_none());
        registry.parse_presence(&payload, GUILD);

        let (old, new) = registry
            .update_presence(
                &serde_json::from_value(json!({ "user": { "id": "1" }, "status": "idle" })).unwrap(),
                GUILD,
            )
            .unwrap();
        assert_eq!(old.status, Status::Online);
        assert_eq!(new.status, Status::Idle);
        assert_eq!(new.activities.len(), 1);
        assert_eq!(new.client_status.desktop, Status::Online);

        assert!(registry.delete_presence(GUILD, Id::new(1)).is_some());
        assert!(registry.presences_view(GUILD).is_empty());
    }
}
