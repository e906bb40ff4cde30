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

use roster_common::snowflake::Id;
use roster_memory::{BoxCacheView, EntityRecord, MappingView};

use super::Registry;
use crate::{model::Invite, payload::InvitePayload, record::InviteRecord};

impl Registry {
    fn build_invite(&self, record: &InviteRecord) -> Invite {
        let inviter = record.inviter_id.map(|id| self.held_user(id));
        let target_user = record.target_user_id.map(|id| self.held_user(id));
        record.build((inviter, target_user))
    }

    /// Insert or merge an invite, holding its inviter and target user.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_invite"))]
    pub fn parse_invite(&mut self, payload: &InvitePayload) -> Invite {
        let prev = self.invites.get(&payload.code);
        let prev_inviter = prev.and_then(|r| r.inviter_id);
        let prev_target = prev.and_then(|r| r.target_user_id);
        let is_new = prev.is_none();

        let inviter = self.swap_user(prev_inviter, payload.inviter.as_ref());
        let target_user = self.swap_user(prev_target, payload.target_user.as_ref());

        let record = self
            .invites
            .entry(payload.code.clone())
            .or_insert_with(|| InviteRecord {
                code: payload.code.clone(),
                guild_id: payload.guild_id,
                channel_id: payload.channel_id,
                ..Default::default()
            });
        record.inviter_id = inviter.as_ref().map(|u| u.id);
        record.target_user_id = target_user.as_ref().map(|u| u.id);
        record.merge(payload);
        let invite = record.build((inviter, target_user));

        if let Some(guild_id) = payload.guild_id.filter(|_| is_new) {
            self.guild_mut(guild_id)
                .invites
                .get_or_insert_with(Vec::new)
                .push(payload.code.clone());
        }
        tracing::trace!(code = %payload.code, is_new, "[registry]: parse invite");
        invite
    }

    /// Merge an invite update.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_invite"))]
    pub fn update_invite(&mut self, payload: &InvitePayload) -> Option<(Invite, Invite)> {
        let old = self.get_invite(&payload.code)?;
        let new = self.parse_invite(payload);
        Some((old, new))
    }

    /// Remove an invite.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_invite"))]
    pub fn delete_invite(&mut self, code: &str) -> Option<Invite> {
        let record = self.invites.remove(code)?;
        let invite = self.build_invite(&record);
        for user_id in record.user_ids() {
            self.release_user(user_id);
        }
        if let Some(guild_id) = record.guild_id {
            if let Some(codes) = self.guilds.get_mut(&guild_id).and_then(|r| r.invites.as_mut()) {
                codes.retain(|c| c != code);
            }
            self.discard_guild_if_empty(guild_id);
        }
        Some(invite)
    }

    fn clear_invites(&mut self, filter: impl Fn(&InviteRecord) -> bool) -> Vec<Invite> {
        let codes = self
            .invites
            .iter()
            .filter(|(_, r)| filter(r))
            .map(|(code, _)| code.clone())
            .collect::<Vec<_>>();
        codes.iter().filter_map(|code| self.delete_invite(code)).collect()
    }

    /// Remove every invite of a guild.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::clear_invites_for_guild"))]
    pub fn clear_invites_for_guild(&mut self, guild_id: Id) -> Vec<Invite> {
        self.clear_invites(|r| r.guild_id == Some(guild_id))
    }

    /// Remove every invite of a guild pointing at `channel_id`.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::clear_invites_for_channel"))]
    pub fn clear_invites_for_channel(&mut self, guild_id: Id, channel_id: Id) -> Vec<Invite> {
        self.clear_invites(|r| r.guild_id == Some(guild_id) && r.channel_id == channel_id)
    }

    /// Look up an invite by code.
    pub fn get_invite(&self, code: &str) -> Option<Invite> {
        self.invites.get(code).map(|r| self.build_invite(r))
    }

    /// The invites of a guild.
    pub fn invites_view(&self, guild_id: Id) -> BoxCacheView<'_, String, Invite> {
        Box::new(
            MappingView::with_builder(&self.invites, |_, r: &InviteRecord| Some(self.build_invite(r)))
                .with_predicate(move |_, r| r.guild_id == Some(guild_id)),
        )
    }

    /// The invites of a guild pointing at `channel_id`.
    pub fn invites_view_for_channel(&self, guild_id: Id, channel_id: Id) -> BoxCacheView<'_, String, Invite> {
        Box::new(
            MappingView::with_builder(&self.invites, |_, r: &InviteRecord| Some(self.build_invite(r)))
                .with_predicate(move |_, r| r.guild_id == Some(guild_id) && r.channel_id == channel_id),
        )
    }

    /// Every cached invite.
    pub fn all_invites_view(&self) -> BoxCacheView<'_, String, Invite> {
        Box::new(MappingView::with_builder(&self.invites, |_, r: &InviteRecord| {
            Some(self.build_invite(r))
        }))
    }
}

#[cfg(test)]
mod tests {
    use roster_memory::CacheView;
    use serde_json::json;

    use super::*;
    use crate::RegistryBuilder;

    fn invite(code: &str, guild_id: u64, inviter: u64) -> InvitePayload {
        serde_json::from_value(json!({
            "code": code,
            "guild_id": guild_id.to_string(),
            "channel_id": "5",
            "inviter": { "id": inviter.to_string(), "username": format!("user{inviter}") },
            "uses": 0,
            "max_age": 3600,
        }))
        .unwrap()
    }

    #[test_log::test]
    fn test_invite_lifecycle() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.parse_invite(&invite("abc", 1, 10));
        registry.parse_invite(&invite("def", 2, 10));
        let reparsed = registry.parse_invite(&InvitePayload {
            code: "abc".into(),
            channel_id: Id::new(5),
            uses: Some(3),
            ..Default::default()
        });
        assert_eq!(reparsed.uses, 3);
        assert_eq!(reparsed.max_age, 3600);
        assert_eq!(reparsed.inviter.unwrap().username, "user10");
        assert_eq!(registry.users.get(&Id::new(10)).unwrap().ref_count(), 2);

        assert_eq!(registry.invites_view(Id::new(1)).keys().collect::<Vec<_>>(), vec!["abc".to_string()]);
        assert_eq!(registry.all_invites_view().len(), 2);

        registry.delete_invite("abc").unwrap();
        assert!(registry.get_invite("abc").is_none());
        assert!(registry.guilds.get(&Id::new(1)).is_none());
        assert!(registry.delete_invite("abc").is_none());

        registry.delete_guild(Id::new(2));
        assert!(registry.get_invite("def").is_none());
        assert!(registry.get_user_by_id(Id::new(10)).is_none());
    }

    #[test_log::test]
    fn test_update_invite() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        let update = InvitePayload {
            code: "abc".into(),
            channel_id: Id::new(5),
            uses: Some(7),
            ..Default::default()
        };
        assert!(registry.update_invite(&update).is_none());
        assert!(registry.get_invite("abc").is_none());

        registry.parse_invite(&invite("abc", 1, 10));
        let (old, new) = registry.update_invite(&update).unwrap();
        assert_eq!(old.uses, 0);
        assert_eq!(new.uses, 7);
        assert_eq!(new.max_age, 3600);
        assert_eq!(new.inviter.unwrap().id, Id::new(10));
        assert_eq!(registry.users.get(&Id::new(10)).unwrap().ref_count(), 1);
    }

    #[test_log::test]
    fn test_clear_invites() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.parse_invite(&invite("abc", 1, 10));
        registry.parse_invite(&invite("def", 1, 11));
        let mut elsewhere = invite("ghi", 1, 12);
        elsewhere.channel_id = Id::new(6);
        registry.parse_invite(&elsewhere);
        registry.parse_invite(&invite("jkl", 2, 10));

        let mut codes = registry.invites_view_for_channel(Id::new(1), Id::new(5)).keys().collect::<Vec<_>>();
        codes.sort();
        assert_eq!(codes, vec!["abc".to_string(), "def".to_string()]);
        assert!(registry.invites_view_for_channel(Id::new(2), Id::new(6)).is_empty());

        let mut cleared = registry.clear_invites_for_channel(Id::new(1), Id::new(5));
        cleared.sort_by(|a, b| a.code.cmp(&b.code));
        assert_eq!(cleared.iter().map(|i| i.code.as_str()).collect::<Vec<_>>(), vec!["abc", "def"]);
        assert!(registry.get_user_by_id(Id::new(11)).is_none());
        assert!(registry.get_invite("ghi").is_some());

        let cleared = registry.clear_invites_for_guild(Id::new(1));
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0].code, "ghi");
        assert!(registry.invites_view(Id::new(1)).is_empty());
        assert!(registry.guilds.get(&Id::new(1)).is_none());
        assert_eq!(registry.all_invites_view().len(), 1);
        assert!(registry.get_user_by_id(Id::new(10)).is_some());
    }
}
