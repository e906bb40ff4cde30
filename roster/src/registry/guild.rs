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

use hashbrown::HashSet;
use itertools::Itertools;
use roster_common::{id_set::IdSet, snowflake::Id};
use roster_memory::{BoxCacheView, CacheView, EmptyView, IdSubset, MappingView, Merge};

use super::Registry;
use crate::{
    model::{Guild, Role},
    payload::{GuildPayload, RolePayload},
    record::GuildRecord,
};

impl Registry {
    /// Insert or merge a guild, together with any nested collections the payload carries.
    ///
    /// A payload flagged `unavailable` only marks the guild unavailable and returns `None`; cached state of the
    /// guild is kept until it becomes available again.
    ///
    /// A nested collection replaces the cached one: entities missing from it are deleted.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_guild"))]
    pub fn parse_guild(&mut self, payload: &GuildPayload) -> Option<Guild> {
        let guild_id = payload.id;
        if payload.unavailable == Some(true) {
            self.set_guild_availability(guild_id, false);
            return None;
        }

        let record = self.guild_mut(guild_id);
        record.is_available = Some(true);
        let guild = match &mut record.snapshot {
            Some(guild) => {
                guild.merge(payload);
                guild.clone()
            }
            slot => slot.insert(Guild::from_payload(payload)).clone(),
        };
        tracing::trace!(%guild_id, "[registry]: parse guild");

        self.ingest_nested(payload);
        Some(guild)
    }

    /// Merge a guild update. Roles and emojis carried by the payload replace the cached ones.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_guild"))]
    pub fn update_guild(&mut self, payload: &GuildPayload) -> Option<(Guild, Guild)> {
        let guild = self.guilds.get_mut(&payload.id)?.snapshot.as_mut()?;
        let old = guild.clone();
        guild.merge(payload);
        let new = guild.clone();

        self.ingest_nested(payload);
        Some((old, new))
    }

    fn ingest_nested(&mut self, payload: &GuildPayload) {
        let guild_id = payload.id;

        if let Some(roles) = &payload.roles {
            let keep: HashSet<Id> = roles.iter().map(|r| r.id).collect();
            for stale in self.role_ids(guild_id).filter(|id| !keep.contains(id)).collect_vec() {
                self.delete_role(guild_id, stale);
            }
            for role in roles {
                self.parse_role(role, guild_id);
            }
        }

        if let Some(channels) = &payload.channels {
            let keep: HashSet<Id> = channels.iter().map(|c| c.id).collect();
            for stale in self.channel_ids(guild_id).filter(|id| !keep.contains(id)).collect_vec() {
                self.delete_guild_channel(stale);
            }
            for channel in channels {
                self.parse_guild_channel(channel, guild_id);
            }
        }

        if let Some(emojis) = &payload.emojis {
            self.update_guild_emojis(guild_id, emojis);
        }

        // Voice states hold members, so they go first when stale and last when fresh.
        if let Some(states) = &payload.voice_states {
            let keep: HashSet<Id> = states.iter().map(|s| s.user_id).collect();
            for stale in self.voice_state_ids(guild_id).filter(|id| !keep.contains(id)).collect_vec() {
                self.delete_voice_state(guild_id, stale);
            }
        }

        if let Some(members) = &payload.members {
            let keep: HashSet<Id> = members.iter().map(|m| m.user.id).collect();
            for stale in self.member_ids(guild_id).filter(|id| !keep.contains(id)).collect_vec() {
                self.delete_member(guild_id, stale);
            }
            for member in members {
                self.parse_member(member, guild_id);
            }
        }

        if let Some(presences) = &payload.presences {
            let keep: HashSet<Id> = presences.iter().map(|p| p.user.id).collect();
            for stale in self.presence_ids(guild_id).filter(|id| !keep.contains(id)).collect_vec() {
                self.delete_presence(guild_id, stale);
            }
            for presence in presences {
                self.parse_presence(presence, guild_id);
            }
        }

        if let Some(states) = &payload.voice_states {
            for state in states {
                self.parse_voice_state(state, guild_id);
            }
        }
    }

    /// Remove a guild and everything it owns.
    ///
    /// Users and emojis still referred to from elsewhere stay cached until released.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_guild"))]
    pub fn delete_guild(&mut self, guild_id: Id) -> Option<Guild> {
        let record = self.guilds.remove(&guild_id)?;

        for id in record.channels.iter().flatten() {
            self.guild_channels.remove(&id);
        }
        for id in record.roles.iter().flatten() {
            self.roles.remove(&id);
        }
        for presence in record.presences.iter().flat_map(|p| p.values()) {
            for emoji in presence.emoji_refs() {
                self.release_emoji(emoji);
            }
        }
        for member in record.members.iter().flat_map(|m| m.values()) {
            self.release_user(member.user_id);
        }
        for id in record.emojis.iter().flatten() {
            self.tombstone_emoji(id);
        }
        for code in record.invites.iter().flatten() {
            if let Some(invite) = self.invites.remove(code) {
                for user_id in invite.user_ids() {
                    self.release_user(user_id);
                }
            }
        }

        tracing::debug!(
            %guild_id,
            channels = record.channels.as_ref().map_or(0, IdSet::len),
            roles = record.roles.as_ref().map_or(0, IdSet::len),
            members = record.members.as_ref().map_or(0, |m| m.len()),
            "[registry]: delete guild"
        );
        record.snapshot
    }

    /// Remove every guild and everything the guilds own.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::clear_guilds"))]
    pub fn clear_guilds(&mut self) -> Vec<Guild> {
        self.guilds
            .keys()
            .copied()
            .collect_vec()
            .into_iter()
            .filter_map(|guild_id| self.delete_guild(guild_id))
            .collect()
    }

    /// Mark a guild available or unavailable.
    pub fn set_guild_availability(&mut self, guild_id: Id, is_available: bool) {
        self.guild_mut(guild_id).is_available = Some(is_available);
        tracing::debug!(%guild_id, is_available, "[registry]: set guild availability");
    }

    /// Mark the guilds announced at session start as unavailable until they are received.
    pub fn set_initial_unavailable_guilds(&mut self, guild_ids: impl IntoIterator<Item = Id>) {
        for guild_id in guild_ids {
            self.guild_mut(guild_id).is_available = Some(false);
        }
    }

    /// Look up a guild regardless of its availability.
    pub fn get_guild_by_id(&self, guild_id: Id) -> Option<Guild> {
        self.guilds.get(&guild_id)?.snapshot.clone()
    }

    /// Look up an available guild.
    pub fn get_available_guild_by_id(&self, guild_id: Id) -> Option<Guild> {
        self.guilds
            .get(&guild_id)
            .filter(|r| r.is_available())
            .and_then(|r| r.snapshot.clone())
    }

    /// Look up a guild that is cached but currently unavailable.
    pub fn get_unavailable_guild_by_id(&self, guild_id: Id) -> Option<Guild> {
        self.guilds
            .get(&guild_id)
            .filter(|r| r.is_available == Some(false))
            .and_then(|r| r.snapshot.clone())
    }

    /// Whether the guild is known to be available. `None` if its availability is unknown.
    pub fn is_guild_available(&self, guild_id: Id) -> Option<bool> {
        self.guilds.get(&guild_id)?.is_available
    }

    /// Every cached guild.
    pub fn guilds_view(&self) -> BoxCacheView<'_, Id, Guild> {
        Box::new(
            MappingView::with_builder(&self.guilds, |_, r: &GuildRecord| r.snapshot.clone())
                .with_predicate(|_, r| r.snapshot.is_some()),
        )
    }

    /// Every cached guild that is available.
    pub fn available_guilds_view(&self) -> BoxCacheView<'_, Id, Guild> {
        Box::new(
            MappingView::with_builder(&self.guilds, |_, r: &GuildRecord| r.snapshot.clone())
                .with_predicate(|_, r| r.snapshot.is_some() && r.is_available()),
        )
    }

    /// Every cached guild that is unavailable.
    pub fn unavailable_guilds_view(&self) -> BoxCacheView<'_, Id, Guild> {
        Box::new(
            MappingView::with_builder(&self.guilds, |_, r: &GuildRecord| r.snapshot.clone())
                .with_predicate(|_, r| r.snapshot.is_some() && r.is_available == Some(false)),
        )
    }

    fn role_ids(&self, guild_id: Id) -> impl Iterator<Item = Id> + '_ {
        self.guilds
            .get(&guild_id)
            .and_then(|r| r.roles.as_ref())
            .into_iter()
            .flat_map(IdSet::iter)
    }

    /// Insert or merge a role of `guild_id`.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_role"))]
    pub fn parse_role(&mut self, payload: &RolePayload, guild_id: Id) -> Role {
        Self::check_guild("role", payload.guild_id, guild_id);
        let role = match self.roles.get_mut(&payload.id) {
            Some(role) => {
                role.merge(payload);
                role.clone()
            }
            None => {
                let role = Role::from_payload(payload, guild_id);
                self.roles.insert(role.id, role.clone());
                role
            }
        };
        self.guild_mut(guild_id).roles.get_or_insert_with(IdSet::new).add(role.id);
        tracing::trace!(%guild_id, role_id = %role.id, "[registry]: parse role");
        role
    }

    /// Merge a role update.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_role"))]
    pub fn update_role(&mut self, payload: &RolePayload) -> Option<(Role, Role)> {
        let role = self.roles.get_mut(&payload.id)?;
        let old = role.clone();
        role.merge(payload);
        Some((old, role.clone()))
    }

    /// Remove a role, stripping it from every member of the guild that holds it.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_role"))]
    pub fn delete_role(&mut self, guild_id: Id, role_id: Id) -> Option<Role> {
        let owner = self.roles.get(&role_id)?.guild_id;
        if owner != guild_id {
            tracing::warn!(%guild_id, %owner, %role_id, "[registry]: delete role of another guild, ignored");
            return None;
        }
        let role = self.roles.remove(&role_id)?;

        if let Some(record) = self.guilds.get_mut(&guild_id) {
            if let Some(roles) = record.roles.as_mut() {
                roles.discard(role_id);
            }
            let mut stripped = 0;
            for member in record.members.iter_mut().flat_map(|m| m.values_mut()) {
                if member.role_ids.contains(&role_id) {
                    member.role_ids.retain(|id| *id != role_id);
                    stripped += 1;
                }
            }
            tracing::debug!(%guild_id, %role_id, stripped, "[registry]: delete role");
        }
        self.discard_guild_if_empty(guild_id);
        Some(role)
    }

    /// Remove every role of a guild, stripping them from its members.
    pub fn clear_roles_for_guild(&mut self, guild_id: Id) -> Vec<Role> {
        self.role_ids(guild_id)
            .collect_vec()
            .into_iter()
            .filter_map(|role_id| self.delete_role(guild_id, role_id))
            .collect()
    }

    /// Look up a role.
    pub fn get_role_by_id(&self, role_id: Id) -> Option<Role> {
        self.roles.get(&role_id).cloned()
    }

    /// The roles of a guild.
    pub fn roles_view(&self, guild_id: Id) -> BoxCacheView<'_, Id, Role> {
        match self.guilds.get(&guild_id).and_then(|r| r.roles.as_ref()) {
            Some(ids) => Box::new(MappingView::new(IdSubset::new(ids, &self.roles))),
            None => Box::new(EmptyView),
        }
    }

    /// The roles of a member, sorted by position.
    pub fn member_roles(&self, guild_id: Id, user_id: Id) -> Vec<Role> {
        let Some(member) = self.get_member(guild_id, user_id) else {
            return vec![];
        };
        let roles = self.roles_view(guild_id);
        member
            .role_ids
            .iter()
            .filter_map(|id| roles.get(id))
            .sorted_by_key(|r| (r.position, r.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{payload::MemberPayload, RegistryBuilder};

    fn guild_payload() -> GuildPayload {
        serde_json::from_value(json!({
            "id": "100",
            "name": "crabs",
            "owner_id": "1",
            "roles": [
                { "id": "200", "name": "@everyone", "position": 0, "permissions": "1024" },
                { "id": "201", "name": "mods", "position": 1, "permissions": "8" },
            ],
            "channels": [
                { "id": "300", "type": 0, "name": "general" },
            ],
            "members": [
                { "user": { "id": "1", "username": "ferris" }, "roles": ["201"] },
                { "user": { "id": "2", "username": "corro" }, "roles": [] },
            ],
        }))
        .unwrap()
    }

    #[test_log::test]
    fn test_parse_guild_with_nested() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        let guild = registry.parse_guild(&guild_payload()).unwrap();
        assert_eq!(guild.name, "crabs");
        assert_eq!(registry.is_guild_available(Id::new(100)), Some(true));
        assert_eq!(registry.roles_view(Id::new(100)).len(), 2);
        assert_eq!(registry.guild_channels_view(Id::new(100)).len(), 1);
        assert_eq!(registry.members_view(Id::new(100)).len(), 2);
        assert_eq!(registry.get_user_by_id(Id::new(1)).unwrap().username, "ferris");

        let roles = registry.member_roles(Id::new(100), Id::new(1));
        assert_eq!(roles.iter().map(|r| r.name.as_str()).collect_vec(), ["mods"]);
    }

    #[test_log::test]
    fn test_unavailable_keeps_state() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.parse_guild(&guild_payload());

        let outage = GuildPayload {
            id: Id::new(100),
            unavailable: Some(true),
            ..Default::default()
        };
        assert!(registry.parse_guild(&outage).is_none());
        assert!(registry.get_available_guild_by_id(Id::new(100)).is_none());
        assert_eq!(registry.get_unavailable_guild_by_id(Id::new(100)).unwrap().name, "crabs");
        assert_eq!(registry.unavailable_guilds_view().len(), 1);
        assert!(registry.available_guilds_view().is_empty());
        assert_eq!(registry.members_view(Id::new(100)).len(), 2);
    }

    #[test_log::test]
    fn test_initial_unavailable_guilds() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.set_initial_unavailable_guilds([Id::new(1), Id::new(2)]);
        assert_eq!(registry.is_guild_available(Id::new(1)), Some(false));
        assert!(registry.get_guild_by_id(Id::new(1)).is_none());
        assert!(registry.guilds_view().is_empty());
    }

    #[test_log::test]
    fn test_delete_role_cascades() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.parse_guild(&guild_payload());
        registry.parse_member(
            &MemberPayload {
                user: crate::payload::UserPayload {
                    id: Id::new(3),
                    ..Default::default()
                },
                roles: Some(vec![Id::new(200), Id::new(201)]),
                ..Default::default()
            },
            Id::new(100),
        );

        let role = registry.delete_role(Id::new(100), Id::new(201)).unwrap();
        assert_eq!(role.name, "mods");
        assert!(registry.get_role_by_id(Id::new(201)).is_none());
        assert!(!registry.roles_view(Id::new(100)).contains(&Id::new(201)));
        assert!(registry.get_member(Id::new(100), Id::new(1)).unwrap().role_ids.is_empty());
        assert_eq!(
            registry.get_member(Id::new(100), Id::new(3)).unwrap().role_ids,
            vec![Id::new(200)]
        );
        assert!(registry.get_member(Id::new(100), Id::new(2)).unwrap().role_ids.is_empty());

        assert!(registry.delete_role(Id::new(100), Id::new(201)).is_none());
    }

    #[test_log::test]
    fn test_delete_role_of_another_guild() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.parse_guild(&guild_payload());
        registry.parse_role(
            &serde_json::from_value(json!({ "id": "900", "name": "elsewhere", "permissions": "0" })).unwrap(),
            Id::new(101),
        );

        assert!(registry.delete_role(Id::new(100), Id::new(900)).is_none());
        assert!(registry.delete_role(Id::new(101), Id::new(201)).is_none());
        assert_eq!(registry.get_role_by_id(Id::new(900)).unwrap().guild_id, Id::new(101));
        assert!(registry.roles_view(Id::new(101)).contains(&Id::new(900)));
        assert_eq!(registry.roles_view(Id::new(100)).len(), 2);
        assert_eq!(registry.get_member(Id::new(100), Id::new(1)).unwrap().role_ids, vec![Id::new(201)]);

        assert_eq!(registry.delete_role(Id::new(101), Id::new(900)).unwrap().name, "elsewhere");
        assert!(registry.guilds.get(&Id::new(101)).is_none());
    }

    #[test_log::test]
    fn test_nested_collection_replaces() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.parse_guild(&guild_payload());

        let mut payload = guild_payload();
        payload.roles.as_mut().unwrap().truncate(1);
        payload.members.as_mut().unwrap().truncate(1);
        registry.parse_guild(&payload);

        assert_eq!(registry.roles_view(Id::new(100)).len(), 1);
        assert_eq!(registry.members_view(Id::new(100)).len(), 1);
        assert!(registry.get_user_by_id(Id::new(2)).is_none());
    }

    #[test_log::test]
    fn test_delete_guild_releases() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.parse_guild(&guild_payload());

        let guild = registry.delete_guild(Id::new(100)).unwrap();
        assert_eq!(guild.id, Id::new(100));
        assert!(registry.get_guild_by_id(Id::new(100)).is_none());
        assert!(registry.get_guild_channel_by_id(Id::new(300)).is_none());
        assert!(registry.get_role_by_id(Id::new(200)).is_none());
        assert!(registry.users_view().is_empty());
        assert!(registry.delete_guild(Id::new(100)).is_none());
    }

    #[test_log::test]
    fn test_clear_guilds() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.parse_guild(&guild_payload());
        registry.parse_guild(&GuildPayload {
            id: Id::new(101),
            name: Some("lobsters".into()),
            ..Default::default()
        });
        registry.set_initial_unavailable_guilds([Id::new(102)]);

        let mut cleared = registry.clear_guilds();
        cleared.sort_by_key(|g| g.id);
        assert_eq!(cleared.iter().map(|g| g.name.as_str()).collect_vec(), ["crabs", "lobsters"]);
        assert!(registry.guilds.is_empty());
        assert!(registry.users_view().is_empty());
        assert!(registry.all_guild_channels_view().is_empty());
        assert_eq!(registry.is_guild_available(Id::new(102)), None);
    }

    #[test_log::test]
    fn test_update_guild_miss() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        assert!(registry.update_guild(&guild_payload()).is_none());
        assert!(registry.guilds_view().is_empty());

        registry.parse_guild(&guild_payload());
        let (old, new) = registry
            .update_guild(&GuildPayload {
                id: Id::new(100),
                name: Some("lobsters".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(old.name, "crabs");
        assert_eq!(new.name, "lobsters");
        assert_eq!(new.owner_id, Id::new(1));
        assert_eq!(registry.roles_view(Id::new(100)).len(), 2);
    }
}
