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

use chrono::{DateTime, Utc};
use roster_common::snowflake::Id;
use roster_memory::Merge;

use super::{Permissions, User};
use crate::payload::{GuildPayload, RolePayload};

/// A guild as seen over the gateway.
///
/// Nested collections are cached separately and reached through the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guild {
    /// Guild id.
    pub id: Id,
    /// Guild name.
    pub name: String,
    /// Icon hash.
    pub icon_hash: Option<String>,
    /// Owner user id.
    pub owner_id: Id,
    /// Description.
    pub description: Option<String>,
    /// AFK voice channel id.
    pub afk_channel_id: Option<Id>,
    /// System message channel id.
    pub system_channel_id: Option<Id>,
    /// Enabled features.
    pub features: Vec<String>,
    /// Approximate member count.
    pub member_count: Option<u64>,
    /// Whether the guild is considered large.
    pub is_large: bool,
    /// When the current user joined.
    pub joined_at: Option<DateTime<Utc>>,
}

impl Guild {
    /// Build a guild from a first observed payload.
    pub fn from_payload(payload: &GuildPayload) -> Self {
        let mut guild = Self {
            id: payload.id,
            ..Default::default()
        };
        guild.merge(payload);
        guild
    }
}

impl Merge<GuildPayload> for Guild {
    fn merge(&mut self, patch: &GuildPayload) {
        merge_fields!(self, patch, {
            name => name,
            icon_hash => icon,
            owner_id => owner_id,
            description => description,
            afk_channel_id => afk_channel_id,
            system_channel_id => system_channel_id,
            features => features,
            is_large => large,
        });
        if patch.member_count.is_some() {
            self.member_count = patch.member_count;
        }
        if patch.joined_at.is_some() {
            self.joined_at = patch.joined_at;
        }
    }
}

/// A role of a guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Role {
    /// Role id.
    pub id: Id,
    /// Owning guild.
    pub guild_id: Id,
    /// Role name.
    pub name: String,
    /// RGB color.
    pub color: u32,
    /// Whether members are displayed separately.
    pub is_hoisted: bool,
    /// Sort position.
    pub position: i64,
    /// Permission bits.
    pub permissions: Permissions,
    /// Whether an integration manages the role.
    pub is_managed: bool,
    /// Whether the role can be mentioned.
    pub is_mentionable: bool,
}

impl Role {
    /// Build a role of `guild_id` from a first observed payload.
    pub fn from_payload(payload: &RolePayload, guild_id: Id) -> Self {
        let mut role = Self {
            id: payload.id,
            guild_id,
            ..Default::default()
        };
        role.merge(payload);
        role
    }
}

impl Merge<RolePayload> for Role {
    fn merge(&mut self, patch: &RolePayload) {
        merge_fields!(self, patch, {
            name => name,
            color => color,
            is_hoisted => hoist,
            position => position,
            permissions => permissions,
            is_managed => managed,
            is_mentionable => mentionable,
        });
    }
}

/// A member of a guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Member {
    /// Owning guild.
    pub guild_id: Id,
    /// The member's user.
    pub user: User,
    /// Guild nickname.
    pub nickname: Option<String>,
    /// Ids of the roles held, in the order received.
    pub role_ids: Vec<Id>,
    /// When the user joined the guild.
    pub joined_at: Option<DateTime<Utc>>,
    /// Boosting since.
    pub premium_since: Option<DateTime<Utc>>,
    /// Guild deafened.
    pub is_deaf: bool,
    /// Guild muted.
    pub is_mute: bool,
    /// Membership screening not passed yet.
    pub is_pending: bool,
    /// The member left or was removed while something still referred to it.
    pub is_deleted: bool,
}

impl Member {
    /// User id of the member.
    pub fn id(&self) -> Id {
        self.user.id
    }

    /// Display name: the nickname if set, else the user name.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.user.username)
    }
}
