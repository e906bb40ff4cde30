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
use roster_common::snowflake::Id;
use roster_memory::Merge;
use serde::Deserialize;

use super::{Permissions, User};
use crate::payload::GuildChannelPayload;

/// Channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "u8")]
pub enum ChannelType {
    /// Guild text channel.
    #[default]
    GuildText,
    /// Direct message.
    Dm,
    /// Guild voice channel.
    GuildVoice,
    /// Group direct message.
    GroupDm,
    /// Guild category.
    GuildCategory,
    /// Guild news channel.
    GuildNews,
    /// Guild store channel.
    GuildStore,
    /// Guild stage channel.
    GuildStage,
    /// A type this version does not know.
    Unknown(u8),
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            5 => Self::GuildNews,
            6 => Self::GuildStore,
            13 => Self::GuildStage,
            v => Self::Unknown(v),
        }
    }
}

impl ChannelType {
    /// Whether channels of this type live in a guild.
    pub fn is_guild(&self) -> bool {
        !matches!(self, Self::Dm | Self::GroupDm)
    }
}

/// Target of a permission overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "u8")]
pub enum OverwriteType {
    /// The overwrite targets a role.
    #[default]
    Role,
    /// The overwrite targets a member.
    Member,
}

impl From<u8> for OverwriteType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Member,
            _ => Self::Role,
        }
    }
}

/// A channel level permission overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct PermissionOverwrite {
    /// Role or user id.
    pub id: Id,
    /// What `id` refers to.
    #[serde(rename = "type", default)]
    pub kind: OverwriteType,
    /// Allowed bits.
    #[serde(default)]
    pub allow: Permissions,
    /// Denied bits.
    #[serde(default)]
    pub deny: Permissions,
}

/// A channel of a guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildChannel {
    /// Channel id.
    pub id: Id,
    /// Owning guild.
    pub guild_id: Id,
    /// Channel type.
    pub kind: ChannelType,
    /// Channel name.
    pub name: String,
    /// Sort position.
    pub position: i64,
    /// Topic.
    pub topic: Option<String>,
    /// Whether the channel is age restricted.
    pub is_nsfw: bool,
    /// Parent category.
    pub parent_id: Option<Id>,
    /// Newest message.
    pub last_message_id: Option<Id>,
    /// Slow mode seconds.
    pub rate_limit_per_user: u32,
    /// Voice bitrate.
    pub bitrate: Option<u32>,
    /// Voice user limit.
    pub user_limit: Option<u32>,
    /// Overwrites by target id.
    pub permission_overwrites: HashMap<Id, PermissionOverwrite>,
}

impl GuildChannel {
    /// Build a channel of `guild_id` from a first observed payload.
    pub fn from_payload(payload: &GuildChannelPayload, guild_id: Id) -> Self {
        let mut channel = Self {
            id: payload.id,
            guild_id,
            ..Default::default()
        };
        channel.merge(payload);
        channel
    }
}

impl Merge<GuildChannelPayload> for GuildChannel {
    fn merge(&mut self, patch: &GuildChannelPayload) {
        merge_fields!(self, patch, {
            kind => kind,
            name => name,
            position => position,
            topic => topic,
            is_nsfw => nsfw,
            parent_id => parent_id,
            last_message_id => last_message_id,
            rate_limit_per_user => rate_limit_per_user,
        });
        if patch.bitrate.is_some() {
            self.bitrate = patch.bitrate;
        }
        if patch.user_limit.is_some() {
            self.user_limit = patch.user_limit;
        }
        if let Some(overwrites) = &patch.permission_overwrites {
            self.permission_overwrites = overwrites.iter().map(|o| (o.id, *o)).collect();
        }
    }
}

/// A direct message channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivateChannel {
    /// Channel id.
    pub id: Id,
    /// Channel type.
    pub kind: ChannelType,
    /// Newest message.
    pub last_message_id: Option<Id>,
    /// The other party.
    pub recipient: User,
}

/// Any channel the registry caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    /// A channel of a guild.
    Guild(GuildChannel),
    /// A direct message channel.
    Private(PrivateChannel),
}

impl Channel {
    /// Channel id.
    pub fn id(&self) -> Id {
        match self {
            Self::Guild(c) => c.id,
            Self::Private(c) => c.id,
        }
    }

    /// Channel type.
    pub fn kind(&self) -> ChannelType {
        match self {
            Self::Guild(c) => c.kind,
            Self::Private(c) => c.kind,
        }
    }

    /// The guild channel, if it is one.
    pub fn as_guild(&self) -> Option<&GuildChannel> {
        match self {
            Self::Guild(c) => Some(c),
            Self::Private(_) => None,
        }
    }

    /// The direct message channel, if it is one.
    pub fn as_private(&self) -> Option<&PrivateChannel> {
        match self {
            Self::Guild(_) => None,
            Self::Private(c) => Some(c),
        }
    }
}

impl From<GuildChannel> for Channel {
    fn from(channel: GuildChannel) -> Self {
        Self::Guild(channel)
    }
}

impl From<PrivateChannel> for Channel {
    fn from(channel: PrivateChannel) -> Self {
        Self::Private(channel)
    }
}
