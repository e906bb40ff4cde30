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

//! The registry and its operations, grouped by entity family.
//!
//! Naming follows one scheme for every entity kind:
//!
//! - `parse_*` inserts or merges a payload and returns the resulting entity.
//! - `update_*` merges a payload into a cached entity and returns `(old, new)`. A miss returns `None` and
//!   caches nothing.
//! - `delete_*` removes an entity, cascading to what it owns. Deleting an absent entity returns `None`.
//! - `get_*` and `*_view` never perform I/O. `get_mandatory_*` answers a miss with a placeholder.

mod channel;
mod emoji;
mod guild;
mod invite;
mod member;
mod message;
mod resolve;
mod user;

use std::{fmt::Debug, sync::Arc, time::Duration};

use hashbrown::HashMap;
use roster_common::{
    clock::Clock,
    error::Result,
    snowflake::Id,
    spawn::Spawner,
};
use roster_memory::{ActivityMap, FixedCapacityMap, SharedRef};

use self::resolve::Resolver;
use crate::{
    fetch::Fetcher,
    model::{Emoji, EmojiKey, GuildChannel, OwnUser, Role, User},
    record::{EmojiRecord, GuildRecord, InviteRecord, MessageRecord, PrivateChannelRecord},
};

/// The entity cache.
///
/// Mutations take `&mut self` and must be applied in the order the events were received. Lookups take
/// `&self`. The registry does no locking of its own: an application sharing it between tasks wraps it in
/// a lock of its choice.
pub struct Registry {
    me: Option<OwnUser>,
    users: HashMap<Id, SharedRef<User>>,

    guilds: HashMap<Id, GuildRecord>,
    guild_channels: HashMap<Id, GuildChannel>,
    roles: HashMap<Id, Role>,
    emojis: HashMap<Id, EmojiRecord>,
    unknown_emojis: HashMap<EmojiKey, SharedRef<Emoji>>,
    invites: HashMap<String, InviteRecord>,

    private_channels: ActivityMap<Id, PrivateChannelRecord>,
    messages: FixedCapacityMap<Id, MessageRecord>,

    resolver: Resolver,
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("me", &self.me.as_ref().map(OwnUser::id))
            .field("users", &self.users.len())
            .field("guilds", &self.guilds.len())
            .field("guild_channels", &self.guild_channels.len())
            .field("roles", &self.roles.len())
            .field("emojis", &self.emojis.len())
            .field("unknown_emojis", &self.unknown_emojis.len())
            .field("invites", &self.invites.len())
            .field("private_channels", &self.private_channels)
            .field("messages", &self.messages.len())
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl Registry {
    pub(crate) fn new(
        message_capacity: usize,
        private_channel_expiry: Duration,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        spawner: Spawner,
    ) -> Result<Self> {
        Ok(Self {
            me: None,
            users: HashMap::new(),
            guilds: HashMap::new(),
            guild_channels: HashMap::new(),
            roles: HashMap::new(),
            emojis: HashMap::new(),
            unknown_emojis: HashMap::new(),
            invites: HashMap::new(),
            private_channels: ActivityMap::new(private_channel_expiry, clock)?,
            messages: FixedCapacityMap::new(message_capacity)?,
            resolver: Resolver::new(fetcher, spawner),
        })
    }

    /// Number of messages kept.
    pub fn message_capacity(&self) -> usize {
        self.messages.capacity()
    }

    /// How long a private channel is kept after its newest message.
    pub fn private_channel_expiry(&self) -> Duration {
        self.private_channels.expiry()
    }

    /// Log a guild scoped payload that names another guild than the caller.
    fn check_guild(kind: &'static str, claimed: Option<Id>, guild_id: Id) {
        if let Some(claimed) = claimed.filter(|claimed| *claimed != guild_id) {
            tracing::warn!(
                kind,
                %claimed,
                %guild_id,
                "[registry]: payload guild id disagrees with the caller, using the caller's"
            );
        }
    }

    fn guild_mut(&mut self, guild_id: Id) -> &mut GuildRecord {
        self.guilds.entry(guild_id).or_default()
    }

    /// Drop the record of `guild_id` if nothing is left in it.
    fn discard_guild_if_empty(&mut self, guild_id: Id) {
        if self.guilds.get(&guild_id).is_some_and(GuildRecord::is_empty) {
            self.guilds.remove(&guild_id);
            tracing::trace!(%guild_id, "[registry]: drop empty guild record");
        }
    }
}
