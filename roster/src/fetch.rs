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

use futures_util::future::BoxFuture;
use roster_common::snowflake::Id;

use crate::model::{Channel, Guild, KnownCustomEmoji, Member, Message, Role, User};

/// A future fetching one remote entity.
pub type Fetch<T> = BoxFuture<'static, anyhow::Result<T>>;

/// Remote lookups backing the mandatory getters of the registry.
///
/// Each method returns `None` if the implementation has no way to fetch that kind of entity. A mandatory
/// lookup of such a kind resolves to a not resolvable error.
///
/// The returned futures are polled on the runtime the registry was built with, at most once per key at a
/// time.
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch a channel.
    fn fetch_channel(&self, channel_id: Id) -> Option<Fetch<Channel>> {
        let _ = channel_id;
        None
    }

    /// Fetch a guild.
    fn fetch_guild(&self, guild_id: Id) -> Option<Fetch<Guild>> {
        let _ = guild_id;
        None
    }

    /// Fetch a user.
    fn fetch_user(&self, user_id: Id) -> Option<Fetch<User>> {
        let _ = user_id;
        None
    }

    /// Fetch a member of a guild.
    fn fetch_member(&self, guild_id: Id, user_id: Id) -> Option<Fetch<Member>> {
        let _ = (guild_id, user_id);
        None
    }

    /// Fetch every role of a guild. There is no endpoint for a single role.
    fn fetch_roles(&self, guild_id: Id) -> Option<Fetch<Vec<Role>>> {
        let _ = guild_id;
        None
    }

    /// Fetch a custom emoji of a guild.
    fn fetch_emoji(&self, guild_id: Id, emoji_id: Id) -> Option<Fetch<KnownCustomEmoji>> {
        let _ = (guild_id, emoji_id);
        None
    }

    /// Fetch a message.
    fn fetch_message(&self, channel_id: Id, message_id: Id) -> Option<Fetch<Message>> {
        let _ = (channel_id, message_id);
        None
    }
}

/// A fetcher that can fetch nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFetcher;

impl Fetcher for NoopFetcher {}
