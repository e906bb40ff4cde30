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

use std::{fmt::Debug, hash::Hash, sync::Arc};

use futures_util::FutureExt;
use roster_common::{
    error::{Error, ErrorKind},
    snowflake::Id,
    spawn::Spawner,
};
use roster_memory::{FetchFuture, Flight, InflightMap, Mandatory, Placeholder};

use super::Registry;
use crate::{
    fetch::{Fetch, Fetcher},
    model::{Channel, Guild, KnownCustomEmoji, Member, Message, Role, User},
};

fn external<T>(fetch: Fetch<T>) -> FetchFuture<T>
where
    T: Send + 'static,
{
    fetch.map(|res| res.map_err(Error::external)).boxed()
}

/// Resolves mandatory lookups that missed the cache, one flight per key at a time.
pub(crate) struct Resolver {
    fetcher: Arc<dyn Fetcher>,
    spawner: Spawner,

    channels: InflightMap<Id, Channel>,
    guilds: InflightMap<Id, Guild>,
    users: InflightMap<Id, User>,
    members: InflightMap<(Id, Id), Member>,
    roles: InflightMap<(Id, Id), Role>,
    emojis: InflightMap<(Id, Id), KnownCustomEmoji>,
    messages: InflightMap<(Id, Id), Message>,
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("spawner", &self.spawner)
            .field("channels", &self.channels)
            .field("guilds", &self.guilds)
            .field("users", &self.users)
            .field("members", &self.members)
            .field("roles", &self.roles)
            .field("emojis", &self.emojis)
            .field("messages", &self.messages)
            .finish()
    }
}

impl Resolver {
    pub(crate) fn new(fetcher: Arc<dyn Fetcher>, spawner: Spawner) -> Self {
        Self {
            fetcher,
            spawner,
            channels: InflightMap::default(),
            guilds: InflightMap::default(),
            users: InflightMap::default(),
            members: InflightMap::default(),
            roles: InflightMap::default(),
            emojis: InflightMap::default(),
            messages: InflightMap::default(),
        }
    }

    /// A placeholder joining the unfinished flight of `key`, or a new flight driving `fetch`.
    ///
    /// A kind the fetcher cannot fetch gets a flight that already failed as not resolvable.
    fn join<K, T, F>(
        &self,
        inflights: &InflightMap<K, T>,
        kind: &'static str,
        key: K,
        id: impl ToString,
        fetch: F,
    ) -> Placeholder<K, T>
    where
        K: Hash + Eq + Clone,
        T: Clone + Send + 'static,
        F: FnOnce(&dyn Fetcher) -> Option<FetchFuture<T>>,
    {
        let flight = inflights.get_or_insert_with(key.clone(), || match fetch(self.fetcher.as_ref()) {
            Some(fetch) => Flight::new(kind, fetch, self.spawner.clone()),
            None => {
                let id = id.to_string();
                tracing::error!(kind, %id, "[resolver]: no fetch strategy for a mandatory lookup");
                Flight::ready(kind, Err(Error::not_resolvable(kind, id)))
            }
        });
        Placeholder::new(key, flight)
    }

    fn channel(&self, channel_id: Id) -> Placeholder<Id, Channel> {
        self.join(&self.channels, "channel", channel_id, channel_id, |f| {
            f.fetch_channel(channel_id).map(external)
        })
    }

    fn guild(&self, guild_id: Id) -> Placeholder<Id, Guild> {
        self.join(&self.guilds, "guild", guild_id, guild_id, |f| f.fetch_guild(guild_id).map(external))
    }

    fn user(&self, user_id: Id) -> Placeholder<Id, User> {
        self.join(&self.users, "user", user_id, user_id, |f| f.fetch_user(user_id).map(external))
    }

    fn member(&self, guild_id: Id, user_id: Id) -> Placeholder<(Id, Id), Member> {
        self.join(&self.members, "member", (guild_id, user_id), user_id, |f| {
            f.fetch_member(guild_id, user_id).map(external)
        })
    }

    /// Roles are fetched as the whole list of the guild and filtered.
    fn role(&self, guild_id: Id, role_id: Id) -> Placeholder<(Id, Id), Role> {
        self.join(&self.roles, "role", (guild_id, role_id), role_id, |f| {
            f.fetch_roles(guild_id).map(|fetch| {
                async move {
                    let roles = fetch.await.map_err(Error::external)?;
                    roles.into_iter().find(|role| role.id == role_id).ok_or_else(|| {
                        Error::new(ErrorKind::NotFound, "role is not in the roles of its guild")
                            .with_context("guild_id", guild_id)
                            .with_context("role_id", role_id)
                    })
                }
                .boxed()
            })
        })
    }

    fn emoji(&self, guild_id: Id, emoji_id: Id) -> Placeholder<(Id, Id), KnownCustomEmoji> {
        self.join(&self.emojis, "emoji", (guild_id, emoji_id), emoji_id, |f| {
            f.fetch_emoji(guild_id, emoji_id).map(external)
        })
    }

    fn message(&self, channel_id: Id, message_id: Id) -> Placeholder<(Id, Id), Message> {
        self.join(&self.messages, "message", (channel_id, message_id), message_id, |f| {
            f.fetch_message(channel_id, message_id).map(external)
        })
    }
}

impl Registry {
    /// Look up any channel, or get a placeholder fetching it.
    pub fn get_mandatory_channel_by_id(&self, channel_id: Id) -> Mandatory<Id, Channel> {
        match self.get_channel_by_id(channel_id) {
            Some(channel) => Mandatory::Cached(channel),
            None => Mandatory::Placeholder(self.resolver.channel(channel_id)),
        }
    }

    /// Look up a guild, or get a placeholder fetching it.
    pub fn get_mandatory_guild_by_id(&self, guild_id: Id) -> Mandatory<Id, Guild> {
        match self.get_guild_by_id(guild_id) {
            Some(guild) => Mandatory::Cached(guild),
            None => Mandatory::Placeholder(self.resolver.guild(guild_id)),
        }
    }

    /// Look up a user, or get a placeholder fetching it.
    pub fn get_mandatory_user_by_id(&self, user_id: Id) -> Mandatory<Id, User> {
        match self.get_user_by_id(user_id) {
            Some(user) => Mandatory::Cached(user),
            None => Mandatory::Placeholder(self.resolver.user(user_id)),
        }
    }

    /// Look up a member, or get a placeholder fetching it.
    pub fn get_mandatory_member(&self, guild_id: Id, user_id: Id) -> Mandatory<(Id, Id), Member> {
        match self.get_member(guild_id, user_id) {
            Some(member) => Mandatory::Cached(member),
            None => Mandatory::Placeholder(self.resolver.member(guild_id, user_id)),
        }
    }

    /// Look up a role, or get a placeholder fetching the roles of `guild_id` and picking it out.
    pub fn get_mandatory_role_by_id(&self, guild_id: Id, role_id: Id) -> Mandatory<(Id, Id), Role> {
        match self.get_role_by_id(role_id) {
            Some(role) => Mandatory::Cached(role),
            None => Mandatory::Placeholder(self.resolver.role(guild_id, role_id)),
        }
    }

    /// Look up a custom emoji, or get a placeholder fetching it.
    pub fn get_mandatory_emoji_by_id(&self, guild_id: Id, emoji_id: Id) -> Mandatory<(Id, Id), KnownCustomEmoji> {
        match self.get_emoji_by_id(emoji_id) {
            Some(emoji) => Mandatory::Cached(emoji),
            None => Mandatory::Placeholder(self.resolver.emoji(guild_id, emoji_id)),
        }
    }

    /// Look up a message, or get a placeholder fetching it.
    pub fn get_mandatory_message_by_id(&self, channel_id: Id, message_id: Id) -> Mandatory<(Id, Id), Message> {
        match self.get_message_by_id(message_id) {
            Some(message) => Mandatory::Cached(message),
            None => Mandatory::Placeholder(self.resolver.message(channel_id, message_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{fetch::Fetch, model::Permissions, RegistryBuilder};

    #[derive(Debug, Default)]
    struct Roles {
        calls: AtomicUsize,
    }

    impl Fetcher for Arc<Roles> {
        fn fetch_roles(&self, guild_id: Id) -> Option<Fetch<Vec<Role>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(
                async move {
                    Ok(vec![Role {
                        id: Id::new(2),
                        guild_id,
                        name: "crab".into(),
                        permissions: Permissions::SEND_MESSAGES,
                        ..Default::default()
                    }])
                }
                .boxed(),
            )
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_role_is_picked_from_the_list() {
        let roles = Arc::new(Roles::default());
        let registry = RegistryBuilder::new().with_fetcher(roles.clone()).build().unwrap();

        let role = registry.get_mandatory_role_by_id(Id::new(1), Id::new(2)).await.unwrap();
        assert_eq!(role.name, "crab");
        assert_eq!(role.guild_id, Id::new(1));

        let err = registry.get_mandatory_role_by_id(Id::new(1), Id::new(3)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(roles.calls.load(Ordering::SeqCst), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_strategy_is_not_resolvable() {
        let registry = RegistryBuilder::new().build().unwrap();
        let mandatory = registry.get_mandatory_guild_by_id(Id::new(1));
        let placeholder = mandatory.placeholder().unwrap();
        assert!(placeholder.is_resolved());
        assert_eq!(placeholder.kind(), "guild");

        let err = mandatory.await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotResolvable);
    }
}
