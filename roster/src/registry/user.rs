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
use roster_memory::{BoxCacheView, MappingView, Merge, SharedRef};

use super::Registry;
use crate::{
    model::{OwnUser, User},
    payload::{OwnUserPayload, UserPayload},
};

impl Registry {
    /// Merge `payload` into the user table and return the result.
    ///
    /// With `retain` the caller becomes a holder of the user. Without it, a user nobody holds is not kept.
    pub(super) fn upsert_user(&mut self, payload: &UserPayload, retain: bool) -> User {
        let own = self.me.as_mut().filter(|me| me.id() == payload.id).map(|me| {
            me.user.merge(payload);
            me.user.clone()
        });

        if !retain && !self.users.contains_key(&payload.id) {
            // The current user lives in its own slot whether or not anything holds it.
            return own.unwrap_or_else(|| User::from_payload(payload));
        }

        let shared = self
            .users
            .entry(payload.id)
            .or_insert_with(|| SharedRef::new(own.clone().unwrap_or_else(|| User::from_payload(payload))));
        shared.value_mut().merge(payload);
        if retain {
            shared.retain();
        }
        own.unwrap_or_else(|| shared.value().clone())
    }

    /// Hold `next` in place of `prev`, returning the held user.
    pub(super) fn swap_user(&mut self, prev: Option<Id>, next: Option<&UserPayload>) -> Option<User> {
        match next {
            Some(next) if prev == Some(next.id) => Some(self.upsert_user(next, false)),
            Some(next) => {
                let user = self.upsert_user(next, true);
                if let Some(prev) = prev {
                    self.release_user(prev);
                }
                Some(user)
            }
            None => prev.and_then(|id| self.cached_user(id)),
        }
    }

    /// Drop one hold on the user, evicting it once nobody holds it.
    pub(super) fn release_user(&mut self, user_id: Id) {
        roster_common::strict_assert!(self.users.contains_key(&user_id), "released user {user_id} is not cached");
        if self.users.get_mut(&user_id).is_some_and(SharedRef::release) {
            self.users.remove(&user_id);
            tracing::trace!(%user_id, "[registry]: evict unreferenced user");
        }
    }

    fn cached_user(&self, user_id: Id) -> Option<User> {
        self.users.get(&user_id).map(|shared| shared.value().clone())
    }

    /// The held user `user_id`. A record refers only to users it holds, so a miss is a bookkeeping bug.
    pub(super) fn held_user(&self, user_id: Id) -> User {
        let user = self.cached_user(user_id);
        roster_common::strict_assert!(user.is_some(), "held user {user_id} is not cached");
        user.unwrap_or_else(|| User {
            id: user_id,
            ..Default::default()
        })
    }

    /// Merge a user payload.
    ///
    /// A user is only kept while a member, a private channel, an emoji, an invite or a message refers to it,
    /// so a user nothing refers to is returned without being cached.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_user"))]
    pub fn parse_user(&mut self, payload: &UserPayload) -> User {
        self.upsert_user(payload, false)
    }

    /// Merge a user update into the cached user.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_user"))]
    pub fn update_user(&mut self, payload: &UserPayload) -> Option<(User, User)> {
        let old = self.get_user_by_id(payload.id)?;
        let new = self.upsert_user(payload, false);
        Some((old, new))
    }

    /// Look up a user. The current user is answered from its own slot.
    pub fn get_user_by_id(&self, user_id: Id) -> Option<User> {
        match &self.me {
            Some(me) if me.id() == user_id => Some(me.user.clone()),
            _ => self.cached_user(user_id),
        }
    }

    /// Every cached user.
    pub fn users_view(&self) -> BoxCacheView<'_, Id, User> {
        Box::new(MappingView::unpacked(&self.users))
    }

    /// Set or merge the current user.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_own_user"))]
    pub fn parse_own_user(&mut self, payload: &OwnUserPayload) -> OwnUser {
        let me = match &mut self.me {
            Some(me) if me.id() == payload.user.id => {
                me.merge(payload);
                me.clone()
            }
            slot => {
                let me = OwnUser::from_payload(payload);
                *slot = Some(me.clone());
                me
            }
        };
        if let Some(shared) = self.users.get_mut(&payload.user.id) {
            shared.value_mut().merge(&payload.user);
        }
        me
    }

    /// Merge an update of the current user.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_me"))]
    pub fn update_me(&mut self, payload: &OwnUserPayload) -> Option<(OwnUser, OwnUser)> {
        let old = self.me.clone().filter(|me| me.id() == payload.user.id)?;
        let new = self.parse_own_user(payload);
        Some((old, new))
    }

    /// The current user.
    pub fn get_me(&self) -> Option<OwnUser> {
        self.me.clone()
    }

    /// Forget the current user.
    pub fn delete_me(&mut self) -> Option<OwnUser> {
        self.me.take()
    }
}

#[cfg(test)]
mod tests {
    use crate::RegistryBuilder;

    use super::*;

    fn user(id: u64, name: &str) -> UserPayload {
        UserPayload {
            id: Id::new(id),
            username: Some(name.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unheld_user_is_not_kept() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        let parsed = registry.parse_user(&user(1, "alice"));
        assert_eq!(parsed.username, "alice");
        assert!(registry.get_user_by_id(Id::new(1)).is_none());
        assert!(registry.update_user(&user(1, "bob")).is_none());
    }

    #[test]
    fn test_hold_and_release() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        registry.upsert_user(&user(1, "alice"), true);
        registry.upsert_user(&user(1, "alice"), true);

        let (old, new) = registry.update_user(&user(1, "alicia")).unwrap();
        assert_eq!(old.username, "alice");
        assert_eq!(new.username, "alicia");
        assert_eq!(registry.users_view().len(), 1);

        registry.release_user(Id::new(1));
        assert!(registry.get_user_by_id(Id::new(1)).is_some());
        registry.release_user(Id::new(1));
        assert!(registry.get_user_by_id(Id::new(1)).is_none());
    }

    #[test]
    fn test_own_user_slot() {
        let mut registry = RegistryBuilder::new().build().unwrap();
        let me = registry.parse_own_user(&OwnUserPayload {
            user: user(7, "me"),
            mfa_enabled: Some(true),
            ..Default::default()
        });
        assert!(me.is_mfa_enabled);
        assert_eq!(registry.get_user_by_id(Id::new(7)).unwrap().username, "me");

        registry.parse_user(&user(7, "renamed"));
        assert_eq!(registry.get_me().unwrap().user.username, "renamed");
        assert!(registry.get_me().unwrap().is_mfa_enabled);

        let (old, new) = registry
            .update_me(&OwnUserPayload {
                user: UserPayload {
                    id: Id::new(7),
                    ..Default::default()
                },
                locale: Some(Some("en-US".into())),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(old.locale, None);
        assert_eq!(new.locale.as_deref(), Some("en-US"));
        assert_eq!(new.user.username, "renamed");

        // Fields a partial update omits survive in both the returned and the cached user.
        let partial = UserPayload {
            id: Id::new(7),
            discriminator: Some("0042".into()),
            ..Default::default()
        };
        let parsed = registry.parse_user(&partial);
        assert_eq!(parsed.username, "renamed");
        assert_eq!(parsed.discriminator, "0042");
        let (old, new) = registry.update_user(&partial).unwrap();
        assert_eq!(old.username, "renamed");
        assert_eq!(new.username, "renamed");
        assert_eq!(registry.get_user_by_id(Id::new(7)).unwrap().username, "renamed");
        assert!(registry.users_view().is_empty());

        // Once held, the table copy starts from the current user.
        registry.upsert_user(&partial, true);
        assert_eq!(registry.users.get(&Id::new(7)).unwrap().value().username, "renamed");
        registry.release_user(Id::new(7));

        assert_eq!(registry.delete_me().unwrap().id(), Id::new(7));
        assert!(registry.get_me().is_none());
        assert!(registry.get_user_by_id(Id::new(7)).is_none());
    }
}
