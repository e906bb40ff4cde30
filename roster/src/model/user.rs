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
use roster_memory::Merge;

use crate::payload::{OwnUserPayload, UserPayload};

/// A user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    /// User id.
    pub id: Id,
    /// User name.
    pub username: String,
    /// Four digit tag.
    pub discriminator: String,
    /// Avatar hash.
    pub avatar_hash: Option<String>,
    /// Whether the user is a bot.
    pub is_bot: bool,
    /// Whether the user is a system user.
    pub is_system: bool,
    /// Public flag bits.
    pub flags: u64,
}

impl User {
    /// Build a user from a first observed payload. Absent fields take their defaults.
    pub fn from_payload(payload: &UserPayload) -> Self {
        let mut user = Self {
            id: payload.id,
            ..Default::default()
        };
        user.merge(payload);
        user
    }
}

impl Merge<UserPayload> for User {
    fn merge(&mut self, patch: &UserPayload) {
        merge_fields!(self, patch, {
            username => username,
            discriminator => discriminator,
            avatar_hash => avatar,
            is_bot => bot,
            is_system => system,
            flags => public_flags,
        });
    }
}

/// The user the client is logged in as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnUser {
    /// Fields shared with every user.
    pub user: User,
    /// Whether two factor authentication is enabled.
    pub is_mfa_enabled: bool,
    /// Chosen locale.
    pub locale: Option<String>,
    /// Whether the email is verified.
    pub is_verified: Option<bool>,
    /// Email address.
    pub email: Option<String>,
}

impl OwnUser {
    /// Build the own user from a first observed payload.
    pub fn from_payload(payload: &OwnUserPayload) -> Self {
        let mut me = Self {
            user: User::from_payload(&payload.user),
            ..Default::default()
        };
        me.merge(payload);
        me
    }

    /// User id.
    pub fn id(&self) -> Id {
        self.user.id
    }
}

impl Merge<OwnUserPayload> for OwnUser {
    fn merge(&mut self, patch: &OwnUserPayload) {
        self.user.merge(&patch.user);
        merge_fields!(self, patch, {
            is_mfa_enabled => mfa_enabled,
            locale => locale,
            is_verified => verified,
            email => email,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_absent_and_clears_null() {
        let mut user = User::from_payload(&UserPayload {
            id: Id::new(1),
            username: Some("alice".into()),
            avatar: Some(Some("abc".into())),
            ..Default::default()
        });
        assert_eq!(user.discriminator, "");

        user.merge(&UserPayload {
            id: Id::new(1),
            discriminator: Some("0001".into()),
            ..Default::default()
        });
        assert_eq!(user.username, "alice");
        assert_eq!(user.avatar_hash.as_deref(), Some("abc"));

        user.merge(&UserPayload {
            id: Id::new(1),
            avatar: Some(None),
            ..Default::default()
        });
        assert_eq!(user.avatar_hash, None);
        assert_eq!(user.discriminator, "0001");
    }
}
