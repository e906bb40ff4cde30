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

use chrono::{DateTime, TimeDelta, Utc};
use roster_common::snowflake::Id;

use super::User;

/// An invite with metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invite {
    /// Invite code.
    pub code: String,
    /// Target guild.
    pub guild_id: Option<Id>,
    /// Target channel.
    pub channel_id: Id,
    /// Creator.
    pub inviter: Option<User>,
    /// User whose stream the invite targets.
    pub target_user: Option<User>,
    /// Times used.
    pub uses: u32,
    /// Use limit, zero for unlimited.
    pub max_uses: u32,
    /// Lifetime in seconds, zero for unlimited.
    pub max_age: u32,
    /// Whether the membership is temporary.
    pub is_temporary: bool,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Invite {
    /// When the invite expires, if it does.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.max_age == 0 {
            return None;
        }
        self.created_at.map(|at| at + TimeDelta::seconds(self.max_age as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_at() {
        let created_at = DateTime::from_timestamp(1_000, 0);
        let mut invite = Invite {
            created_at,
            max_age: 60,
            ..Default::default()
        };
        assert_eq!(invite.expires_at(), DateTime::from_timestamp(1_060, 0));

        invite.max_age = 0;
        assert_eq!(invite.expires_at(), None);
    }
}
