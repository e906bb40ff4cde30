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
use serde::Deserialize;

use super::ActivityEmoji;

/// Online status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Online.
    Online,
    /// Idle.
    Idle,
    /// Do not disturb.
    Dnd,
    /// Offline. Invisible users are reported as offline.
    #[default]
    #[serde(alias = "invisible")]
    Offline,
}

/// Status per platform. A platform the user is not connected from is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ClientStatus {
    /// Desktop client.
    #[serde(default)]
    pub desktop: Status,
    /// Mobile client.
    #[serde(default)]
    pub mobile: Status,
    /// Web client.
    #[serde(default)]
    pub web: Status,
}

/// Activity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "u8")]
pub enum ActivityType {
    /// Playing a game.
    #[default]
    Playing,
    /// Streaming.
    Streaming,
    /// Listening.
    Listening,
    /// Watching.
    Watching,
    /// Custom status.
    Custom,
    /// Competing.
    Competing,
    /// A type this version does not know.
    Unknown(u8),
}

impl From<u8> for ActivityType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Playing,
            1 => Self::Streaming,
            2 => Self::Listening,
            3 => Self::Watching,
            4 => Self::Custom,
            5 => Self::Competing,
            v => Self::Unknown(v),
        }
    }
}

/// One activity of a presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichActivity {
    /// Activity name.
    pub name: String,
    /// Activity type.
    pub kind: ActivityType,
    /// Stream url.
    pub url: Option<String>,
    /// Party status.
    pub state: Option<String>,
    /// What the user is doing.
    pub details: Option<String>,
    /// When the activity was added.
    pub created_at: Option<DateTime<Utc>>,
    /// Emoji of a custom status.
    pub emoji: Option<ActivityEmoji>,
}

/// The presence of a guild member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberPresence {
    /// User id.
    pub user_id: Id,
    /// Owning guild.
    pub guild_id: Id,
    /// Overall status.
    pub status: Status,
    /// Activities, the first one being the one displayed.
    pub activities: Vec<RichActivity>,
    /// Status per platform.
    pub client_status: ClientStatus,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_invisible_is_offline() {
        let status: Status = serde_json::from_value(json!("invisible")).unwrap();
        assert_eq!(status, Status::Offline);

        let client: ClientStatus = serde_json::from_value(json!({ "mobile": "dnd" })).unwrap();
        assert_eq!(client.mobile, Status::Dnd);
        assert_eq!(client.desktop, Status::Offline);
    }
}
