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

use super::Member;

/// The voice connection state of a guild member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceState {
    /// Owning guild.
    pub guild_id: Id,
    /// Connected channel. `None` once the user disconnected.
    pub channel_id: Option<Id>,
    /// User id.
    pub user_id: Id,
    /// The member. Flagged as deleted if it left the guild while still connected.
    pub member: Member,
    /// Voice session id.
    pub session_id: String,
    /// Guild deafened.
    pub is_guild_deafened: bool,
    /// Guild muted.
    pub is_guild_muted: bool,
    /// Self deafened.
    pub is_self_deafened: bool,
    /// Self muted.
    pub is_self_muted: bool,
    /// Streaming.
    pub is_streaming: bool,
    /// Camera on.
    pub is_video_enabled: bool,
    /// Suppressed by the stage.
    pub is_suppressed: bool,
    /// Stage speak request time.
    pub requested_to_speak_at: Option<DateTime<Utc>>,
}
