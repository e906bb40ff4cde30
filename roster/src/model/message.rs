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

use super::{Emoji, User};

/// A reaction on a message.
///
/// Reactions are handed out as snapshots. A count of zero means the reaction no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    /// Reaction emoji.
    pub emoji: Emoji,
    /// Number of reactions.
    pub count: u32,
    /// Whether the current user reacted.
    pub is_me: bool,
}

/// A message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message id.
    pub id: Id,
    /// Channel id.
    pub channel_id: Id,
    /// Guild id for guild messages.
    pub guild_id: Option<Id>,
    /// Author.
    pub author: User,
    /// Text content.
    pub content: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Last edit time.
    pub edited_timestamp: Option<DateTime<Utc>>,
    /// Text to speech.
    pub is_tts: bool,
    /// Mentions everyone.
    pub mentions_everyone: bool,
    /// Pinned.
    pub is_pinned: bool,
    /// Reactions in the order they were first added.
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// The reaction with `emoji`, if any.
    pub fn reaction(&self, emoji: &Emoji) -> Option<&Reaction> {
        let key = emoji.key();
        self.reactions.iter().find(|r| r.emoji.key() == key)
    }
}
