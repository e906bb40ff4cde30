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

use std::fmt::Display;

use roster_common::snowflake::Id;

use super::User;
use crate::payload::PartialEmojiPayload;

/// An emoji as attached to a reaction or an activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Emoji {
    /// A standard unicode emoji.
    Unicode {
        /// The unicode sequence.
        name: String,
    },
    /// A custom emoji, possibly of a guild the client is not in.
    Custom {
        /// Emoji id.
        id: Id,
        /// Emoji name. Missing for deleted emojis.
        name: Option<String>,
        /// Whether the emoji is animated.
        is_animated: bool,
    },
}

impl Emoji {
    /// Convert a partial emoji. Returns `None` if it has neither an id nor a name.
    pub fn from_partial(payload: &PartialEmojiPayload) -> Option<Self> {
        match (payload.id, &payload.name) {
            (Some(id), name) => Some(Self::Custom {
                id,
                name: name.clone(),
                is_animated: payload.animated.unwrap_or(false),
            }),
            (None, Some(name)) => Some(Self::Unicode { name: name.clone() }),
            (None, None) => None,
        }
    }

    /// A unicode emoji.
    pub fn unicode(name: impl Into<String>) -> Self {
        Self::Unicode { name: name.into() }
    }

    /// The key identifying the emoji.
    pub fn key(&self) -> EmojiKey {
        match self {
            Self::Unicode { name } => EmojiKey::Name(name.clone()),
            Self::Custom { id, .. } => EmojiKey::Id(*id),
        }
    }

    /// Emoji name, if known.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Unicode { name } => Some(name),
            Self::Custom { name, .. } => name.as_deref(),
        }
    }
}

/// What identifies an emoji: the id of a custom emoji or the sequence of a unicode one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmojiKey {
    /// Custom emoji id.
    Id(Id),
    /// Unicode sequence.
    Name(String),
}

impl Display for EmojiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A custom emoji of a cached guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownCustomEmoji {
    /// Emoji id.
    pub id: Id,
    /// Owning guild.
    pub guild_id: Id,
    /// Emoji name.
    pub name: String,
    /// Whether the emoji is animated.
    pub is_animated: bool,
    /// Roles allowed to use the emoji. Empty means everyone.
    pub role_ids: Vec<Id>,
    /// Creator, if known.
    pub user: Option<User>,
    /// Whether the emoji needs colons.
    pub is_colons_required: bool,
    /// Whether an integration manages the emoji.
    pub is_managed: bool,
    /// Whether the emoji is usable.
    pub is_available: bool,
    /// The emoji was removed from its guild while an activity still showed it.
    pub is_deleted: bool,
}

impl KnownCustomEmoji {
    /// The reaction form of the emoji.
    pub fn to_emoji(&self) -> Emoji {
        Emoji::Custom {
            id: self.id,
            name: Some(self.name.clone()),
            is_animated: self.is_animated,
        }
    }
}

/// The emoji of a custom status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEmoji {
    /// A custom emoji of a cached guild.
    Known(KnownCustomEmoji),
    /// A unicode emoji or a custom emoji of a guild that is not cached.
    Unknown(Emoji),
}

impl ActivityEmoji {
    /// The key identifying the emoji.
    pub fn key(&self) -> EmojiKey {
        match self {
            Self::Known(e) => EmojiKey::Id(e.id),
            Self::Unknown(e) => e.key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_partial() {
        let custom = Emoji::from_partial(&PartialEmojiPayload {
            id: Some(Id::new(3)),
            name: None,
            animated: Some(true),
        })
        .unwrap();
        assert_eq!(custom.key(), EmojiKey::Id(Id::new(3)));
        assert_eq!(custom.name(), None);

        let unicode = Emoji::from_partial(&PartialEmojiPayload {
            name: Some("👍".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(unicode, Emoji::unicode("👍"));
        assert_eq!(unicode.key().to_string(), "👍");

        assert!(Emoji::from_partial(&PartialEmojiPayload::default()).is_none());
    }
}
