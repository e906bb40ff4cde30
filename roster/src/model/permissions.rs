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

use bitflags::bitflags;
use serde::{de::Visitor, Deserialize, Deserializer};

bitflags! {
    /// Permission bits of a role or a channel overwrite.
    ///
    /// Only stored, never evaluated. Bits unknown to this version are kept as they are.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Permissions: u64 {
        /// Create instant invites.
        const CREATE_INSTANT_INVITE = 1 << 0;
        /// Kick members.
        const KICK_MEMBERS = 1 << 1;
        /// Ban members.
        const BAN_MEMBERS = 1 << 2;
        /// Every permission, bypassing overwrites.
        const ADMINISTRATOR = 1 << 3;
        /// Manage channels.
        const MANAGE_CHANNELS = 1 << 4;
        /// Manage the guild.
        const MANAGE_GUILD = 1 << 5;
        /// Add reactions.
        const ADD_REACTIONS = 1 << 6;
        /// View the audit log.
        const VIEW_AUDIT_LOG = 1 << 7;
        /// Priority speaker in voice channels.
        const PRIORITY_SPEAKER = 1 << 8;
        /// Stream in voice channels.
        const STREAM = 1 << 9;
        /// View channels.
        const VIEW_CHANNEL = 1 << 10;
        /// Send messages.
        const SEND_MESSAGES = 1 << 11;
        /// Send text-to-speech messages.
        const SEND_TTS_MESSAGES = 1 << 12;
        /// Manage messages of others.
        const MANAGE_MESSAGES = 1 << 13;
        /// Embed links.
        const EMBED_LINKS = 1 << 14;
        /// Attach files.
        const ATTACH_FILES = 1 << 15;
        /// Read message history.
        const READ_MESSAGE_HISTORY = 1 << 16;
        /// Mention everyone.
        const MENTION_EVERYONE = 1 << 17;
        /// Use external emojis.
        const USE_EXTERNAL_EMOJIS = 1 << 18;
        /// Connect to voice channels.
        const CONNECT = 1 << 20;
        /// Speak in voice channels.
        const SPEAK = 1 << 21;
        /// Mute members.
        const MUTE_MEMBERS = 1 << 22;
        /// Deafen members.
        const DEAFEN_MEMBERS = 1 << 23;
        /// Move members between voice channels.
        const MOVE_MEMBERS = 1 << 24;
        /// Use voice activity detection.
        const USE_VOICE_ACTIVITY = 1 << 25;
        /// Change the own nickname.
        const CHANGE_NICKNAME = 1 << 26;
        /// Manage nicknames of others.
        const MANAGE_NICKNAMES = 1 << 27;
        /// Manage roles.
        const MANAGE_ROLES = 1 << 28;
        /// Manage webhooks.
        const MANAGE_WEBHOOKS = 1 << 29;
        /// Manage emojis.
        const MANAGE_EMOJIS = 1 << 30;
    }
}

struct PermissionsVisitor;

impl Visitor<'_> for PermissionsVisitor {
    type Value = Permissions;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("permission bits as a decimal string or an unsigned integer")
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Permissions, E> {
        Ok(Permissions::from_bits_retain(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Permissions, E> {
        u64::try_from(v)
            .map(Permissions::from_bits_retain)
            .map_err(|_| E::invalid_value(serde::de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Permissions, E> {
        v.parse::<u64>()
            .map(Permissions::from_bits_retain)
            .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PermissionsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_keeps_unknown_bits() {
        let perms: Permissions = serde_json::from_str("\"2048\"").unwrap();
        assert_eq!(perms, Permissions::SEND_MESSAGES);

        let raw = (1u64 << 40) | 8;
        let perms: Permissions = serde_json::from_value(serde_json::json!(raw)).unwrap();
        assert!(perms.contains(Permissions::ADMINISTRATOR));
        assert_eq!(perms.bits(), raw);
    }
}
