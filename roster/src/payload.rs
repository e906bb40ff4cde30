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

//! Inbound event payloads.
//!
//! Payloads are partial: a field that is absent from the event is `None` and leaves the cached value
//! untouched. Fields the remote side may explicitly clear are `Option<Option<T>>`, where `Some(None)` is an
//! explicit `null`.

use chrono::{DateTime, Utc};
use roster_common::snowflake::Id;
use serde::{Deserialize, Deserializer};

use crate::model::{ActivityType, ChannelType, ClientStatus, PermissionOverwrite, Permissions, Status};

/// Deserialize a field that distinguishes an explicit `null` from an absent field.
///
/// Use together with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserPayload {
    /// User id.
    pub id: Id,
    /// User name.
    pub username: Option<String>,
    /// Four digit tag.
    pub discriminator: Option<String>,
    /// Avatar hash.
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
    /// Whether the user is a bot.
    pub bot: Option<bool>,
    /// Whether the user is a system user.
    pub system: Option<bool>,
    /// Public flag bits.
    pub public_flags: Option<u64>,
}

/// The current user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OwnUserPayload {
    /// Fields shared with every user.
    #[serde(flatten)]
    pub user: UserPayload,
    /// Whether two factor authentication is enabled.
    pub mfa_enabled: Option<bool>,
    /// Chosen locale.
    #[serde(default, deserialize_with = "nullable")]
    pub locale: Option<Option<String>>,
    /// Whether the email is verified.
    #[serde(default, deserialize_with = "nullable")]
    pub verified: Option<Option<bool>>,
    /// Email address.
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
}

/// A guild, optionally with its nested collections.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GuildPayload {
    /// Guild id.
    pub id: Id,
    /// `true` if the guild is in an outage. Such a payload carries nothing but the id.
    pub unavailable: Option<bool>,
    /// Guild name.
    pub name: Option<String>,
    /// Icon hash.
    #[serde(default, deserialize_with = "nullable")]
    pub icon: Option<Option<String>>,
    /// Owner user id.
    pub owner_id: Option<Id>,
    /// Description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    /// AFK voice channel id.
    #[serde(default, deserialize_with = "nullable")]
    pub afk_channel_id: Option<Option<Id>>,
    /// System message channel id.
    #[serde(default, deserialize_with = "nullable")]
    pub system_channel_id: Option<Option<Id>>,
    /// Enabled features.
    pub features: Option<Vec<String>>,
    /// Approximate member count.
    pub member_count: Option<u64>,
    /// Whether the guild is considered large.
    pub large: Option<bool>,
    /// When the current user joined.
    pub joined_at: Option<DateTime<Utc>>,
    /// Nested channels.
    pub channels: Option<Vec<GuildChannelPayload>>,
    /// Nested roles.
    pub roles: Option<Vec<RolePayload>>,
    /// Nested emojis.
    pub emojis: Option<Vec<EmojiPayload>>,
    /// Nested members.
    pub members: Option<Vec<MemberPayload>>,
    /// Nested presences.
    pub presences: Option<Vec<PresencePayload>>,
    /// Nested voice states.
    pub voice_states: Option<Vec<VoiceStatePayload>>,
}

/// A role.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RolePayload {
    /// Role id.
    pub id: Id,
    /// Owning guild. Present on some events only.
    pub guild_id: Option<Id>,
    /// Role name.
    pub name: Option<String>,
    /// RGB color.
    pub color: Option<u32>,
    /// Whether members are displayed separately.
    pub hoist: Option<bool>,
    /// Sort position.
    pub position: Option<i64>,
    /// Permission bits.
    pub permissions: Option<Permissions>,
    /// Whether an integration manages the role.
    pub managed: Option<bool>,
    /// Whether the role can be mentioned.
    pub mentionable: Option<bool>,
}

/// A guild channel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GuildChannelPayload {
    /// Channel id.
    pub id: Id,
    /// Owning guild. Absent when nested in a guild payload.
    pub guild_id: Option<Id>,
    /// Channel type.
    #[serde(rename = "type")]
    pub kind: Option<ChannelType>,
    /// Channel name.
    pub name: Option<String>,
    /// Sort position.
    pub position: Option<i64>,
    /// Topic.
    #[serde(default, deserialize_with = "nullable")]
    pub topic: Option<Option<String>>,
    /// Whether the channel is age restricted.
    pub nsfw: Option<bool>,
    /// Parent category id.
    #[serde(default, deserialize_with = "nullable")]
    pub parent_id: Option<Option<Id>>,
    /// Newest message id.
    #[serde(default, deserialize_with = "nullable")]
    pub last_message_id: Option<Option<Id>>,
    /// Slow mode seconds.
    pub rate_limit_per_user: Option<u32>,
    /// Voice bitrate.
    pub bitrate: Option<u32>,
    /// Voice user limit.
    pub user_limit: Option<u32>,
    /// Permission overwrites. Replaces the whole set when present.
    pub permission_overwrites: Option<Vec<PermissionOverwrite>>,
}

/// A direct message channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrivateChannelPayload {
    /// Channel id.
    pub id: Id,
    /// Channel type.
    #[serde(rename = "type")]
    pub kind: Option<ChannelType>,
    /// Newest message id.
    #[serde(default, deserialize_with = "nullable")]
    pub last_message_id: Option<Option<Id>>,
    /// The other party.
    #[serde(rename = "recipients", deserialize_with = "first_recipient")]
    pub recipient: UserPayload,
}

fn first_recipient<'de, D>(deserializer: D) -> Result<UserPayload, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<UserPayload>::deserialize(deserializer)?
        .into_iter()
        .next()
        .ok_or_else(|| serde::de::Error::invalid_length(0, &"at least one recipient"))
}

/// A guild member.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MemberPayload {
    /// Owning guild. Absent when nested in a guild payload.
    pub guild_id: Option<Id>,
    /// The member's user.
    pub user: UserPayload,
    /// Guild nickname.
    #[serde(default, deserialize_with = "nullable")]
    pub nick: Option<Option<String>>,
    /// Role ids. Replaces the whole list when present.
    pub roles: Option<Vec<Id>>,
    /// When the user joined the guild.
    pub joined_at: Option<DateTime<Utc>>,
    /// Boosting since.
    #[serde(default, deserialize_with = "nullable")]
    pub premium_since: Option<Option<DateTime<Utc>>>,
    /// Guild deafened.
    pub deaf: Option<bool>,
    /// Guild muted.
    pub mute: Option<bool>,
    /// Membership screening not passed yet.
    pub pending: Option<bool>,
}

/// A partial emoji, as attached to reactions and activities.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialEmojiPayload {
    /// Id for custom emojis.
    pub id: Option<Id>,
    /// Name, or the unicode sequence itself.
    pub name: Option<String>,
    /// Whether the custom emoji is animated.
    pub animated: Option<bool>,
}

/// A custom emoji of a guild.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmojiPayload {
    /// Emoji id.
    pub id: Id,
    /// Emoji name.
    pub name: Option<String>,
    /// Whether the emoji is animated.
    pub animated: Option<bool>,
    /// Roles allowed to use the emoji.
    pub roles: Option<Vec<Id>>,
    /// Creator.
    pub user: Option<UserPayload>,
    /// Whether the emoji needs colons.
    pub require_colons: Option<bool>,
    /// Whether an integration manages the emoji.
    pub managed: Option<bool>,
    /// Whether the emoji is usable.
    pub available: Option<bool>,
}

/// The user reference of a presence.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PresenceUserPayload {
    /// User id.
    pub id: Id,
}

/// One activity of a presence.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivityPayload {
    /// Activity name.
    pub name: String,
    /// Activity type.
    #[serde(rename = "type", default)]
    pub kind: ActivityType,
    /// Stream url.
    pub url: Option<String>,
    /// Party status.
    pub state: Option<String>,
    /// What the user is doing.
    pub details: Option<String>,
    /// When the activity was added.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    /// Emoji of a custom status.
    pub emoji: Option<PartialEmojiPayload>,
}

/// A member presence.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PresencePayload {
    /// The user the presence belongs to.
    pub user: PresenceUserPayload,
    /// Owning guild. Absent when nested in a guild payload.
    pub guild_id: Option<Id>,
    /// Overall status.
    pub status: Option<Status>,
    /// Activities. Replaces the whole list when present.
    pub activities: Option<Vec<ActivityPayload>>,
    /// Per platform status.
    pub client_status: Option<ClientStatus>,
}

/// A voice state.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VoiceStatePayload {
    /// Owning guild. Absent when nested in a guild payload.
    pub guild_id: Option<Id>,
    /// Connected channel. `null` means the user left voice.
    #[serde(default, deserialize_with = "nullable")]
    pub channel_id: Option<Option<Id>>,
    /// User id.
    pub user_id: Id,
    /// The member. Absent when nested in a guild payload.
    pub member: Option<MemberPayload>,
    /// Voice session id.
    pub session_id: Option<String>,
    /// Guild deafened.
    pub deaf: Option<bool>,
    /// Guild muted.
    pub mute: Option<bool>,
    /// Self deafened.
    pub self_deaf: Option<bool>,
    /// Self muted.
    pub self_mute: Option<bool>,
    /// Streaming.
    pub self_stream: Option<bool>,
    /// Camera on.
    pub self_video: Option<bool>,
    /// Suppressed by the stage.
    pub suppress: Option<bool>,
    /// Stage speak request time.
    #[serde(default, deserialize_with = "nullable")]
    pub request_to_speak_timestamp: Option<Option<DateTime<Utc>>>,
}

/// An invite with metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InvitePayload {
    /// Invite code.
    pub code: String,
    /// Target guild.
    pub guild_id: Option<Id>,
    /// Target channel.
    pub channel_id: Id,
    /// Creator.
    pub inviter: Option<UserPayload>,
    /// User whose stream the invite targets.
    pub target_user: Option<UserPayload>,
    /// Times used.
    pub uses: Option<u32>,
    /// Use limit, zero for unlimited.
    pub max_uses: Option<u32>,
    /// Lifetime in seconds, zero for unlimited.
    pub max_age: Option<u32>,
    /// Whether the membership is temporary.
    pub temporary: Option<bool>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

/// One reaction of a message payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReactionPayload {
    /// Number of reactions.
    pub count: u32,
    /// Whether the current user reacted.
    #[serde(default)]
    pub me: bool,
    /// Reaction emoji.
    pub emoji: PartialEmojiPayload,
}

/// A created message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessagePayload {
    /// Message id.
    pub id: Id,
    /// Channel id.
    pub channel_id: Id,
    /// Guild id for guild messages.
    pub guild_id: Option<Id>,
    /// Author.
    pub author: UserPayload,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Creation time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Last edit time.
    pub edited_timestamp: Option<DateTime<Utc>>,
    /// Text to speech.
    #[serde(default)]
    pub tts: bool,
    /// Mentions everyone.
    #[serde(default)]
    pub mention_everyone: bool,
    /// Pinned.
    #[serde(default)]
    pub pinned: bool,
    /// Reactions.
    #[serde(default)]
    pub reactions: Vec<ReactionPayload>,
}

/// An edit of a message. Only the id and channel are guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageUpdatePayload {
    /// Message id.
    pub id: Id,
    /// Channel id.
    pub channel_id: Id,
    /// Text content.
    pub content: Option<String>,
    /// Last edit time.
    #[serde(default, deserialize_with = "nullable")]
    pub edited_timestamp: Option<Option<DateTime<Utc>>>,
    /// Mentions everyone.
    pub mention_everyone: Option<bool>,
    /// Pinned.
    pub pinned: Option<bool>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_nullable() {
        let absent: GuildChannelPayload = serde_json::from_value(json!({ "id": "1" })).unwrap();
        assert_eq!(absent.topic, None);

        let cleared: GuildChannelPayload = serde_json::from_value(json!({ "id": "1", "topic": null })).unwrap();
        assert_eq!(cleared.topic, Some(None));

        let set: GuildChannelPayload = serde_json::from_value(json!({ "id": "1", "topic": "hi" })).unwrap();
        assert_eq!(set.topic, Some(Some("hi".to_string())));
    }

    #[test]
    fn test_private_channel_recipient() {
        let payload: PrivateChannelPayload = serde_json::from_value(json!({
            "id": "10",
            "type": 1,
            "recipients": [{ "id": "7", "username": "bob" }],
        }))
        .unwrap();
        assert_eq!(payload.recipient.id, Id::new(7));
        assert_eq!(payload.kind, Some(ChannelType::Dm));

        let empty = serde_json::from_value::<PrivateChannelPayload>(json!({ "id": "10", "recipients": [] }));
        assert!(empty.is_err());
    }

    #[test]
    fn test_own_user_flatten() {
        let payload: OwnUserPayload = serde_json::from_value(json!({
            "id": "1",
            "username": "me",
            "mfa_enabled": true,
            "email": null,
        }))
        .unwrap();
        assert_eq!(payload.user.username.as_deref(), Some("me"));
        assert_eq!(payload.mfa_enabled, Some(true));
        assert_eq!(payload.email, Some(None));
        assert_eq!(payload.locale, None);
    }

    #[test]
    fn test_activity_timestamp_millis() {
        let payload: ActivityPayload = serde_json::from_value(json!({
            "name": "Custom Status",
            "type": 4,
            "created_at": 1_600_000_000_000i64,
            "emoji": { "name": "🔥" },
        }))
        .unwrap();
        assert_eq!(payload.kind, ActivityType::Custom);
        assert_eq!(payload.created_at.unwrap().timestamp_millis(), 1_600_000_000_000);
    }
}
