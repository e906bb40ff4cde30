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

//! Flat storage records of the entities that refer to other entities.
//!
//! Records hold ids where the public entity holds nested values. The registry resolves the ids when it
//! builds an entity.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use roster_common::{id_set::IdSet, snowflake::Id};
use roster_memory::{Activity, EntityRecord, Tombstone};

use crate::{
    model::{
        ActivityEmoji, ActivityType, ChannelType, ClientStatus, EmojiKey, Guild, Invite, KnownCustomEmoji, Member,
        MemberPresence, Message, PrivateChannel, Reaction, RichActivity, Status, User, VoiceState,
    },
    payload::{
        EmojiPayload, InvitePayload, MemberPayload, MessageUpdatePayload, PresencePayload, PrivateChannelPayload,
        VoiceStatePayload,
    },
};

/// Per guild aggregate.
///
/// Collections stay `None` until the first entity of their kind is seen for the guild.
#[derive(Debug, Default)]
pub struct GuildRecord {
    /// `None` until the availability of the guild is known.
    pub is_available: Option<bool>,
    pub snapshot: Option<Guild>,
    pub channels: Option<IdSet>,
    pub roles: Option<IdSet>,
    pub emojis: Option<IdSet>,
    pub members: Option<HashMap<Id, MemberRecord>>,
    pub presences: Option<HashMap<Id, PresenceRecord>>,
    pub voice_states: Option<HashMap<Id, VoiceStateRecord>>,
    pub invites: Option<Vec<String>>,
}

impl GuildRecord {
    /// Whether the record holds nothing and can be dropped.
    pub fn is_empty(&self) -> bool {
        self.is_available.is_none()
            && self.snapshot.is_none()
            && self.channels.as_ref().is_none_or(IdSet::is_empty)
            && self.roles.as_ref().is_none_or(IdSet::is_empty)
            && self.emojis.as_ref().is_none_or(IdSet::is_empty)
            && self.members.as_ref().is_none_or(HashMap::is_empty)
            && self.presences.as_ref().is_none_or(HashMap::is_empty)
            && self.voice_states.as_ref().is_none_or(HashMap::is_empty)
            && self.invites.as_ref().is_none_or(Vec::is_empty)
    }

    /// Whether the guild is known and available.
    pub fn is_available(&self) -> bool {
        self.is_available == Some(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemberRecord {
    pub guild_id: Id,
    pub user_id: Id,
    pub nickname: Option<String>,
    pub role_ids: Vec<Id>,
    pub joined_at: Option<DateTime<Utc>>,
    pub premium_since: Option<DateTime<Utc>>,
    pub is_deaf: bool,
    pub is_mute: bool,
    pub is_pending: bool,
    pub has_been_deleted: bool,
    /// Voice states referring to the member.
    pub ref_count: usize,
}

impl EntityRecord for MemberRecord {
    type Entity = Member;
    type Extra = User;
    type Patch = MemberPayload;

    fn build(&self, user: User) -> Member {
        Member {
            guild_id: self.guild_id,
            user,
            nickname: self.nickname.clone(),
            role_ids: self.role_ids.clone(),
            joined_at: self.joined_at,
            premium_since: self.premium_since,
            is_deaf: self.is_deaf,
            is_mute: self.is_mute,
            is_pending: self.is_pending,
            is_deleted: self.has_been_deleted,
        }
    }

    fn capture(member: &Member) -> Self {
        Self {
            guild_id: member.guild_id,
            user_id: member.user.id,
            nickname: member.nickname.clone(),
            role_ids: member.role_ids.clone(),
            joined_at: member.joined_at,
            premium_since: member.premium_since,
            is_deaf: member.is_deaf,
            is_mute: member.is_mute,
            is_pending: member.is_pending,
            has_been_deleted: false,
            ref_count: 0,
        }
    }

    fn merge(&mut self, patch: &MemberPayload) {
        merge_fields!(self, patch, {
            nickname => nick,
            role_ids => roles,
            premium_since => premium_since,
            is_deaf => deaf,
            is_mute => mute,
            is_pending => pending,
        });
        if patch.joined_at.is_some() {
            self.joined_at = patch.joined_at;
        }
    }
}

impl Tombstone for MemberRecord {
    fn has_been_deleted(&self) -> bool {
        self.has_been_deleted
    }

    fn ref_count(&self) -> usize {
        self.ref_count
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmojiRecord {
    pub id: Id,
    pub guild_id: Id,
    pub name: String,
    pub is_animated: bool,
    pub role_ids: Vec<Id>,
    pub creator_id: Option<Id>,
    pub is_colons_required: bool,
    pub is_managed: bool,
    pub is_available: bool,
    pub has_been_deleted: bool,
    /// Presence activities showing the emoji.
    pub ref_count: usize,
}

impl EntityRecord for EmojiRecord {
    type Entity = KnownCustomEmoji;
    type Extra = Option<User>;
    type Patch = EmojiPayload;

    fn build(&self, user: Option<User>) -> KnownCustomEmoji {
        KnownCustomEmoji {
            id: self.id,
            guild_id: self.guild_id,
            name: self.name.clone(),
            is_animated: self.is_animated,
            role_ids: self.role_ids.clone(),
            user,
            is_colons_required: self.is_colons_required,
            is_managed: self.is_managed,
            is_available: self.is_available,
            is_deleted: self.has_been_deleted,
        }
    }

    fn capture(emoji: &KnownCustomEmoji) -> Self {
        Self {
            id: emoji.id,
            guild_id: emoji.guild_id,
            name: emoji.name.clone(),
            is_animated: emoji.is_animated,
            role_ids: emoji.role_ids.clone(),
            creator_id: emoji.user.as_ref().map(|u| u.id),
            is_colons_required: emoji.is_colons_required,
            is_managed: emoji.is_managed,
            is_available: emoji.is_available,
            has_been_deleted: false,
            ref_count: 0,
        }
    }

    fn merge(&mut self, patch: &EmojiPayload) {
        merge_fields!(self, patch, {
            name => name,
            is_animated => animated,
            role_ids => roles,
            is_colons_required => require_colons,
            is_managed => managed,
            is_available => available,
        });
    }
}

impl Tombstone for EmojiRecord {
    fn has_been_deleted(&self) -> bool {
        self.has_been_deleted
    }

    fn ref_count(&self) -> usize {
        self.ref_count
    }
}

/// How a presence activity holds its emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiRef {
    /// A retained custom emoji of a cached guild.
    Known(Id),
    /// A retained entry of the unknown emoji table.
    Unknown(EmojiKey),
}

impl EmojiRef {
    fn of(emoji: &ActivityEmoji) -> Self {
        match emoji {
            ActivityEmoji::Known(e) => Self::Known(e.id),
            ActivityEmoji::Unknown(e) => Self::Unknown(e.key()),
        }
    }
}

/// The activity of a presence with its emoji stored as a reference.
#[derive(Debug, Clone, Default)]
pub struct ActivityRecord {
    pub name: String,
    pub kind: ActivityType,
    pub url: Option<String>,
    pub state: Option<String>,
    pub details: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub emoji: Option<EmojiRef>,
}

impl ActivityRecord {
    fn build(&self, emoji: Option<ActivityEmoji>) -> RichActivity {
        RichActivity {
            name: self.name.clone(),
            kind: self.kind,
            url: self.url.clone(),
            state: self.state.clone(),
            details: self.details.clone(),
            created_at: self.created_at,
            emoji,
        }
    }

    fn capture(activity: &RichActivity) -> Self {
        Self {
            name: activity.name.clone(),
            kind: activity.kind,
            url: activity.url.clone(),
            state: activity.state.clone(),
            details: activity.details.clone(),
            created_at: activity.created_at,
            emoji: activity.emoji.as_ref().map(EmojiRef::of),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PresenceRecord {
    pub user_id: Id,
    pub guild_id: Id,
    pub status: Status,
    pub activities: Vec<ActivityRecord>,
    pub client_status: ClientStatus,
}

impl PresenceRecord {
    /// Emojis held by the activities, one per activity showing an emoji.
    pub fn emoji_refs(&self) -> impl Iterator<Item = &EmojiRef> + '_ {
        self.activities.iter().filter_map(|a| a.emoji.as_ref())
    }
}

impl EntityRecord for PresenceRecord {
    type Entity = MemberPresence;
    /// The resolved emoji of each activity, in order.
    type Extra = Vec<Option<ActivityEmoji>>;
    type Patch = PresencePayload;

    fn build(&self, emojis: Vec<Option<ActivityEmoji>>) -> MemberPresence {
        let activities = self
            .activities
            .iter()
            .zip(emojis.into_iter().chain(std::iter::repeat(None)))
            .map(|(a, e)| a.build(e))
            .collect();
        MemberPresence {
            user_id: self.user_id,
            guild_id: self.guild_id,
            status: self.status,
            activities,
            client_status: self.client_status,
        }
    }

    fn capture(presence: &MemberPresence) -> Self {
        Self {
            user_id: presence.user_id,
            guild_id: presence.guild_id,
            status: presence.status,
            activities: presence.activities.iter().map(ActivityRecord::capture).collect(),
            client_status: presence.client_status,
        }
    }

    /// Merges the scalar fields. Activities are replaced by the registry, which owns the emoji references.
    fn merge(&mut self, patch: &PresencePayload) {
        merge_fields!(self, patch, {
            status => status,
            client_status => client_status,
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoiceStateRecord {
    pub guild_id: Id,
    pub channel_id: Option<Id>,
    pub user_id: Id,
    pub session_id: String,
    pub is_guild_deafened: bool,
    pub is_guild_muted: bool,
    pub is_self_deafened: bool,
    pub is_self_muted: bool,
    pub is_streaming: bool,
    pub is_video_enabled: bool,
    pub is_suppressed: bool,
    pub requested_to_speak_at: Option<DateTime<Utc>>,
}

impl EntityRecord for VoiceStateRecord {
    type Entity = VoiceState;
    type Extra = Member;
    type Patch = VoiceStatePayload;

    fn build(&self, member: Member) -> VoiceState {
        VoiceState {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            user_id: self.user_id,
            member,
            session_id: self.session_id.clone(),
            is_guild_deafened: self.is_guild_deafened,
            is_guild_muted: self.is_guild_muted,
            is_self_deafened: self.is_self_deafened,
            is_self_muted: self.is_self_muted,
            is_streaming: self.is_streaming,
            is_video_enabled: self.is_video_enabled,
            is_suppressed: self.is_suppressed,
            requested_to_speak_at: self.requested_to_speak_at,
        }
    }

    fn capture(state: &VoiceState) -> Self {
        Self {
            guild_id: state.guild_id,
            channel_id: state.channel_id,
            user_id: state.user_id,
            session_id: state.session_id.clone(),
            is_guild_deafened: state.is_guild_deafened,
            is_guild_muted: state.is_guild_muted,
            is_self_deafened: state.is_self_deafened,
            is_self_muted: state.is_self_muted,
            is_streaming: state.is_streaming,
            is_video_enabled: state.is_video_enabled,
            is_suppressed: state.is_suppressed,
            requested_to_speak_at: state.requested_to_speak_at,
        }
    }

    fn merge(&mut self, patch: &VoiceStatePayload) {
        merge_fields!(self, patch, {
            channel_id => channel_id,
            session_id => session_id,
            is_guild_deafened => deaf,
            is_guild_muted => mute,
            is_self_deafened => self_deaf,
            is_self_muted => self_mute,
            is_streaming => self_stream,
            is_video_enabled => self_video,
            is_suppressed => suppress,
            requested_to_speak_at => request_to_speak_timestamp,
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct InviteRecord {
    pub code: String,
    pub guild_id: Option<Id>,
    pub channel_id: Id,
    pub inviter_id: Option<Id>,
    pub target_user_id: Option<Id>,
    pub uses: u32,
    pub max_uses: u32,
    pub max_age: u32,
    pub is_temporary: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl InviteRecord {
    /// Ids of the users the invite holds.
    pub fn user_ids(&self) -> impl Iterator<Item = Id> {
        self.inviter_id.into_iter().chain(self.target_user_id)
    }
}

impl EntityRecord for InviteRecord {
    type Entity = Invite;
    /// Inviter and target user.
    type Extra = (Option<User>, Option<User>);
    type Patch = InvitePayload;

    fn build(&self, (inviter, target_user): (Option<User>, Option<User>)) -> Invite {
        Invite {
            code: self.code.clone(),
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            inviter,
            target_user,
            uses: self.uses,
            max_uses: self.max_uses,
            max_age: self.max_age,
            is_temporary: self.is_temporary,
            created_at: self.created_at,
        }
    }

    fn capture(invite: &Invite) -> Self {
        Self {
            code: invite.code.clone(),
            guild_id: invite.guild_id,
            channel_id: invite.channel_id,
            inviter_id: invite.inviter.as_ref().map(|u| u.id),
            target_user_id: invite.target_user.as_ref().map(|u| u.id),
            uses: invite.uses,
            max_uses: invite.max_uses,
            max_age: invite.max_age,
            is_temporary: invite.is_temporary,
            created_at: invite.created_at,
        }
    }

    fn merge(&mut self, patch: &InvitePayload) {
        merge_fields!(self, patch, {
            uses => uses,
            max_uses => max_uses,
            max_age => max_age,
            is_temporary => temporary,
        });
        if patch.created_at.is_some() {
            self.created_at = patch.created_at;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrivateChannelRecord {
    pub id: Id,
    pub kind: ChannelType,
    pub last_message_id: Option<Id>,
    pub recipient_id: Id,
}

impl EntityRecord for PrivateChannelRecord {
    type Entity = PrivateChannel;
    type Extra = User;
    type Patch = PrivateChannelPayload;

    fn build(&self, recipient: User) -> PrivateChannel {
        PrivateChannel {
            id: self.id,
            kind: self.kind,
            last_message_id: self.last_message_id,
            recipient,
        }
    }

    fn capture(channel: &PrivateChannel) -> Self {
        Self {
            id: channel.id,
            kind: channel.kind,
            last_message_id: channel.last_message_id,
            recipient_id: channel.recipient.id,
        }
    }

    fn merge(&mut self, patch: &PrivateChannelPayload) {
        merge_fields!(self, patch, {
            kind => kind,
            last_message_id => last_message_id,
        });
    }
}

impl Activity for PrivateChannelRecord {
    fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_message_id.map(Id::created_at)
    }
}

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: Id,
    pub channel_id: Id,
    pub guild_id: Option<Id>,
    pub author_id: Id,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub is_tts: bool,
    pub mentions_everyone: bool,
    pub is_pinned: bool,
    pub reactions: Vec<Reaction>,
}

impl EntityRecord for MessageRecord {
    type Entity = Message;
    type Extra = User;
    type Patch = MessageUpdatePayload;

    fn build(&self, author: User) -> Message {
        Message {
            id: self.id,
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            author,
            content: self.content.clone(),
            timestamp: self.timestamp,
            edited_timestamp: self.edited_timestamp,
            is_tts: self.is_tts,
            mentions_everyone: self.mentions_everyone,
            is_pinned: self.is_pinned,
            reactions: self.reactions.clone(),
        }
    }

    fn capture(message: &Message) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            guild_id: message.guild_id,
            author_id: message.author.id,
            content: message.content.clone(),
            timestamp: message.timestamp,
            edited_timestamp: message.edited_timestamp,
            is_tts: message.is_tts,
            mentions_everyone: message.mentions_everyone,
            is_pinned: message.is_pinned,
            reactions: message.reactions.clone(),
        }
    }

    fn merge(&mut self, patch: &MessageUpdatePayload) {
        merge_fields!(self, patch, {
            content => content,
            edited_timestamp => edited_timestamp,
            mentions_everyone => mention_everyone,
            is_pinned => pinned,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guild_record_emptiness() {
        let mut record = GuildRecord::default();
        assert!(record.is_empty());

        record.channels = Some(IdSet::new());
        assert!(record.is_empty());

        record.channels.as_mut().unwrap().add(Id::new(1));
        assert!(!record.is_empty());

        record.channels.as_mut().unwrap().discard(Id::new(1));
        record.is_available = Some(false);
        assert!(!record.is_empty());
        assert!(!record.is_available());
    }

    #[test]
    fn test_member_capture_build() {
        let member = Member {
            guild_id: Id::new(1),
            user: User {
                id: Id::new(2),
                username: "ferris".into(),
                ..Default::default()
            },
            role_ids: vec![Id::new(5), Id::new(3)],
            ..Default::default()
        };
        let record = MemberRecord::capture(&member);
        assert_eq!(record.user_id, Id::new(2));
        assert_eq!(record.build(member.user.clone()), member);
    }

    #[test]
    fn test_presence_build_pads_missing_emojis() {
        let record = PresenceRecord {
            activities: vec![ActivityRecord::default(), ActivityRecord::default()],
            ..Default::default()
        };
        let presence = record.build(vec![]);
        assert_eq!(presence.activities.len(), 2);
        assert!(presence.activities.iter().all(|a| a.emoji.is_none()));
    }

    #[test]
    fn test_private_channel_activity() {
        let at = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let mut record = PrivateChannelRecord::default();
        assert_eq!(record.last_activity(), None);
        record.last_message_id = Some(Id::from_datetime(at));
        assert_eq!(record.last_activity(), Some(at));
    }
}
