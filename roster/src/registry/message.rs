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
use roster_memory::{BoxCacheView, EntityRecord, MappingView};

use super::Registry;
use crate::{
    model::{Emoji, Message, Reaction},
    payload::{MessagePayload, MessageUpdatePayload, ReactionPayload},
    record::MessageRecord,
};

impl Registry {
    fn build_message(&self, record: &MessageRecord) -> Message {
        record.build(self.held_user(record.author_id))
    }

    /// Move the activity of the message's channel forward to `message_id`.
    fn touch_channel(&mut self, channel_id: Id, message_id: Id) {
        if let Some(channel) = self.guild_channels.get_mut(&channel_id) {
            if channel.last_message_id < Some(message_id) {
                channel.last_message_id = Some(message_id);
            }
            return;
        }

        let Some(mut record) = self.private_channels.get(&channel_id).cloned() else {
            return;
        };
        let prev = record.last_message_id;
        if prev < Some(message_id) {
            record.last_message_id = Some(message_id);
            self.put_private_channel(record, prev);
        }
    }

    /// Insert or replace a message, holding its author.
    ///
    /// Only the newest messages are kept. Storing a message past the capacity evicts the oldest one. The
    /// message also becomes the newest message of its channel.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_message"))]
    pub fn parse_message(&mut self, payload: &MessagePayload) -> Message {
        let message_id = payload.id;
        let prev_author = self.messages.get(&message_id).map(|r| r.author_id);
        let author = self
            .swap_user(prev_author, Some(&payload.author))
            .unwrap_or_else(|| self.held_user(payload.author.id));

        let reactions = payload
            .reactions
            .iter()
            .filter_map(|r| {
                Emoji::from_partial(&r.emoji).map(|emoji| Reaction {
                    emoji,
                    count: r.count,
                    is_me: r.me,
                })
            })
            .collect();
        let record = MessageRecord {
            id: message_id,
            channel_id: payload.channel_id,
            guild_id: payload.guild_id,
            author_id: author.id,
            content: payload.content.clone(),
            timestamp: payload.timestamp.unwrap_or_else(|| message_id.created_at()),
            edited_timestamp: payload.edited_timestamp,
            is_tts: payload.tts,
            mentions_everyone: payload.mention_everyone,
            is_pinned: payload.pinned,
            reactions,
        };
        let message = record.build(author);

        match self.messages.get_mut(&message_id) {
            Some(slot) => *slot = record,
            None => {
                for (evicted_id, evicted) in self.messages.insert(message_id, record) {
                    tracing::trace!(message_id = %evicted_id, "[registry]: evict oldest message");
                    self.release_user(evicted.author_id);
                }
            }
        }

        self.touch_channel(payload.channel_id, message_id);
        message
    }

    /// Merge a message edit.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_message"))]
    pub fn update_message(&mut self, payload: &MessageUpdatePayload) -> Option<(Message, Message)> {
        let old = self.get_message_by_id(payload.id)?;
        let record = self.messages.get_mut(&payload.id)?;
        record.merge(payload);
        let record = record.clone();
        Some((old, self.build_message(&record)))
    }

    /// Remove a message.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_message"))]
    pub fn delete_message(&mut self, message_id: Id) -> Option<Message> {
        let record = self.messages.remove(&message_id)?;
        let message = self.build_message(&record);
        self.release_user(record.author_id);
        Some(message)
    }

    /// Remove every cached message, oldest first.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::clear_messages"))]
    pub fn clear_messages(&mut self) -> Vec<Message> {
        let drained = self.messages.drain();
        let messages: Vec<_> = drained.iter().map(|(_, r)| self.build_message(r)).collect();
        for (_, record) in drained {
            self.release_user(record.author_id);
        }
        tracing::debug!(cleared = messages.len(), "[registry]: clear messages");
        messages
    }

    /// Look up a message.
    pub fn get_message_by_id(&self, message_id: Id) -> Option<Message> {
        self.messages.get(&message_id).map(|r| self.build_message(r))
    }

    /// Every cached message, oldest first.
    pub fn messages_view(&self) -> BoxCacheView<'_, Id, Message> {
        Box::new(MappingView::with_builder(&self.messages, |_, r: &MessageRecord| {
            Some(self.build_message(r))
        }))
    }

    /// Set the reaction of a cached message to the absolute count of `payload`.
    ///
    /// Returns the reaction, or `None` if the message is not cached or the payload names no emoji. A count
    /// of zero removes the reaction.
    pub fn parse_reaction(&mut self, message_id: Id, payload: &ReactionPayload) -> Option<Reaction> {
        let emoji = Emoji::from_partial(&payload.emoji)?;
        let reactions = &mut self.messages.get_mut(&message_id)?.reactions;
        let key = emoji.key();
        let reaction = Reaction {
            emoji,
            count: payload.count,
            is_me: payload.me,
        };

        match reactions.iter().position(|r| r.emoji.key() == key) {
            Some(index) if reaction.count == 0 => {
                reactions.remove(index);
            }
            Some(index) => reactions[index] = reaction.clone(),
            None if reaction.count == 0 => {}
            None => reactions.push(reaction.clone()),
        }
        Some(reaction)
    }

    /// Count one more reaction with `emoji`, adding the reaction if it is new.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::increment_reaction_count"))]
    pub fn increment_reaction_count(&mut self, message_id: Id, emoji: &Emoji, is_me: bool) -> Option<Reaction> {
        let reactions = &mut self.messages.get_mut(&message_id)?.reactions;
        let key = emoji.key();
        let index = match reactions.iter().position(|r| r.emoji.key() == key) {
            Some(index) => {
                reactions[index].count += 1;
                reactions[index].is_me |= is_me;
                index
            }
            None => {
                reactions.push(Reaction {
                    emoji: emoji.clone(),
                    count: 1,
                    is_me,
                });
                reactions.len() - 1
            }
        };
        Some(reactions[index].clone())
    }

    /// Count one reaction with `emoji` less.
    ///
    /// At zero the reaction is removed from the message and returned with a count of zero.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::decrement_reaction_count"))]
    pub fn decrement_reaction_count(&mut self, message_id: Id, emoji: &Emoji, is_me: bool) -> Option<Reaction> {
        let reactions = &mut self.messages.get_mut(&message_id)?.reactions;
        let key = emoji.key();
        let index = reactions.iter().position(|r| r.emoji.key() == key)?;

        let reaction = &mut reactions[index];
        roster_common::strict_assert!(reaction.count > 0, "reaction count released below zero");
        reaction.count = reaction.count.saturating_sub(1);
        if is_me {
            reaction.is_me = false;
        }
        if reaction.count == 0 {
            return Some(reactions.remove(index));
        }
        Some(reaction.clone())
    }

    /// Remove every reaction with `emoji`. The returned reaction has a count of zero.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_reaction"))]
    pub fn delete_reaction(&mut self, message_id: Id, emoji: &Emoji) -> Option<Reaction> {
        let reactions = &mut self.messages.get_mut(&message_id)?.reactions;
        let key = emoji.key();
        let index = reactions.iter().position(|r| r.emoji.key() == key)?;
        let mut reaction = reactions.remove(index);
        reaction.count = 0;
        reaction.is_me = false;
        Some(reaction)
    }

    /// Remove every reaction of a message. The returned reactions have a count of zero.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_all_reactions"))]
    pub fn delete_all_reactions(&mut self, message_id: Id) -> Option<Vec<Reaction>> {
        let reactions = std::mem::take(&mut self.messages.get_mut(&message_id)?.reactions);
        Some(
            reactions
                .into_iter()
                .map(|mut reaction| {
                    reaction.count = 0;
                    reaction.is_me = false;
                    reaction
                })
                .collect(),
        )
    }
}
