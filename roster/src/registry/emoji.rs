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

use hashbrown::HashSet;
use itertools::Itertools;
use roster_common::{
    assert::{release_count, retain_count},
    id_set::IdSet,
    snowflake::Id,
};
use roster_memory::{BoxCacheView, CacheView, EmptyView, EntityRecord, IdSubset, MappingView, SharedRef, Tombstone};

use super::Registry;
use crate::{
    model::{ActivityEmoji, Emoji, KnownCustomEmoji},
    payload::{ActivityPayload, EmojiPayload},
    record::{ActivityRecord, EmojiRecord, EmojiRef},
};

impl Registry {
    fn build_emoji(&self, record: &EmojiRecord) -> KnownCustomEmoji {
        record.build(record.creator_id.map(|id| self.held_user(id)))
    }

    /// Hold the emoji of an activity.
    ///
    /// A custom emoji of a cached guild is held through its record. Anything else goes to the unknown emoji
    /// table, keyed by id or unicode sequence.
    fn retain_emoji(&mut self, emoji: Emoji) -> EmojiRef {
        if let Emoji::Custom { id, .. } = &emoji {
            if let Some(record) = self.emojis.get_mut(id).filter(|r| !r.has_been_deleted) {
                retain_count(&mut record.ref_count, 1);
                return EmojiRef::Known(*id);
            }
        }

        let key = emoji.key();
        let shared = self
            .unknown_emojis
            .entry(key.clone())
            .or_insert_with(|| SharedRef::new(emoji.clone()));
        shared.replace(emoji);
        shared.retain();
        EmojiRef::Unknown(key)
    }

    /// Drop one hold on an activity emoji.
    pub(super) fn release_emoji(&mut self, emoji: &EmojiRef) {
        match emoji {
            EmojiRef::Known(id) => {
                roster_common::strict_assert!(self.emojis.contains_key(id), "released emoji {id} is not cached");
                let Some(record) = self.emojis.get_mut(id) else {
                    return;
                };
                release_count(&mut record.ref_count);
                if record.is_collectable() {
                    self.remove_emoji_record(*id);
                }
            }
            EmojiRef::Unknown(key) => {
                if self.unknown_emojis.get_mut(key).is_some_and(SharedRef::release) {
                    self.unknown_emojis.remove(key);
                    tracing::trace!(%key, "[registry]: evict unreferenced emoji");
                }
            }
        }
    }

    pub(super) fn resolve_emoji(&self, emoji: &EmojiRef) -> Option<ActivityEmoji> {
        match emoji {
            EmojiRef::Known(id) => self.emojis.get(id).map(|r| ActivityEmoji::Known(self.build_emoji(r))),
            EmojiRef::Unknown(key) => self
                .unknown_emojis
                .get(key)
                .map(|shared| ActivityEmoji::Unknown(shared.value().clone())),
        }
    }

    pub(super) fn capture_activity(&mut self, payload: &ActivityPayload) -> ActivityRecord {
        let emoji = payload
            .emoji
            .as_ref()
            .and_then(Emoji::from_partial)
            .map(|emoji| self.retain_emoji(emoji));
        ActivityRecord {
            name: payload.name.clone(),
            kind: payload.kind,
            url: payload.url.clone(),
            state: payload.state.clone(),
            details: payload.details.clone(),
            created_at: payload.created_at,
            emoji,
        }
    }

    fn remove_emoji_record(&mut self, emoji_id: Id) {
        if let Some(record) = self.emojis.remove(&emoji_id) {
            if let Some(creator_id) = record.creator_id {
                self.release_user(creator_id);
            }
            tracing::debug!(%emoji_id, guild_id = %record.guild_id, "[registry]: drop deleted emoji");
        }
    }

    /// Mark an emoji deleted. It is dropped at once unless an activity still shows it.
    pub(super) fn tombstone_emoji(&mut self, emoji_id: Id) {
        let Some(record) = self.emojis.get_mut(&emoji_id) else {
            return;
        };
        record.has_been_deleted = true;
        if record.is_collectable() {
            self.remove_emoji_record(emoji_id);
        } else {
            tracing::debug!(%emoji_id, refs = record.ref_count, "[registry]: keep deleted emoji as tombstone");
        }
    }

    /// Insert or merge a custom emoji of `guild_id`, holding its creator.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::parse_emoji"))]
    pub fn parse_emoji(&mut self, payload: &EmojiPayload, guild_id: Id) -> KnownCustomEmoji {
        let emoji_id = payload.id;
        let prev_creator = self.emojis.get(&emoji_id).and_then(|r| r.creator_id);
        let creator = self.swap_user(prev_creator, payload.user.as_ref());

        let record = self.emojis.entry(emoji_id).or_insert_with(|| EmojiRecord {
            id: emoji_id,
            ..Default::default()
        });
        record.guild_id = guild_id;
        record.has_been_deleted = false;
        record.creator_id = creator.as_ref().map(|u| u.id);
        record.merge(payload);
        let emoji = record.build(creator);

        self.guild_mut(guild_id)
            .emojis
            .get_or_insert_with(IdSet::new)
            .add(emoji_id);
        tracing::trace!(%guild_id, %emoji_id, "[registry]: parse emoji");
        emoji
    }

    /// Merge an emoji update.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_emoji"))]
    pub fn update_emoji(
        &mut self,
        payload: &EmojiPayload,
        guild_id: Id,
    ) -> Option<(KnownCustomEmoji, KnownCustomEmoji)> {
        let old = self.get_emoji_by_id(payload.id).filter(|e| !e.is_deleted)?;
        let new = self.parse_emoji(payload, guild_id);
        Some((old, new))
    }

    /// Replace the emoji set of a guild. Returns the emojis before and after, or `None` if the guild is not
    /// cached.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::update_guild_emojis"))]
    pub fn update_guild_emojis(
        &mut self,
        guild_id: Id,
        emojis: &[EmojiPayload],
    ) -> Option<(Vec<KnownCustomEmoji>, Vec<KnownCustomEmoji>)> {
        if !self.guilds.contains_key(&guild_id) {
            return None;
        }
        let old = self.emojis_view(guild_id).values().collect_vec();

        let keep: HashSet<Id> = emojis.iter().map(|e| e.id).collect();
        let stale = old.iter().map(|e| e.id).filter(|id| !keep.contains(id)).collect_vec();
        for emoji_id in stale {
            self.delete_emoji(emoji_id);
        }
        let new = emojis.iter().map(|e| self.parse_emoji(e, guild_id)).collect_vec();
        Some((old, new))
    }

    /// Remove a custom emoji from its guild. The returned emoji is marked deleted.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::delete_emoji"))]
    pub fn delete_emoji(&mut self, emoji_id: Id) -> Option<KnownCustomEmoji> {
        let record = self.emojis.get(&emoji_id).filter(|r| !r.has_been_deleted)?;
        let guild_id = record.guild_id;
        let mut emoji = self.build_emoji(record);
        emoji.is_deleted = true;

        if let Some(emojis) = self.guilds.get_mut(&guild_id).and_then(|r| r.emojis.as_mut()) {
            emojis.discard(emoji_id);
        }
        self.tombstone_emoji(emoji_id);
        self.discard_guild_if_empty(guild_id);
        Some(emoji)
    }

    /// Remove every custom emoji of a guild. The returned emojis are marked deleted.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::registry::clear_emojis_for_guild"))]
    pub fn clear_emojis_for_guild(&mut self, guild_id: Id) -> Vec<KnownCustomEmoji> {
        let ids = self
            .guilds
            .get(&guild_id)
            .and_then(|r| r.emojis.as_ref())
            .map(|ids| ids.iter().collect_vec())
            .unwrap_or_default();
        ids.into_iter().filter_map(|emoji_id| self.delete_emoji(emoji_id)).collect()
    }

    /// Look up a custom emoji. A deleted emoji an activity still shows is returned with `is_deleted` set.
    pub fn get_emoji_by_id(&self, emoji_id: Id) -> Option<KnownCustomEmoji> {
        self.emojis.get(&emoji_id).map(|r| self.build_emoji(r))
    }

    /// The custom emojis of a guild.
    pub fn emojis_view(&self, guild_id: Id) -> BoxCacheView<'_, Id, KnownCustomEmoji> {
        match self.guilds.get(&guild_id).and_then(|r| r.emojis.as_ref()) {
            Some(ids) => Box::new(MappingView::with_builder(
                IdSubset::new(ids, &self.emojis),
                |_, r: &EmojiRecord| Some(self.build_emoji(r)),
            )),
            None => Box::new(EmptyView),
        }
    }

    /// Every cached custom emoji that has not been deleted.
    pub fn all_emojis_view(&self) -> BoxCacheView<'_, Id, KnownCustomEmoji> {
        Box::new(
            MappingView::with_builder(&self.emojis, |_, r: &EmojiRecord| Some(self.build_emoji(r)))
                .with_predicate(|_, r| !r.has_been_deleted),
        )
    }
}
