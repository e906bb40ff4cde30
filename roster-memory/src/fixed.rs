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

use std::hash::Hash;

use ordered_hash_map::OrderedHashMap;
use roster_common::{
    error::{Error, Result},
    strict_assert,
};

/// Simple FIFO map bounded to a fixed number of entries.
///
/// Updating an existing key keeps its position.
#[derive(Debug)]
pub struct FixedCapacityMap<K, V> {
    entries: OrderedHashMap<K, V>,
    capacity: usize,
}

impl<K, V> FixedCapacityMap<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty map holding at most `capacity` entries.
    ///
    /// Fails with a config error if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config("capacity must be greater than zero").with_context("capacity", capacity));
        }
        Ok(Self {
            entries: OrderedHashMap::with_capacity(capacity),
            capacity,
        })
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert or replace `key`, returning the oldest entries evicted to make room.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return vec![];
        }

        let mut evicted = vec![];
        while self.entries.len() >= self.capacity {
            match self.entries.pop_front_entry() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }

        strict_assert!(self.entries.len() < self.capacity);

        self.entries.insert(key, value);

        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), capacity = self.capacity, "[fixed map]: evict oldest entries");
        }

        evicted
    }

    /// Get the value of `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Mutable access that keeps the entry's position.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    /// Remove every entry, returning them oldest first.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut drained = Vec::with_capacity(self.entries.len());
        while let Some(entry) = self.entries.pop_front_entry() {
            drained.push(entry);
        }
        drained
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter()
    }

    pub(crate) fn inner(&self) -> &OrderedHashMap<K, V> {
        &self.entries
    }
}
