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

use crate::snowflake::Id;

/// A deduplicated set of identifiers kept as a sorted array.
///
/// Membership is a binary search. Insertion and removal shift the tail of the array, which stays
/// cheap for the few hundred ids a guild usually owns per kind.
///
/// Iteration is in ascending order, which is creation-time order for [`Id`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IdSet {
    ids: Vec<Id>,
}

impl IdSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with room for `capacity` ids.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Insert `id`. Returns `false` if it was already present.
    pub fn add(&mut self, id: Id) -> bool {
        match self.ids.binary_search(&id) {
            Ok(_) => false,
            Err(index) => {
                self.ids.insert(index, id);
                true
            }
        }
    }

    /// Insert every id of `ids`.
    pub fn add_all(&mut self, ids: impl IntoIterator<Item = Id>) {
        for id in ids {
            self.add(id);
        }
    }

    /// Remove `id` if present. Returns whether it was present.
    pub fn discard(&mut self, id: Id) -> bool {
        match self.ids.binary_search(&id) {
            Ok(index) => {
                self.ids.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    /// Whether `id` is in the set.
    pub fn contains(&self, id: Id) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Number of ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set holds no ids.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Remove every id.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Iterate the ids in ascending order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Id> + ExactSizeIterator + '_ {
        self.ids.iter().copied()
    }

    /// The ids as a sorted slice.
    pub fn as_slice(&self) -> &[Id] {
        &self.ids
    }
}

impl FromIterator<Id> for IdSet {
    fn from_iter<T: IntoIterator<Item = Id>>(iter: T) -> Self {
        let mut ids: Vec<Id> = iter.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }
}

impl Extend<Id> for IdSet {
    fn extend<T: IntoIterator<Item = Id>>(&mut self, iter: T) {
        self.add_all(iter);
    }
}

impl IntoIterator for IdSet {
    type Item = Id;
    type IntoIter = std::vec::IntoIter<Id>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

impl<'a> IntoIterator for &'a IdSet {
    type Item = Id;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Id>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<Id> {
        raw.iter().copied().map(Id::new).collect()
    }

    #[test]
    fn test_add_keeps_sorted_and_unique() {
        let mut set = IdSet::new();
        assert!(set.add(Id::new(5)));
        assert!(set.add(Id::new(1)));
        assert!(set.add(Id::new(3)));
        assert!(!set.add(Id::new(3)));

        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), ids(&[1, 3, 5]));
    }

    #[test]
    fn test_discard() {
        let mut set: IdSet = ids(&[4, 2, 2, 8]).into_iter().collect();
        assert_eq!(set.as_slice(), ids(&[2, 4, 8]).as_slice());

        assert!(set.discard(Id::new(4)));
        assert!(!set.discard(Id::new(4)));
        assert!(!set.discard(Id::new(100)));
        assert!(!set.contains(Id::new(4)));
        assert!(set.contains(Id::new(8)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_add_all_and_clear() {
        let mut set = IdSet::with_capacity(4);
        set.add_all(ids(&[9, 7, 9, 1]));
        assert_eq!(set.iter().rev().collect::<Vec<_>>(), ids(&[9, 7, 1]));

        set.clear();
        assert!(set.is_empty());
    }
}
