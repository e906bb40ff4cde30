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

use std::{
    fmt::Debug,
    hash::{BuildHasher, Hash},
};

use hashbrown::HashMap;
use ordered_hash_map::OrderedHashMap;
use roster_common::{id_set::IdSet, snowflake::Id};

use crate::{activity::ActivityMap, fixed::FixedCapacityMap, shared::SharedRef};

/// A read-only window over cached entities.
///
/// Every value handed out is an owned copy. Mutating it never affects the cache.
pub trait CacheView<K, V> {
    /// Whether `key` is visible through the view.
    fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// A copy of the value of `key`. Keys hidden by the view behave as misses.
    fn get(&self, key: &K) -> Option<V>;

    /// Number of visible entries.
    fn len(&self) -> usize;

    /// Whether no entry is visible.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate copies of the visible entries.
    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = (K, V)> + 'a>
    where
        K: 'a,
        V: 'a;

    /// Iterate the visible keys.
    fn keys<'a>(&'a self) -> Box<dyn Iterator<Item = K> + 'a>
    where
        K: 'a,
        V: 'a,
    {
        Box::new(self.iter().map(|(k, _)| k))
    }

    /// Iterate copies of the visible values.
    fn values<'a>(&'a self) -> Box<dyn Iterator<Item = V> + 'a>
    where
        K: 'a,
        V: 'a,
    {
        Box::new(self.iter().map(|(_, v)| v))
    }
}

/// A boxed view, the form views are handed to application code in.
pub type BoxCacheView<'a, K, V> = Box<dyn CacheView<K, V> + 'a>;

impl<K, V> Debug for dyn CacheView<K, V> + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheView").field("len", &self.len()).finish()
    }
}

/// A storage a [`MappingView`] can read from.
pub trait Backing<K, R> {
    /// Look up the stored record of `key`.
    fn lookup(&self, key: &K) -> Option<&R>;

    /// Iterate the stored entries.
    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &R)> + '_>;

    /// Number of stored entries.
    fn size(&self) -> usize;
}

impl<K, R, B> Backing<K, R> for &B
where
    B: Backing<K, R> + ?Sized,
{
    fn lookup(&self, key: &K) -> Option<&R> {
        (**self).lookup(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &R)> + '_> {
        (**self).entries()
    }

    fn size(&self) -> usize {
        (**self).size()
    }
}

impl<K, R, S> Backing<K, R> for HashMap<K, R, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn lookup(&self, key: &K) -> Option<&R> {
        self.get(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &R)> + '_> {
        Box::new(self.iter())
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl<K, R> Backing<K, R> for OrderedHashMap<K, R>
where
    K: Hash + Eq,
{
    fn lookup(&self, key: &K) -> Option<&R> {
        self.get(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &R)> + '_> {
        Box::new(self.iter())
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl<K, R> Backing<K, R> for ActivityMap<K, R>
where
    K: Hash + Eq + Clone,
    R: crate::activity::Activity,
{
    fn lookup(&self, key: &K) -> Option<&R> {
        self.get(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &R)> + '_> {
        self.inner().entries()
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl<K, R> Backing<K, R> for FixedCapacityMap<K, R>
where
    K: Hash + Eq + Clone,
{
    fn lookup(&self, key: &K) -> Option<&R> {
        self.get(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&K, &R)> + '_> {
        self.inner().entries()
    }

    fn size(&self) -> usize {
        self.len()
    }
}

/// The entries of a global table owned by one parent, selected through the parent's id set.
///
/// Ids in the set without a table entry are skipped.
pub struct IdSubset<'a, R, S = hashbrown::DefaultHashBuilder> {
    ids: &'a IdSet,
    table: &'a HashMap<Id, R, S>,
}

impl<'a, R, S> IdSubset<'a, R, S> {
    /// Select the entries of `table` whose ids are in `ids`.
    pub fn new(ids: &'a IdSet, table: &'a HashMap<Id, R, S>) -> Self {
        Self { ids, table }
    }
}

impl<R, S> Backing<Id, R> for IdSubset<'_, R, S>
where
    S: BuildHasher,
{
    fn lookup(&self, key: &Id) -> Option<&R> {
        if self.ids.contains(*key) {
            self.table.get(key)
        } else {
            None
        }
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&Id, &R)> + '_> {
        Box::new(self.ids.as_slice().iter().filter_map(|id| self.table.get_key_value(id)))
    }

    fn size(&self) -> usize {
        self.ids.iter().filter(|id| self.table.contains_key(id)).count()
    }
}

type Builder<'a, K, R, V> = Box<dyn Fn(&K, &R) -> Option<V> + 'a>;
type Predicate<'a, K, R> = Box<dyn Fn(&K, &R) -> bool + 'a>;

/// A view that maps stored records to public values on read.
///
/// The builder may decline an entry by returning `None`, which hides it the same way a failing predicate
/// does.
pub struct MappingView<'a, K, R, V> {
    backing: Box<dyn Backing<K, R> + 'a>,
    builder: Builder<'a, K, R, V>,
    predicate: Option<Predicate<'a, K, R>>,
}

impl<'a, K, R> MappingView<'a, K, R, R>
where
    R: Clone + 'a,
{
    /// A view handing out clones of the stored values.
    pub fn new(backing: impl Backing<K, R> + 'a) -> Self {
        Self::with_builder(backing, |_, r: &R| Some(r.clone()))
    }
}

impl<'a, K, V> MappingView<'a, K, SharedRef<V>, V>
where
    V: Clone + 'a,
{
    /// A view over shared values, handing out clones of the wrapped values.
    pub fn unpacked(backing: impl Backing<K, SharedRef<V>> + 'a) -> Self {
        Self::with_builder(backing, |_, r: &SharedRef<V>| Some(r.value().clone()))
    }
}

impl<'a, K, R, V> MappingView<'a, K, R, V> {
    /// A view building each value from its record with `builder`.
    pub fn with_builder<F>(backing: impl Backing<K, R> + 'a, builder: F) -> Self
    where
        F: Fn(&K, &R) -> Option<V> + 'a,
    {
        Self {
            backing: Box::new(backing),
            builder: Box::new(builder),
            predicate: None,
        }
    }

    /// Hide the entries failing `predicate`.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&K, &R) -> bool + 'a,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    fn visible(&self, key: &K, record: &R) -> bool {
        self.predicate.as_ref().map(|p| p(key, record)).unwrap_or(true)
    }
}

impl<K, R, V> CacheView<K, V> for MappingView<'_, K, R, V>
where
    K: Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        let record = self.backing.lookup(key)?;
        if !self.visible(key, record) {
            return None;
        }
        (self.builder)(key, record)
    }

    fn len(&self) -> usize {
        if self.predicate.is_none() {
            return self.backing.size();
        }
        self.backing.entries().filter(|(k, r)| self.visible(k, r)).count()
    }

    fn iter<'s>(&'s self) -> Box<dyn Iterator<Item = (K, V)> + 's>
    where
        K: 's,
        V: 's,
    {
        Box::new(
            self.backing
                .entries()
                .filter(|(k, r)| self.visible(k, r))
                .filter_map(|(k, r)| (self.builder)(k, r).map(|v| (k.clone(), v))),
        )
    }
}

/// A view with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyView;

impl<K, V> CacheView<K, V> for EmptyView {
    fn contains(&self, _: &K) -> bool {
        false
    }

    fn get(&self, _: &K) -> Option<V> {
        None
    }

    fn len(&self) -> usize {
        0
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = (K, V)> + 'a>
    where
        K: 'a,
        V: 'a,
    {
        Box::new(std::iter::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Channel {
        name: String,
        overwrites: HashMap<u64, u64>,
    }

    fn channels() -> HashMap<u64, Channel> {
        let mut map = HashMap::new();
        for (id, name) in [(1, "general"), (2, "random"), (3, "staff")] {
            map.insert(
                id,
                Channel {
                    name: name.to_string(),
                    overwrites: HashMap::from_iter([(10, 1)]),
                },
            );
        }
        map
    }

    #[test]
    fn test_copy_on_read() {
        let backing = channels();
        let view = MappingView::new(&backing);

        let mut channel = view.get(&1).unwrap();
        channel.overwrites.insert(11, 2);
        channel.name.push('!');

        assert_eq!(backing[&1].name, "general");
        assert_eq!(backing[&1].overwrites.len(), 1);
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_predicate_hides_entries() {
        let backing = channels();
        let view = MappingView::new(&backing).with_predicate(|_, c: &Channel| c.name != "staff");

        assert_eq!(view.len(), 2);
        assert!(view.get(&3).is_none());
        assert!(!view.contains(&3));
        assert!(view.contains(&1));
        let mut keys = view.keys().collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, vec![1, 2]);
    }

    #[test]
    fn test_builder_and_unpacked() {
        let mut backing = HashMap::new();
        backing.insert(1u64, SharedRef::new("a".to_string()));
        backing.insert(2u64, SharedRef::new("b".to_string()));

        let unpacked = MappingView::unpacked(&backing);
        assert_eq!(unpacked.get(&2), Some("b".to_string()));

        let built = MappingView::with_builder(&backing, |k, r: &SharedRef<String>| {
            (*k != 1).then(|| r.value().to_uppercase())
        });
        assert_eq!(built.iter().collect::<Vec<_>>(), vec![(2, "B".to_string())]);
        assert!(built.get(&1).is_none());
    }

    #[test]
    fn test_id_subset() {
        let mut table = HashMap::new();
        for raw in [1u64, 2, 3, 4] {
            table.insert(Id::new(raw), raw * 100);
        }
        let owned: IdSet = [Id::new(3), Id::new(1), Id::new(9)].into_iter().collect();

        let view = MappingView::new(IdSubset::new(&owned, &table));
        assert_eq!(view.len(), 2);
        assert_eq!(view.get(&Id::new(2)), None);
        assert_eq!(view.get(&Id::new(9)), None);
        assert_eq!(
            view.iter().collect::<Vec<_>>(),
            vec![(Id::new(1), 100), (Id::new(3), 300)]
        );
    }

    #[test]
    fn test_empty_view() {
        let view: BoxCacheView<'_, u64, String> = Box::new(EmptyView);
        assert!(view.is_empty());
        assert!(view.get(&1).is_none());
        assert_eq!(view.iter().count(), 0);
        assert_eq!(std::mem::size_of::<EmptyView>(), 0);
    }
}
