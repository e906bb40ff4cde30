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

use std::{fmt::Debug, hash::Hash, sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use ordered_hash_map::OrderedHashMap;
use roster_common::{
    clock::Clock,
    error::{Error, Result},
};

/// Values that carry a last-activity timestamp.
pub trait Activity {
    /// When the value last saw activity. `None` means never.
    fn last_activity(&self) -> Option<DateTime<Utc>>;
}

/// A map that forgets entries once they have been idle for longer than the expiry.
///
/// Insertion order is recency order: re-inserting a key that carries activity moves it to the back.
/// Every insert first walks the map from the front and evicts entries until it meets one that is still
/// within the expiry window. Entries that never saw activity count as expired.
pub struct ActivityMap<K, V> {
    entries: OrderedHashMap<K, V>,
    expiry: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl<K, V> Debug for ActivityMap<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityMap")
            .field("len", &self.entries.len())
            .field("expiry", &self.expiry)
            .field("clock", &self.clock)
            .finish()
    }
}

impl<K, V> ActivityMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Activity,
{
    /// Create an empty map.
    ///
    /// Fails with a config error if `expiry` is zero.
    pub fn new(expiry: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if expiry.is_zero() {
            return Err(Error::config("expiry time must be greater than zero").with_context("expiry", format!("{expiry:?}")));
        }
        let expiry = TimeDelta::from_std(expiry)
            .map_err(|e| Error::config("expiry time is out of range").with_source(e))?;
        Ok(Self {
            entries: OrderedHashMap::new(),
            expiry,
            clock,
        })
    }

    /// The configured expiry.
    pub fn expiry(&self) -> Duration {
        self.expiry.to_std().unwrap_or_default()
    }

    /// Insert or refresh `key`, returning the entries evicted as idle.
    ///
    /// An existing key is moved to the back only if the new value carries activity. Otherwise it keeps its
    /// position.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        let evicted = self.collect_garbage();

        if value.last_activity().is_some() {
            self.entries.remove(&key);
            self.entries.insert(key, value);
        } else if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
        } else {
            self.entries.insert(key, value);
        }

        evicted
    }

    /// Evict entries from the front until one is within the expiry window.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::memory::activity::collect_garbage"))]
    pub fn collect_garbage(&mut self) -> Vec<(K, V)> {
        let now = self.clock.now();
        let mut evicted = vec![];

        loop {
            let expired = match self.entries.iter().next() {
                None => break,
                Some((_, value)) => match value.last_activity() {
                    Some(at) => now - at >= self.expiry,
                    None => true,
                },
            };
            if !expired {
                break;
            }
            match self.entries.pop_front_entry() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }

        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "[activity map]: evict idle entries");
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

    /// Remove `key`, then evict idle entries the same way an insert does.
    ///
    /// Returns the removed value and the entries evicted as idle.
    pub fn remove(&mut self, key: &K) -> (Option<V>, Vec<(K, V)>) {
        let removed = self.entries.remove(key);
        (removed, self.collect_garbage())
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

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use roster_common::clock::ManualClock;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Dm(Option<DateTime<Utc>>);

    impl Activity for Dm {
        fn last_activity(&self) -> Option<DateTime<Utc>> {
            self.0
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn keys(map: &ActivityMap<u64, Dm>) -> Vec<u64> {
        map.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_zero_expiry_is_rejected() {
        let clock = Arc::new(ManualClock::new(at(0)));
        let err = ActivityMap::<u64, Dm>::new(Duration::ZERO, clock).unwrap_err();
        assert_eq!(err.kind(), roster_common::error::ErrorKind::Config);
    }

    #[test_log::test]
    fn test_evicts_only_expired_prefix() {
        let clock = ManualClock::new(at(0));
        let mut map = ActivityMap::new(Duration::from_secs(60), Arc::new(clock.clone())).unwrap();

        assert!(map.insert(1, Dm(Some(at(0)))).is_empty());
        assert!(map.insert(2, Dm(Some(at(10)))).is_empty());
        assert!(map.insert(3, Dm(Some(at(20)))).is_empty());

        // Only the first entry has been idle for a full minute.
        clock.set(at(65));
        let evicted = map.insert(4, Dm(Some(at(65))));
        assert_eq!(evicted, vec![(1, Dm(Some(at(0))))]);
        assert_eq!(keys(&map), vec![2, 3, 4]);
    }

    #[test]
    fn test_refresh_moves_to_back() {
        let clock = ManualClock::new(at(0));
        let mut map = ActivityMap::new(Duration::from_secs(60), Arc::new(clock.clone())).unwrap();

        map.insert(1, Dm(Some(at(0))));
        map.insert(2, Dm(Some(at(1))));
        clock.set(at(30));
        map.insert(1, Dm(Some(at(30))));
        assert_eq!(keys(&map), vec![2, 1]);

        clock.set(at(70));
        let evicted = map.collect_garbage();
        assert_eq!(evicted.len(), 1);
        assert_eq!(keys(&map), vec![1]);
    }

    #[test]
    fn test_inactive_entries() {
        let clock = ManualClock::new(at(0));
        let mut map = ActivityMap::new(Duration::from_secs(60), Arc::new(clock.clone())).unwrap();

        map.insert(1, Dm(None));
        assert_eq!(map.len(), 1);

        // An entry without activity is dropped by the next walk.
        let evicted = map.insert(2, Dm(Some(at(0))));
        assert_eq!(evicted, vec![(1, Dm(None))]);

        // Refreshing without activity keeps the position.
        map.insert(3, Dm(Some(at(0))));
        map.insert(2, Dm(None));
        assert_eq!(keys(&map), vec![2, 3]);
        assert_eq!(map.get(&2), Some(&Dm(None)));
    }

    #[test_log::test]
    fn test_remove_collects_garbage() {
        let clock = ManualClock::new(at(0));
        let mut map = ActivityMap::new(Duration::from_secs(60), Arc::new(clock.clone())).unwrap();
        map.insert(1, Dm(Some(at(0))));
        map.insert(2, Dm(Some(at(30))));
        map.insert(3, Dm(Some(at(40))));

        clock.set(at(75));
        let (removed, evicted) = map.remove(&3);
        assert_eq!(removed, Some(Dm(Some(at(40)))));
        assert_eq!(evicted, vec![(1, Dm(Some(at(0))))]);
        assert_eq!(keys(&map), vec![2]);

        // A miss still sweeps.
        clock.set(at(95));
        let (removed, evicted) = map.remove(&9);
        assert!(removed.is_none());
        assert_eq!(evicted, vec![(2, Dm(Some(at(30))))]);
        assert!(map.is_empty());
    }

    #[test]
    fn test_drain() {
        let clock = ManualClock::new(at(0));
        let mut map = ActivityMap::new(Duration::from_secs(60), Arc::new(clock)).unwrap();
        map.insert(1, Dm(Some(at(0))));
        map.insert(2, Dm(Some(at(0))));
        assert_eq!(map.drain().into_iter().map(|(k, _)| k).collect::<Vec<_>>(), vec![1, 2]);
        assert!(map.is_empty());
    }
}
