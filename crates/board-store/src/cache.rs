// SPDX-License-Identifier: Apache-2.0
//! Capacity-bounded write-back cache with FIFO eviction and RAII pinning.
//!
//! Pinning is tracked as a guard object whose `Drop` releases the key,
//! rather than a bare pin/unpin call pair — an entry held across an
//! `.await` can never be evicted out from under its holder by a
//! forgotten release.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

/// A bounded map of entries with FIFO-ordered eviction among unpinned keys.
pub struct WriteBackCache<K: Eq + Hash + Clone, V> {
    capacity: usize,
    entries: HashMap<K, V>,
    eviction_queue: VecDeque<K>,
    pinned: HashSet<K>,
    dirty: HashSet<K>,
}

impl<K: Eq + Hash + Clone, V> WriteBackCache<K, V> {
    /// A cache holding at most `capacity` entries before eviction kicks in.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            eviction_queue: VecDeque::new(),
            pinned: HashSet::new(),
            dirty: HashSet::new(),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a freshly-loaded entry, unpinned, eviction-eligible.
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key.clone(), value);
        if !self.pinned.contains(&key) {
            self.eviction_queue.push_back(key);
        }
    }

    /// Pin `key` (already present) and hand back a guard that un-pins it on
    /// drop. Panics if `key` is absent — callers must `insert` first.
    pub fn pin(&mut self, key: K) -> CacheGuard<'_, K, V> {
        self.pinned.insert(key.clone());
        self.eviction_queue.retain(|k| k != &key);
        CacheGuard { cache: self, key }
    }

    fn release(&mut self, key: &K) {
        self.pinned.remove(key);
        if self.entries.contains_key(key) {
            self.eviction_queue.push_back(key.clone());
        }
    }

    /// Mark `key`'s in-memory value as modified since last flush.
    pub fn mark_dirty(&mut self, key: &K) {
        self.dirty.insert(key.clone());
    }

    /// Drain the dirty set, returning keys whose values should be persisted.
    pub fn take_dirty(&mut self) -> Vec<K> {
        self.dirty.drain().collect()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Pop unpinned entries off the front of the eviction queue until the
    /// cache is back at or under capacity. Returned entries are removed from
    /// the cache; callers must flush them before dropping the value.
    pub fn evict_over_capacity(&mut self) -> Vec<(K, V)> {
        let mut victims = Vec::new();
        while self.entries.len() > self.capacity {
            let Some(key) = self.eviction_queue.pop_front() else {
                break;
            };
            if self.pinned.contains(&key) {
                continue;
            }
            if let Some(value) = self.entries.remove(&key) {
                self.dirty.remove(&key);
                victims.push((key, value));
            }
        }
        victims
    }
}

/// RAII handle pinning a cache entry against eviction. Dropping the guard
/// releases the pin; it stays eviction-eligible from that point on.
pub struct CacheGuard<'a, K: Eq + Hash + Clone, V> {
    cache: &'a mut WriteBackCache<K, V>,
    key: K,
}

impl<K: Eq + Hash + Clone, V> CacheGuard<'_, K, V> {
    /// Mark the held entry dirty (to be flushed on the next `take_dirty`).
    pub fn mark_dirty(&mut self) {
        self.cache.mark_dirty(&self.key);
    }
}

impl<K: Eq + Hash + Clone, V> Deref for CacheGuard<'_, K, V> {
    type Target = V;
    fn deref(&self) -> &V {
        self.cache
            .entries
            .get(&self.key)
            .expect("pinned entry must exist while guard is alive")
    }
}

impl<K: Eq + Hash + Clone, V> DerefMut for CacheGuard<'_, K, V> {
    fn deref_mut(&mut self) -> &mut V {
        self.cache
            .entries
            .get_mut(&self.key)
            .expect("pinned entry must exist while guard is alive")
    }
}

impl<K: Eq + Hash + Clone, V> Drop for CacheGuard<'_, K, V> {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_entries_are_not_evicted() {
        let mut cache: WriteBackCache<String, u32> = WriteBackCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        let guard_a = cache.pin("a".into());
        cache.insert("c".into(), 3);
        let victims = cache.evict_over_capacity();
        assert_eq!(victims.len(), 1);
        assert_eq!(victims[0].0, "b");
        drop(guard_a);
        assert!(cache.contains(&"a".to_string()));
    }

    #[test]
    fn guard_drop_makes_entry_evictable_again() {
        let mut cache: WriteBackCache<String, u32> = WriteBackCache::new(1);
        cache.insert("a".into(), 1);
        {
            let _guard = cache.pin("a".into());
            cache.insert("b".into(), 2);
            assert!(cache.evict_over_capacity().is_empty());
        }
        cache.insert("c".into(), 3);
        let victims = cache.evict_over_capacity();
        assert!(!victims.is_empty());
    }

    #[test]
    fn dirty_guard_marks_entry_for_flush() {
        let mut cache: WriteBackCache<String, u32> = WriteBackCache::new(4);
        cache.insert("a".into(), 1);
        {
            let mut guard = cache.pin("a".into());
            *guard = 42;
            guard.mark_dirty();
        }
        assert_eq!(cache.get(&"a".to_string()), Some(&42));
        assert_eq!(cache.take_dirty(), vec!["a".to_string()]);
        assert!(cache.take_dirty().is_empty());
    }

    #[test]
    fn fifo_order_governs_eviction_among_unpinned() {
        let mut cache: WriteBackCache<String, u32> = WriteBackCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        cache.insert("c".into(), 3);
        let victims = cache.evict_over_capacity();
        assert_eq!(victims[0].0, "a");
    }
}
