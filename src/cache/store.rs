//! Cache Store Module
//!
//! Single-shard storage engine: a byte-bounded map with LRU eviction.

use std::collections::HashMap;

use crate::cache::entry::charge_of;
use crate::cache::lru::{Handle, LruList};
use crate::cache::{CacheStats, Entry};

// == LRU Store ==
/// Byte-bounded key/value store with least recently used eviction.
///
/// Every entry is charged `key.len() + value.len()` bytes. Writes that would
/// push the total past `capacity` first evict from the LRU end until the
/// write fits.
///
/// The store does no locking of its own; callers must hold it exclusively
/// for the duration of each call. [`ShardedStore`](super::ShardedStore)
/// wraps every shard in its own mutex for that purpose.
#[derive(Debug)]
pub struct LruStore {
    /// Key to list handle
    index: HashMap<Vec<u8>, Handle>,
    /// Entries in recency order
    lru: LruList,
    /// Hit, miss and eviction counters
    stats: CacheStats,
    /// Maximum total charge in bytes
    capacity: usize,
    /// Current total charge in bytes
    size: usize,
}

impl LruStore {
    // == Constructor ==
    /// Creates an empty store that may hold up to `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            index: HashMap::new(),
            lru: LruList::new(),
            stats: CacheStats::new(),
            capacity,
            size: 0,
        }
    }

    // == Put ==
    /// Inserts or overwrites `key`, leaving it most recently used.
    ///
    /// Returns false without touching the store when the pair could never
    /// fit, i.e. its charge exceeds the whole capacity.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.can_hold(key, value) {
            return false;
        }
        match self.index.get(key).copied() {
            Some(handle) => self.update(handle, value),
            None => self.insert(key, value),
        }
    }

    // == Put If Absent ==
    /// Inserts `key` only when it is not already stored.
    pub fn put_if_absent(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.can_hold(key, value) || self.index.contains_key(key) {
            return false;
        }
        self.insert(key, value)
    }

    // == Set ==
    /// Overwrites the value of an existing key. Never inserts.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> bool {
        let Some(handle) = self.index.get(key).copied() else {
            return false;
        };
        if !self.can_hold(key, value) {
            return false;
        }
        self.update(handle, value)
    }

    // == Delete ==
    /// Removes `key`. Returns false if it was not stored.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        let Some(handle) = self.index.remove(key) else {
            return false;
        };
        if let Some(entry) = self.lru.remove(handle) {
            self.size -= entry.charge();
        }
        true
    }

    // == Get ==
    /// Returns a copy of the value for `key` and marks it most recently used.
    pub fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let Some(handle) = self.index.get(key).copied() else {
            self.stats.record_miss();
            return None;
        };
        self.lru.move_to_front(handle);
        let value = self.lru.get(handle).map(|entry| entry.value.clone());
        if value.is_some() {
            self.stats.record_hit();
        }
        value
    }

    // == Observers ==
    /// Checks whether a pair is small enough to ever be stored here.
    pub fn can_hold(&self, key: &[u8], value: &[u8]) -> bool {
        charge_of(key, value) <= self.capacity
    }

    /// Checks for `key` without changing its recency.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the bytes currently charged against capacity.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Walks stored pairs from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.lru
            .iter()
            .map(|entry| (entry.key.as_slice(), entry.value.as_slice()))
    }

    /// Returns a snapshot of counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.len();
        stats.size_bytes = self.size;
        stats.capacity_bytes = self.capacity;
        stats
    }

    // == Internal Helpers ==
    fn insert(&mut self, key: &[u8], value: &[u8]) -> bool {
        let charge = charge_of(key, value);
        while self.size + charge > self.capacity {
            if !self.evict_oldest() {
                return false;
            }
        }

        let handle = self.lru.push_front(Entry::new(key, value));
        self.index.insert(key.to_vec(), handle);
        self.size += charge;
        true
    }

    fn update(&mut self, handle: Handle, value: &[u8]) -> bool {
        // Moving first keeps the updated entry away from the eviction end.
        self.lru.move_to_front(handle);

        let old_len = match self.lru.get(handle) {
            Some(entry) => entry.value.len(),
            None => return false,
        };
        while self.size - old_len + value.len() > self.capacity {
            if self.lru.back() == Some(handle) || !self.evict_oldest() {
                return false;
            }
        }

        let Some(entry) = self.lru.get_mut(handle) else {
            return false;
        };
        entry.replace_value(value);
        self.size = self.size - old_len + value.len();
        true
    }

    /// Drops the LRU entry. Returns false if the store is empty.
    fn evict_oldest(&mut self) -> bool {
        let Some(entry) = self.lru.pop_back() else {
            return false;
        };
        self.index.remove(&entry.key);
        self.size -= entry.charge();
        self.stats.record_eviction();
        true
    }
}
