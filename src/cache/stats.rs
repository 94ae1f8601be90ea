//! Cache Statistics Module
//!
//! Tracks per-shard counters and folds them into a store-wide view.

use serde::Serialize;

// == Cache Stats ==
/// Counters and occupancy for one shard, or the sum over all shards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of lookups for absent keys
    pub misses: u64,
    /// Number of entries evicted to make room for writes
    pub evictions: u64,
    /// Current number of entries
    pub total_entries: usize,
    /// Bytes currently charged against capacity
    pub size_bytes: usize,
    /// Maximum bytes that may be stored
    pub capacity_bytes: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Merge ==
    /// Adds another shard's numbers into this one.
    pub fn merge(&mut self, other: &CacheStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.evictions += other.evictions;
        self.total_entries += other.total_entries;
        self.size_bytes += other.size_bytes;
        self.capacity_bytes += other.capacity_bytes;
    }
}
