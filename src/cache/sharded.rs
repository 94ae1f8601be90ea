//! Sharded Store Module
//!
//! Splits the key space over independently locked [`LruStore`] shards.

use parking_lot::Mutex;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::cache::{CacheStats, LruStore, MIN_SHARD_CAPACITY};
use crate::error::{CacheError, Result};

// == Sharded Store ==
/// Thread-safe cache made of `stripe_count` LRU shards.
///
/// A key always lands on shard `xxh3_64(key) % stripe_count`. Each shard has
/// its own mutex, so commands on keys in different shards never contend.
/// There is no ordering between shards.
#[derive(Debug)]
pub struct ShardedStore {
    shards: Vec<Mutex<LruStore>>,
    shard_capacity: usize,
}

impl ShardedStore {
    // == Constructor ==
    /// Builds a store holding `total_capacity` bytes split evenly over
    /// `stripe_count` shards.
    ///
    /// Fails when there are no shards or when a shard would get less than
    /// [`MIN_SHARD_CAPACITY`] bytes.
    pub fn build(total_capacity: usize, stripe_count: usize) -> Result<Self> {
        if stripe_count == 0 {
            return Err(CacheError::InvalidConfig(
                "stripe count must be at least 1".to_string(),
            ));
        }

        let shard_capacity = total_capacity / stripe_count;
        if shard_capacity < MIN_SHARD_CAPACITY {
            return Err(CacheError::InvalidConfig(format!(
                "shard capacity {} bytes ({} bytes over {} shards) is below the minimum of {} bytes",
                shard_capacity, total_capacity, stripe_count, MIN_SHARD_CAPACITY
            )));
        }

        let shards = (0..stripe_count)
            .map(|_| Mutex::new(LruStore::new(shard_capacity)))
            .collect();

        debug!(
            "Built sharded store: {} shards of {} bytes",
            stripe_count, shard_capacity
        );

        Ok(Self {
            shards,
            shard_capacity,
        })
    }

    // == Routing ==
    /// Returns the shard responsible for `key`.
    pub fn shard_index(&self, key: &[u8]) -> usize {
        (xxh3_64(key) % self.shards.len() as u64) as usize
    }

    fn shard(&self, key: &[u8]) -> &Mutex<LruStore> {
        &self.shards[self.shard_index(key)]
    }

    // == Commands ==
    /// See [`LruStore::put`].
    pub fn put(&self, key: &[u8], value: &[u8]) -> bool {
        self.shard(key).lock().put(key, value)
    }

    /// See [`LruStore::put_if_absent`].
    pub fn put_if_absent(&self, key: &[u8], value: &[u8]) -> bool {
        self.shard(key).lock().put_if_absent(key, value)
    }

    /// See [`LruStore::set`].
    pub fn set(&self, key: &[u8], value: &[u8]) -> bool {
        self.shard(key).lock().set(key, value)
    }

    /// See [`LruStore::delete`].
    pub fn delete(&self, key: &[u8]) -> bool {
        self.shard(key).lock().delete(key)
    }

    /// See [`LruStore::get`].
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.shard(key).lock().get(key)
    }

    // == Observers ==
    /// Checks whether a pair could ever fit into a single shard.
    pub fn can_hold(&self, key: &[u8], value: &[u8]) -> bool {
        key.len().saturating_add(value.len()) <= self.shard_capacity
    }

    pub fn stripe_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_capacity(&self) -> usize {
        self.shard_capacity
    }

    /// Total bytes across all shards.
    pub fn capacity(&self) -> usize {
        self.shard_capacity * self.shards.len()
    }

    /// Number of stored entries. Shards are read one after another, so
    /// the result is not a point-in-time snapshot under concurrent writes.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    /// Bytes currently stored across all shards.
    pub fn size(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().size()).sum()
    }

    /// Sums the statistics of every shard.
    pub fn stats(&self) -> CacheStats {
        self.shards
            .iter()
            .fold(CacheStats::new(), |mut total, shard| {
                total.merge(&shard.lock().stats());
                total
            })
    }

    /// Statistics of each shard, in shard order.
    pub fn shard_stats(&self) -> Vec<CacheStats> {
        self.shards.iter().map(|shard| shard.lock().stats()).collect()
    }
}
