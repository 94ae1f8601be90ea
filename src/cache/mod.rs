//! Cache Module
//!
//! Byte-bounded LRU storage, split into independently locked shards.

mod entry;
mod lru;
mod sharded;
mod stats;
mod store;


// Re-export public types
pub use entry::Entry;
pub use lru::{Handle, LruList};
pub use sharded::ShardedStore;
pub use stats::CacheStats;
pub use store::LruStore;

// == Public Constants ==
/// Smallest capacity a shard may be built with (1 MiB)
pub const MIN_SHARD_CAPACITY: usize = 1024 * 1024;

/// Maximum allowed key length in bytes for requests
pub const MAX_KEY_LENGTH: usize = 256;
