//! stripecache - an in-memory cache server
//!
//! A byte-bounded LRU store split into independently locked shards, with
//! store commands executed on an elastic worker pool.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;

pub use api::AppState;
pub use cache::ShardedStore;
pub use config::Config;
pub use error::CacheError;
pub use executor::{Executor, ExecutorConfig};
