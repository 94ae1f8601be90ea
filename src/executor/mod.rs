//! Executor Module
//!
//! Elastic thread pool that runs request handling off the async runtime.
//!
//! # Components
//! - `ExecutorConfig`: watermarks, queue bound and idle timeout
//! - `Executor`: the pool itself, with `submit` and `stop`

mod config;
mod pool;

pub use config::ExecutorConfig;
pub use pool::{Executor, ExecutorState, ExecutorStats};
