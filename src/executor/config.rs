//! Executor Configuration
//!
//! Sizing knobs for the worker pool.

use std::time::Duration;

// == Executor Config ==
/// Sizing parameters for an [`Executor`](super::Executor).
///
/// Out of range values are clamped by [`ExecutorConfig::normalized`], never
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Workers kept alive even when idle
    pub low_watermark: usize,
    /// Upper bound on live workers
    pub high_watermark: usize,
    /// Upper bound on tasks waiting to start
    pub max_queue_size: usize,
    /// How long an idle worker waits before it may retire
    pub idle_timeout: Duration,
}

impl ExecutorConfig {
    pub fn new(
        low_watermark: usize,
        high_watermark: usize,
        max_queue_size: usize,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            low_watermark,
            high_watermark,
            max_queue_size,
            idle_timeout,
        }
    }

    // == Normalize ==
    /// Clamps the values so that `1 <= low <= high` and the queue holds at
    /// least one task.
    pub fn normalized(self) -> Self {
        let low_watermark = self.low_watermark.max(1);
        Self {
            low_watermark,
            high_watermark: self.high_watermark.max(low_watermark),
            max_queue_size: self.max_queue_size.max(1),
            idle_timeout: self.idle_timeout,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            low_watermark: 2,
            high_watermark: 8,
            max_queue_size: 64,
            idle_timeout: Duration::from_secs(5),
        }
    }
}
