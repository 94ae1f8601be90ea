//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::executor::ExecutorConfig;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Total bytes the cache may hold, split evenly across shards
    pub total_capacity: usize,
    /// Number of independently locked shards
    pub stripe_count: usize,
    /// Minimum number of executor workers
    pub low_watermark: usize,
    /// Maximum number of executor workers
    pub high_watermark: usize,
    /// Maximum number of commands waiting for a worker
    pub max_queue_size: usize,
    /// Idle time in milliseconds before a surplus worker retires
    pub idle_timeout_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TOTAL_CAPACITY` - Cache size in bytes (default: 64 MiB)
    /// - `STRIPE_COUNT` - Number of shards (default: 8)
    /// - `EXECUTOR_LOW_WATERMARK` - Minimum workers (default: 2)
    /// - `EXECUTOR_HIGH_WATERMARK` - Maximum workers (default: 8)
    /// - `EXECUTOR_MAX_QUEUE` - Pending command bound (default: 64)
    /// - `EXECUTOR_IDLE_TIMEOUT_MS` - Worker idle timeout (default: 5000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            total_capacity: env_or("TOTAL_CAPACITY", defaults.total_capacity),
            stripe_count: env_or("STRIPE_COUNT", defaults.stripe_count),
            low_watermark: env_or("EXECUTOR_LOW_WATERMARK", defaults.low_watermark),
            high_watermark: env_or("EXECUTOR_HIGH_WATERMARK", defaults.high_watermark),
            max_queue_size: env_or("EXECUTOR_MAX_QUEUE", defaults.max_queue_size),
            idle_timeout_ms: env_or("EXECUTOR_IDLE_TIMEOUT_MS", defaults.idle_timeout_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Executor settings derived from this configuration.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::new(
            self.low_watermark,
            self.high_watermark,
            self.max_queue_size,
            Duration::from_millis(self.idle_timeout_ms),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        let executor = ExecutorConfig::default();
        Self {
            total_capacity: 64 * 1024 * 1024,
            stripe_count: 8,
            low_watermark: executor.low_watermark,
            high_watermark: executor.high_watermark,
            max_queue_size: executor.max_queue_size,
            idle_timeout_ms: executor.idle_timeout.as_millis() as u64,
            server_port: 3000,
        }
    }
}

/// Reads and parses an environment variable, falling back on absence or
/// parse failure.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.total_capacity, 64 * 1024 * 1024);
        assert_eq!(config.stripe_count, 8);
        assert_eq!(config.low_watermark, 2);
        assert_eq!(config.high_watermark, 8);
        assert_eq!(config.max_queue_size, 64);
        assert_eq!(config.idle_timeout_ms, 5000);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "TOTAL_CAPACITY",
            "STRIPE_COUNT",
            "EXECUTOR_LOW_WATERMARK",
            "EXECUTOR_HIGH_WATERMARK",
            "EXECUTOR_MAX_QUEUE",
            "EXECUTOR_IDLE_TIMEOUT_MS",
            "SERVER_PORT",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.total_capacity, 64 * 1024 * 1024);
        assert_eq!(config.stripe_count, 8);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("STRIPECACHE_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("STRIPECACHE_TEST_GARBAGE", 7usize), 7);

        env::set_var("STRIPECACHE_TEST_GARBAGE", " 12 ");
        assert_eq!(env_or("STRIPECACHE_TEST_GARBAGE", 7usize), 12);
        env::remove_var("STRIPECACHE_TEST_GARBAGE");
    }

    #[test]
    fn test_executor_config_from_config() {
        let config = Config {
            low_watermark: 3,
            high_watermark: 6,
            max_queue_size: 12,
            idle_timeout_ms: 250,
            ..Config::default()
        };

        let executor = config.executor_config();
        assert_eq!(executor.low_watermark, 3);
        assert_eq!(executor.high_watermark, 6);
        assert_eq!(executor.max_queue_size, 12);
        assert_eq!(executor.idle_timeout, Duration::from_millis(250));
    }
}
