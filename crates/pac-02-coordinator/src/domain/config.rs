//! # Coordinator Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coordinator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// How many times a phase call is re-sent to one shard after a
    /// connectivity error before the shard is given up on.
    pub max_retries: u32,
    /// Pause before each re-send, in milliseconds. Doubles on every attempt.
    pub retry_backoff_ms: u64,
    /// Dispatch one phase to all shards at once (`true`) or one after the
    /// other (`false`). Either way every response is awaited before the next
    /// phase starts.
    pub concurrent_dispatch: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_ms: 200,
            concurrent_dispatch: true,
        }
    }
}

impl CoordinatorConfig {
    /// Fast configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            max_retries: 2,
            retry_backoff_ms: 1,
            concurrent_dispatch: true,
        }
    }

    /// Backoff before re-send number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.max_retries, 3);
        assert!(config.concurrent_dispatch);
    }

    #[test]
    fn test_backoff_doubles() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(200));
        assert_eq!(config.backoff(2), Duration::from_millis(400));
        assert_eq!(config.backoff(3), Duration::from_millis(800));
    }
}
