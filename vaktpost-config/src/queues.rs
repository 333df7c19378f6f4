//! Stage queue sizing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Queue configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct QueueConfig {
    /// Maximum finalized chunks awaiting detection.
    #[validate(range(min = 1, max = 100_000))]
    #[serde(default = "default_capacity")]
    pub chunk_capacity: usize,

    /// Maximum alerts awaiting persistence.
    #[validate(range(min = 1, max = 100_000))]
    #[serde(default = "default_capacity")]
    pub alert_capacity: usize,

    /// Bounded wait on every queue operation (milliseconds). Workers notice a
    /// stop request at most this late.
    #[validate(range(min = 1, max = 60_000))]
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_capacity() -> usize {
    100
}

fn default_poll_interval() -> u64 {
    1_000
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            chunk_capacity: default_capacity(),
            alert_capacity: default_capacity(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}
