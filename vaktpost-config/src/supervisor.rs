//! Worker lifecycle parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Supervisor configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SupervisorConfig {
    /// How long `stop()` waits for all workers together (seconds).
    #[validate(range(min = 1, max = 600))]
    #[serde(default = "default_join_timeout")]
    pub join_timeout_secs: u64,

    /// Interval of the periodic status line (seconds).
    #[validate(range(min = 1, max = 3_600))]
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
}

fn default_join_timeout() -> u64 {
    10
}

fn default_status_interval() -> u64 {
    5
}

impl SupervisorConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: default_join_timeout(),
            status_interval_secs: default_status_interval(),
        }
    }
}
