//! Stream source configuration.
//!
//! Where frames come from and how aggressively the reader reconnects:
//! - Source URL (`tcp://host:port` MJPEG stream or `file://` recording)
//! - Socket timeouts
//! - Reconnect backoff floor and ceiling

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Stream source configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct StreamConfig {
    /// Source URL. Required.
    #[serde(default)]
    #[validate(custom(function = validation::validate_stream_url))]
    pub url: String,

    /// TCP connect timeout (milliseconds).
    #[validate(range(min = 100, max = 600_000))]
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// A read blocking longer than this counts as a read failure (milliseconds).
    #[validate(range(min = 100, max = 600_000))]
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// Reconnect backoff.
    #[validate(nested)]
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_read_timeout() -> u64 {
    10_000
}

impl StreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: default_read_timeout(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Exponential reconnect backoff bounds.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct BackoffConfig {
    /// First delay after a failure (milliseconds).
    #[validate(range(min = 1, max = 3_600_000))]
    #[serde(default = "default_floor")]
    pub floor_ms: u64,

    /// Upper bound on the delay (milliseconds). Must not be below the floor.
    #[validate(range(min = 1, max = 3_600_000))]
    #[serde(default = "default_ceiling")]
    pub ceiling_ms: u64,
}

fn default_floor() -> u64 {
    1_000
}

fn default_ceiling() -> u64 {
    60_000
}

impl BackoffConfig {
    pub fn floor(&self) -> Duration {
        Duration::from_millis(self.floor_ms)
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(self.ceiling_ms)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            floor_ms: default_floor(),
            ceiling_ms: default_ceiling(),
        }
    }
}
