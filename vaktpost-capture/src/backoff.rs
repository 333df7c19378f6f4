//! Reconnect backoff as a pure function of the consecutive-failure count.

use std::time::Duration;

use vaktpost_config::BackoffConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    floor: Duration,
    ceiling: Duration,
}

impl BackoffPolicy {
    /// A ceiling below the floor is raised to the floor.
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling: ceiling.max(floor),
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.floor(), config.ceiling())
    }

    pub fn floor(&self) -> Duration {
        self.floor
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Delay before the next connection attempt after `failures` consecutive
    /// failures: zero with no failures, then `floor * 2^(failures - 1)`
    /// capped at the ceiling.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        // Shifts past 31 saturate instead of overflowing.
        let multiplier = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
        self.floor
            .checked_mul(multiplier)
            .unwrap_or(self.ceiling)
            .min(self.ceiling)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}
