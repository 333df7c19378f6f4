//! ## vaktpost-core::time
//! **Monotonic and wall clocks**
//!
//! Chunk boundaries are measured on the monotonic reading; only labels
//! (filenames, alert timestamps) come from the wall clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of time for the segmenter.
pub trait Clock: Send + Sync {
    /// Monotonic time elapsed since the clock's origin.
    fn monotonic(&self) -> Duration;

    /// Current wall-clock time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real clock: `Instant` for measurement, `Utc::now()` for labels.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    #[inline]
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for simulation and tests.
///
/// Both readings move only when [`VirtualClock::advance`] is called; the wall
/// clock is `epoch + offset`.
#[derive(Clone)]
pub struct VirtualClock {
    epoch: DateTime<Utc>,
    offset: Arc<AtomicU64>, // Nanoseconds
}

impl VirtualClock {
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            offset: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn now_ns(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    pub fn advance(&self, by: Duration) {
        self.offset
            .fetch_add(by.as_nanos() as u64, Ordering::AcqRel);
    }
}

impl Clock for VirtualClock {
    fn monotonic(&self) -> Duration {
        Duration::from_nanos(self.now_ns())
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.epoch + chrono::Duration::nanoseconds(self.now_ns() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn virtual_clock_starts_at_epoch() {
        let epoch = Utc.with_ymd_and_hms(2025, 5, 4, 2, 8, 20).unwrap();
        let clock = VirtualClock::new(epoch);
        assert_eq!(clock.monotonic(), Duration::ZERO);
        assert_eq!(clock.now_utc(), epoch);
    }

    #[test]
    fn virtual_clock_advance_moves_both_readings() {
        let epoch = Utc.with_ymd_and_hms(2025, 5, 4, 2, 8, 20).unwrap();
        let clock = VirtualClock::new(epoch);
        let shared = clock.clone();
        shared.advance(Duration::from_millis(1500));
        assert_eq!(clock.monotonic(), Duration::from_millis(1500));
        assert_eq!(
            clock.now_utc(),
            epoch + chrono::Duration::milliseconds(1500)
        );
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.monotonic();
        let b = clock.monotonic();
        assert!(b >= a);
    }
}
