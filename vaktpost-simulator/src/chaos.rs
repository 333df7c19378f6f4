//! Fault injection for the synthetic source.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Which faults the synthetic source injects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChaosPlan {
    /// Frame indices at which the open connection fails instead of yielding
    /// the frame. The frame is served after reconnecting.
    pub disconnect_before: BTreeSet<u64>,
    /// Number of connect attempts refused after every disconnect.
    pub refused_connects: u32,
}

impl ChaosPlan {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn disconnect_before(frames: impl IntoIterator<Item = u64>) -> Self {
        Self {
            disconnect_before: frames.into_iter().collect(),
            refused_connects: 0,
        }
    }

    pub fn with_refused_connects(mut self, attempts: u32) -> Self {
        self.refused_connects = attempts;
        self
    }

    /// Seeded random plan: each frame index in `1..total_frames` becomes a
    /// disconnect point with probability `rate`.
    pub fn random(seed: u64, total_frames: u64, rate: f64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let rate = rate.clamp(0.0, 1.0);
        Self {
            disconnect_before: (1..total_frames).filter(|_| rng.random_bool(rate)).collect(),
            refused_connects: rng.random_range(0..3),
        }
    }

    pub fn disconnects_at(&self, frame: u64) -> bool {
        self.disconnect_before.contains(&frame)
    }
}
