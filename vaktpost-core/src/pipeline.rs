//! The pipeline object: both stage queues plus the shared stop and status flags.
//!
//! Built once by the supervisor and handed to each worker as an `Arc`.
//! Nothing else is shared between worker loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::alert::Alert;
use crate::chunk::Chunk;
use crate::events::{BoundedQueue, QueueError, StopSignal};

/// Read-only status view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    pub active: bool,
    pub chunk_queue_depth: usize,
    pub alert_queue_depth: usize,
}

pub struct Pipeline {
    /// Finalized chunks awaiting detection.
    pub chunks: BoundedQueue<Chunk>,
    /// Alerts awaiting persistence.
    pub alerts: BoundedQueue<Alert>,
    pub stop: StopSignal,
    active: AtomicBool,
    poll_interval: Duration,
}

impl Pipeline {
    pub fn new(
        chunk_capacity: usize,
        alert_capacity: usize,
        poll_interval: Duration,
    ) -> Result<Self, QueueError> {
        Ok(Self {
            chunks: BoundedQueue::with_capacity(chunk_capacity)?,
            alerts: BoundedQueue::with_capacity(alert_capacity)?,
            stop: StopSignal::new(),
            active: AtomicBool::new(false),
            poll_interval,
        })
    }

    /// How long a worker waits on a queue before re-checking the stop signal.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        self.stop.is_raised()
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            active: self.is_active(),
            chunk_queue_depth: self.chunks.len(),
            alert_queue_depth: self.alerts.len(),
        }
    }
}
