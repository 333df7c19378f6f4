//! In-memory persistence collaborator.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use vaktpost_core::Alert;
use vaktpost_sink::{AlertSink, SinkError};

/// Clones share storage, so a test keeps one handle and gives the other to
/// the engine.
#[derive(Clone, Default)]
pub struct MemorySink {
    alerts: Arc<Mutex<Vec<Alert>>>,
    failures_left: Arc<AtomicUsize>,
    batches: Arc<AtomicUsize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` writes fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

impl AlertSink for MemorySink {
    fn write(&mut self, alerts: &[Alert]) -> Result<usize, SinkError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SinkError::Write(io::Error::new(
                io::ErrorKind::Other,
                "injected sink failure",
            )));
        }
        self.alerts.lock().extend_from_slice(alerts);
        Ok(alerts.len())
    }
}
