use std::sync::Arc;

use tracing::{debug, error, info, instrument};
use vaktpost_core::{Alert, Pipeline};
use vaktpost_sink::AlertSink;
use vaktpost_telemetry::{EventLogger, KeyValue, MetricsRecorder};

/// Drains the alert queue into the sink in batches.
pub struct PersistenceWorker {
    pipeline: Arc<Pipeline>,
    sink: Box<dyn AlertSink>,
    batch_size: usize,
    metrics: MetricsRecorder,
}

impl PersistenceWorker {
    pub fn new(
        pipeline: Arc<Pipeline>,
        sink: Box<dyn AlertSink>,
        batch_size: usize,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            pipeline,
            sink,
            batch_size: batch_size.max(1),
            metrics,
        }
    }

    #[instrument(level = "info", name = "persistence_worker", skip_all)]
    pub fn run(mut self) {
        info!("Persistence worker started");
        while !self.pipeline.should_stop() {
            let batch = self.next_batch();
            if !batch.is_empty() {
                self.persist(&batch);
            }
        }

        // Alerts already queued when stop was raised are still written.
        loop {
            let batch = self.drain_batch(Vec::with_capacity(self.batch_size));
            if batch.is_empty() {
                break;
            }
            self.persist(&batch);
        }
        info!("Persistence worker stopped");
    }

    /// Waits up to one poll interval for the first alert, then takes whatever
    /// else is queued, up to the batch size.
    fn next_batch(&self) -> Vec<Alert> {
        match self.pipeline.alerts.pop_timeout(self.pipeline.poll_interval()) {
            Some(first) => {
                let mut batch = Vec::with_capacity(self.batch_size);
                batch.push(first);
                self.drain_batch(batch)
            }
            None => Vec::new(),
        }
    }

    fn drain_batch(&self, mut batch: Vec<Alert>) -> Vec<Alert> {
        while batch.len() < self.batch_size {
            match self.pipeline.alerts.try_pop() {
                Some(alert) => batch.push(alert),
                None => break,
            }
        }
        batch
    }

    /// Writes one batch. A failed batch is logged and dropped.
    pub fn persist(&mut self, batch: &[Alert]) -> Option<usize> {
        match self.sink.write(batch) {
            Ok(written) => {
                self.metrics.alerts_persisted.inc_by(written as u64);
                debug!(written, "Alerts persisted");
                EventLogger::log_event(
                    "alert_persisted",
                    vec![KeyValue::new("count", written as i64)],
                );
                Some(written)
            }
            Err(e) => {
                self.metrics.persistence_failures.inc();
                let codes: Vec<&str> = batch.iter().map(|alert| alert.event_code.as_str()).collect();
                error!(error = %e, alerts = batch.len(), ?codes, "Persisting alerts failed");
                None
            }
        }
    }
}
