//! Pipeline lifecycle: validate, wire, spawn, status and bounded shutdown.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use tracing::{error, info, warn};
use validator::Validate;
use vaktpost_capture::{run_ingest_loop, BackoffPolicy, Segmenter, StreamReader};
use vaktpost_config::{ConfigError, VaktpostConfig};
use vaktpost_core::{Pipeline, PipelineStatus};
use vaktpost_telemetry::MetricsRecorder;

use crate::collaborators::Collaborators;
use crate::error::EngineError;
use crate::recovery::recover_chunks;
use crate::workers::{DetectionWorker, PersistenceWorker};

/// Outcome of [`Supervisor::stop`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StopReport {
    /// Workers that exited within the join timeout.
    pub joined: Vec<String>,
    /// Workers still running when the timeout expired; they were detached.
    pub stragglers: Vec<String>,
}

impl StopReport {
    pub fn is_clean(&self) -> bool {
        self.stragglers.is_empty()
    }
}

struct Worker {
    name: String,
    handle: JoinHandle<()>,
    /// Disconnects when the thread's closure is dropped, i.e. on exit.
    done: Receiver<()>,
}

pub struct Supervisor {
    pipeline: Arc<Pipeline>,
    metrics: MetricsRecorder,
    join_timeout: Duration,
    workers: Vec<Worker>,
}

impl Supervisor {
    /// Validates `config`, then builds the pipeline and starts every worker.
    ///
    /// Nothing is spawned and no directory is created when the configuration
    /// is invalid. If a later step fails, workers already running are
    /// stopped before the error is returned.
    pub fn start(config: VaktpostConfig, collaborators: Collaborators) -> Result<Self, EngineError> {
        config.validate().map_err(ConfigError::from)?;
        config.check()?;

        let metrics = MetricsRecorder::new().map_err(|e| EngineError::Telemetry(e.to_string()))?;
        let pipeline = Arc::new(Pipeline::new(
            config.queues.chunk_capacity,
            config.queues.alert_capacity,
            config.queues.poll_interval(),
        )?);

        let Collaborators {
            source,
            writers,
            detector,
            sink,
            clock,
        } = collaborators;

        let segmenter = Segmenter::new(
            &config.segmenter,
            clock,
            writers,
            pipeline.clone(),
            metrics.clone(),
        )?;

        if config.segmenter.recover_on_start {
            let report = recover_chunks(
                segmenter.output_dir(),
                &config.segmenter.extension,
                &pipeline.chunks,
            )?;
            info!(
                enqueued = report.enqueued,
                deferred = report.deferred,
                discarded = report.discarded,
                orphans = report.orphans.len(),
                "Startup recovery finished"
            );
        }

        let mut supervisor = Self {
            pipeline: pipeline.clone(),
            metrics: metrics.clone(),
            join_timeout: config.supervisor.join_timeout(),
            workers: Vec::new(),
        };

        let persistence = PersistenceWorker::new(
            pipeline.clone(),
            sink,
            config.persistence.batch_size,
            metrics.clone(),
        );
        supervisor.spawn("vaktpost-persist", move || persistence.run())?;

        let events: Arc<[_]> = config.detection.events.clone().into();
        let context: Arc<str> = config.detection.context.as_str().into();
        for index in 0..config.detection.workers {
            let worker = DetectionWorker::new(
                pipeline.clone(),
                detector.clone(),
                events.clone(),
                context.clone(),
                metrics.clone(),
            );
            supervisor.spawn(&format!("vaktpost-detect-{index}"), move || worker.run())?;
        }

        let mut reader = StreamReader::new(
            source,
            BackoffPolicy::from_config(&config.stream.backoff),
            metrics.clone(),
        );
        let mut segmenter = segmenter;
        let ingest_pipeline = pipeline.clone();
        supervisor.spawn("vaktpost-ingest", move || {
            if let Err(e) = run_ingest_loop(&mut reader, &mut segmenter, &ingest_pipeline.stop) {
                error!(error = %e, "Ingest stopped on an unrecoverable error");
                ingest_pipeline.set_active(false);
            }
        })?;

        pipeline.set_active(true);
        info!(
            workers = supervisor.workers.len(),
            url = %config.stream.url,
            output_dir = %config.segmenter.output_dir.display(),
            "Pipeline started"
        );
        Ok(supervisor)
    }

    fn spawn<F>(&mut self, name: &str, body: F) -> Result<(), EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        let (done_tx, done) = channel::bounded::<()>(1);
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            let _done = done_tx;
            body();
        });
        match spawned {
            Ok(handle) => {
                self.workers.push(Worker {
                    name: name.to_string(),
                    handle,
                    done,
                });
                Ok(())
            }
            Err(source) => {
                error!(worker = name, error = %source, "Worker spawn failed, stopping started workers");
                self.shutdown();
                Err(EngineError::Spawn {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Active flag and queue depths; also refreshes the depth gauges.
    pub fn status(&self) -> PipelineStatus {
        let status = self.pipeline.status();
        self.metrics
            .set_queue_depths(status.chunk_queue_depth, status.alert_queue_depth);
        status
    }

    /// Raises the stop signal and joins every worker, waiting at most the
    /// join timeout in total. Workers still running after that are logged
    /// and detached.
    pub fn stop(mut self) -> StopReport {
        info!("Stopping pipeline");
        let report = self.shutdown();
        if report.is_clean() {
            info!(joined = report.joined.len(), "Pipeline stopped");
        } else {
            warn!(stragglers = ?report.stragglers, "Pipeline stopped with workers still running");
        }
        report
    }

    fn shutdown(&mut self) -> StopReport {
        self.pipeline.stop.raise();
        let deadline = Instant::now() + self.join_timeout;
        let mut report = StopReport::default();

        for worker in self.workers.drain(..) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match worker.done.recv_timeout(remaining) {
                Err(RecvTimeoutError::Timeout) => {
                    warn!(worker = %worker.name, timeout = ?self.join_timeout, "Worker did not stop in time");
                    report.stragglers.push(worker.name);
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if worker.handle.join().is_err() {
                        error!(worker = %worker.name, "Worker panicked");
                    }
                    report.joined.push(worker.name);
                }
            }
        }

        self.pipeline.set_active(false);
        report
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tracing_test::traced_test;
    use vaktpost_capture::MjpegWriterFactory;
    use vaktpost_config::EventDefinition;
    use vaktpost_core::VirtualClock;
    use vaktpost_simulator::{MemorySink, ScriptedDetector, SyntheticSource};

    fn setup(dir: &std::path::Path) -> (VaktpostConfig, Collaborators) {
        let mut config = VaktpostConfig::default();
        config.stream.url = "file:///synthetic.mjpeg".into();
        config.segmenter.output_dir = dir.join("chunks");
        config.queues.poll_interval_ms = 10;
        config.detection.model = "vision-test".into();
        config.detection.base_url = "http://127.0.0.1:9/v1".into();
        config.detection.context = "Yard".into();
        config.detection.workers = 2;
        config.detection.events = vec![EventDefinition {
            event_code: "fall".into(),
            event_description: "A person falls".into(),
            detection_guidelines: String::new(),
        }];
        config.persistence.path = dir.join("alerts.jsonl");
        config.supervisor.join_timeout_secs = 2;

        let clock = VirtualClock::new(Utc.with_ymd_and_hms(2025, 5, 4, 2, 8, 20).unwrap());
        let collaborators = Collaborators {
            source: Box::new(SyntheticSource::new(clock.clone(), 10, 30)),
            writers: Box::new(MjpegWriterFactory),
            detector: Arc::new(ScriptedDetector::quiet()),
            sink: Box::new(MemorySink::new()),
            clock: Arc::new(clock),
        };
        (config, collaborators)
    }

    #[traced_test]
    #[test]
    fn start_then_stop_joins_every_worker() {
        let dir = tempfile::tempdir().unwrap();
        let (config, collaborators) = setup(dir.path());

        let supervisor = Supervisor::start(config, collaborators).unwrap();
        assert!(supervisor.status().active);
        assert!(logs_contain("Pipeline started"));

        let report = supervisor.stop();
        assert!(report.is_clean());
        let mut joined = report.joined.clone();
        joined.sort();
        assert_eq!(
            joined,
            [
                "vaktpost-detect-0",
                "vaktpost-detect-1",
                "vaktpost-ingest",
                "vaktpost-persist"
            ]
        );
        assert!(logs_contain("Pipeline stopped"));
    }

    #[test]
    fn status_updates_queue_gauges() {
        let dir = tempfile::tempdir().unwrap();
        let (mut config, collaborators) = setup(dir.path());
        config.segmenter.recover_on_start = false;

        let supervisor = Supervisor::start(config, collaborators).unwrap();
        let status = supervisor.status();
        assert_eq!(
            supervisor.metrics().chunk_queue_depth.get(),
            status.chunk_queue_depth as i64
        );
        drop(supervisor);
    }

    #[test]
    fn missing_output_dir_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut config, collaborators) = setup(dir.path());
        config.segmenter.output_dir = Default::default();

        let err = Supervisor::start(config, collaborators).err().unwrap();
        assert!(matches!(err, EngineError::Config(ConfigError::Inconsistent(_))));
    }
}
