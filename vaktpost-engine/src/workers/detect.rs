use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};
use vaktpost_config::EventDefinition;
use vaktpost_core::{Alert, Chunk, DetectionResult, Pipeline};
use vaktpost_detection::{DetectionError, DetectionRequest, Detector};
use vaktpost_telemetry::{EventLogger, KeyValue, MetricsRecorder};

/// Description used when the service reports a code that is not configured.
pub const UNKNOWN_EVENT_DESCRIPTION: &str = "Unknown event description";

/// Alert for a positive finding on `chunk`, labelled with the chunk's end.
pub fn build_alert(chunk: &Chunk, result: &DetectionResult, events: &[EventDefinition]) -> Alert {
    let event_description = events
        .iter()
        .find(|event| event.event_code == result.event_code)
        .map(|event| event.event_description.clone())
        .unwrap_or_else(|| UNKNOWN_EVENT_DESCRIPTION.to_string());
    Alert {
        event_timestamp: chunk.ended_at.unwrap_or(chunk.started_at),
        event_code: result.event_code.clone(),
        event_description,
        ai_explanation: result.explanation.clone(),
        video_url: chunk.path.display().to_string(),
    }
}

/// Takes finalized chunks, asks the detector about them, publishes alerts
/// and deletes the chunk file whatever the outcome.
pub struct DetectionWorker {
    pipeline: Arc<Pipeline>,
    detector: Arc<dyn Detector>,
    events: Arc<[EventDefinition]>,
    context: Arc<str>,
    metrics: MetricsRecorder,
}

impl DetectionWorker {
    pub fn new(
        pipeline: Arc<Pipeline>,
        detector: Arc<dyn Detector>,
        events: Arc<[EventDefinition]>,
        context: Arc<str>,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            pipeline,
            detector,
            events,
            context,
            metrics,
        }
    }

    #[instrument(level = "info", name = "detection_worker", skip_all)]
    pub fn run(&self) {
        info!("Detection worker started");
        while !self.pipeline.should_stop() {
            if let Some(chunk) = self.pipeline.chunks.pop_timeout(self.pipeline.poll_interval()) {
                self.process(chunk);
            }
        }
        info!("Detection worker stopped");
    }

    /// Handles one chunk; returns the number of alerts published.
    pub fn process(&self, chunk: Chunk) -> usize {
        debug!(path = %chunk.path.display(), frames = chunk.frame_count, "Detecting events");
        let request = DetectionRequest {
            video_path: &chunk.path,
            events: &self.events,
            context: &self.context,
        };
        let started = Instant::now();
        let outcome = self.detector.detect(&request);
        self.metrics
            .detection_latency
            .observe(started.elapsed().as_secs_f64());

        let published = match outcome {
            Ok(report) => {
                let mut published = 0;
                for result in report.detected() {
                    if self.publish(build_alert(&chunk, result, &self.events)) {
                        published += 1;
                    }
                }
                info!(
                    path = %chunk.path.display(),
                    results = report.events.len(),
                    alerts = published,
                    "Detection finished"
                );
                published
            }
            Err(DetectionError::NoFrames(path)) => {
                self.metrics.detection_failures.inc();
                warn!(path = %path.display(), "No frames could be extracted");
                0
            }
            Err(e) => {
                self.metrics.detection_failures.inc();
                error!(path = %chunk.path.display(), error = %e, "Detection failed");
                0
            }
        };

        remove_chunk(&chunk);
        published
    }

    fn publish(&self, alert: Alert) -> bool {
        self.metrics.alerts.inc();
        EventLogger::log_event(
            "alert_raised",
            vec![
                KeyValue::new("event_code", alert.event_code.clone()),
                KeyValue::new("video_url", alert.video_url.clone()),
            ],
        );
        let wait = self.pipeline.poll_interval();
        match self.pipeline.alerts.push_blocking(alert, &self.pipeline.stop, wait) {
            Ok(()) => true,
            Err(rejected) => {
                let reason = rejected.reason;
                let alert = rejected.into_inner();
                error!(
                    %reason,
                    event_code = %alert.event_code,
                    event_timestamp = %alert.event_timestamp,
                    video_url = %alert.video_url,
                    "Alert not queued for persistence"
                );
                false
            }
        }
    }
}

fn remove_chunk(chunk: &Chunk) {
    match fs::remove_file(&chunk.path) {
        Ok(()) => debug!(path = %chunk.path.display(), "Chunk removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %chunk.path.display(), error = %e, "Removing chunk failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;
    use std::time::Duration;
    use vaktpost_core::ChunkStatus;
    use vaktpost_detection::DetectionReport;

    struct Fixed(Result<Vec<DetectionResult>, ()>);

    impl Detector for Fixed {
        fn detect(&self, request: &DetectionRequest<'_>) -> Result<DetectionReport, DetectionError> {
            match &self.0 {
                Ok(events) => Ok(DetectionReport {
                    events: events.clone(),
                }),
                Err(()) => Err(DetectionError::NoFrames(request.video_path.to_path_buf())),
            }
        }
    }

    fn events() -> Vec<EventDefinition> {
        ["fall", "fire"]
            .iter()
            .map(|code| EventDefinition {
                event_code: code.to_string(),
                event_description: format!("{code} description"),
                detection_guidelines: String::new(),
            })
            .collect()
    }

    fn chunk(dir: &std::path::Path) -> Chunk {
        let path = dir.join("20250504020824_20250504020829.mjpeg");
        fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        Chunk {
            started_at: Utc.with_ymd_and_hms(2025, 5, 4, 2, 8, 24).unwrap(),
            ended_at: Some(Utc.with_ymd_and_hms(2025, 5, 4, 2, 8, 29).unwrap()),
            path,
            frame_count: 1,
            status: ChunkStatus::Ready,
        }
    }

    fn worker(detector: Fixed) -> (DetectionWorker, Arc<Pipeline>) {
        let pipeline = Arc::new(Pipeline::new(4, 8, Duration::from_millis(10)).unwrap());
        let worker = DetectionWorker::new(
            pipeline.clone(),
            Arc::new(detector),
            events().into(),
            "Loading dock".into(),
            MetricsRecorder::new().unwrap(),
        );
        (worker, pipeline)
    }

    #[test]
    fn alert_uses_configured_description_and_chunk_end() {
        let c = Chunk {
            started_at: Utc.with_ymd_and_hms(2025, 5, 4, 2, 8, 24).unwrap(),
            ended_at: Some(Utc.with_ymd_and_hms(2025, 5, 4, 2, 8, 29).unwrap()),
            path: PathBuf::from("/c/20250504020824_20250504020829.mjpeg"),
            frame_count: 10,
            status: ChunkStatus::Ready,
        };
        let alert = build_alert(&c, &DetectionResult::new("fire", true, "smoke"), &events());
        assert_eq!(alert.event_description, "fire description");
        assert_eq!(alert.event_timestamp, c.ended_at.unwrap());
        assert_eq!(alert.ai_explanation, "smoke");
        assert_eq!(alert.video_url, "/c/20250504020824_20250504020829.mjpeg");

        let unknown = build_alert(&c, &DetectionResult::new("flood", true, ""), &events());
        assert_eq!(unknown.event_description, UNKNOWN_EVENT_DESCRIPTION);
    }

    #[test]
    fn positive_findings_become_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, pipeline) = worker(Fixed(Ok(vec![
            DetectionResult::new("fall", true, "on the floor"),
            DetectionResult::new("fire", false, ""),
            DetectionResult::new("fire", true, "flames"),
        ])));
        let c = chunk(dir.path());
        let path = c.path.clone();

        assert_eq!(worker.process(c), 2);
        assert_eq!(pipeline.alerts.len(), 2);
        assert!(!path.exists());
    }

    #[test]
    fn failed_detection_still_removes_the_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, pipeline) = worker(Fixed(Err(())));
        let c = chunk(dir.path());
        let path = c.path.clone();

        assert_eq!(worker.process(c), 0);
        assert!(pipeline.alerts.is_empty());
        assert!(!path.exists());
        assert_eq!(worker.metrics.detection_failures.get(), 1);
    }
}
