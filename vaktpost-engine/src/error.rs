use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vaktpost_capture::{CaptureError, SegmentError};
use vaktpost_config::ConfigError;
use vaktpost_core::QueueError;
use vaktpost_detection::DetectionError;
use vaktpost_sink::SinkError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue setup failed: {0}")]
    Queue(#[from] QueueError),

    #[error("Stream source error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Segmenter setup failed: {0}")]
    Segment(#[from] SegmentError),

    #[error("Detector setup failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Alert sink setup failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Telemetry setup failed: {0}")]
    Telemetry(String),

    #[error("Cannot scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to spawn worker {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}
