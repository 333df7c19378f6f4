//! The detection collaborator contract.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vaktpost_config::EventDefinition;
use vaktpost_core::DetectionResult;

/// Inputs of one detection call.
#[derive(Debug, Clone, Copy)]
pub struct DetectionRequest<'a> {
    pub video_path: &'a Path,
    pub events: &'a [EventDefinition],
    pub context: &'a str,
}

/// Per-event verdicts for one chunk. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub events: Vec<DetectionResult>,
}

impl DetectionReport {
    pub fn detected(&self) -> impl Iterator<Item = &DetectionResult> {
        self.events.iter().filter(|result| result.detected)
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    /// Explicit "no frames could be extracted" outcome.
    #[error("no frames could be extracted from {}", .0.display())]
    NoFrames(PathBuf),

    #[error("detection request failed: {0}")]
    Request(String),

    #[error("detection call exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("detection service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode detection response: {0}")]
    Malformed(String),

    #[error("invalid detection request: {0}")]
    InvalidRequest(String),

    #[error("detector setup failed: {0}")]
    Setup(String),

    #[error("chunk read failed: {0}")]
    Io(#[from] io::Error),
}

/// Inspects one finished chunk.
///
/// Implementations may be slow and may fail; callers treat every error as
/// non-fatal. Calls must be repeatable.
pub trait Detector: Send + Sync {
    fn detect(&self, request: &DetectionRequest<'_>) -> Result<DetectionReport, DetectionError>;
}
