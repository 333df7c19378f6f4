//! Chunk segmentation parameters.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Segmenter configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SegmenterConfig {
    /// Directory receiving chunk files; created if absent. Required.
    #[serde(default)]
    pub output_dir: PathBuf,

    /// Length of each chunk in seconds. Signed so that zero and negative
    /// values reach validation instead of failing to parse.
    #[validate(range(min = 1, max = 86_400, message = "chunk duration must be positive"))]
    #[serde(default = "default_chunk_duration")]
    pub chunk_duration_secs: i64,

    /// Chunk file extension, without the dot.
    #[validate(custom(function = validation::validate_extension))]
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Re-enqueue finalized chunks left over from a previous run.
    #[serde(default = "default_true")]
    pub recover_on_start: bool,
}

fn default_chunk_duration() -> i64 {
    5
}

fn default_extension() -> String {
    "mjpeg".into()
}

fn default_true() -> bool {
    true
}

impl SegmenterConfig {
    /// Chunk duration; `None` if the configured value is not positive.
    pub fn chunk_duration(&self) -> Option<Duration> {
        u64::try_from(self.chunk_duration_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::new(),
            chunk_duration_secs: default_chunk_duration(),
            extension: default_extension(),
            recover_on_start: default_true(),
        }
    }
}
