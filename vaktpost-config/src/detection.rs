//! Detection service configuration and the event catalogue.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// One event the detection service is asked about.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    #[validate(length(min = 1, max = 64))]
    pub event_code: String,

    #[validate(length(min = 1))]
    pub event_description: String,

    /// Extra hints appended to the event line in the prompt.
    #[serde(default)]
    pub detection_guidelines: String,
}

/// How a frame is picked within each second of a chunk.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FrameSampling {
    First,
    Last,
    #[default]
    Random,
}

/// API credential. Never printed.
#[derive(Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("ApiKey(<unset>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// Detection configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DetectionConfig {
    /// Vision model name. Required.
    #[serde(default)]
    #[validate(length(min = 1, message = "model is required"))]
    pub model: String,

    /// Base URL of the OpenAI-compatible API. Required.
    #[serde(default)]
    #[validate(url(message = "base_url must be a URL"))]
    pub base_url: String,

    /// Usually supplied through `VAKTPOST_DETECTION__API_KEY`.
    #[serde(default, skip_serializing)]
    pub api_key: ApiKey,

    /// Scene description given to the model. Required.
    #[serde(default)]
    #[validate(length(min = 1, message = "context is required"))]
    pub context: String,

    /// Events to look for in every chunk.
    #[serde(default)]
    #[validate(nested)]
    #[validate(custom(function = validation::validate_unique_codes))]
    pub events: Vec<EventDefinition>,

    /// Deadline for one detection call (seconds); a timeout is a failure.
    #[validate(range(min = 1, max = 3_600))]
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub sampling: FrameSampling,

    /// Number of detection workers. More than one gives up alert ordering
    /// across chunks.
    #[validate(range(min = 1, max = 64))]
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_timeout() -> u64 {
    120
}

fn default_workers() -> usize {
    1
}

impl DetectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Looks up a configured event by code.
    pub fn event(&self, code: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|event| event.event_code == code)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            base_url: String::new(),
            api_key: ApiKey::default(),
            context: String::new(),
            events: Vec::new(),
            timeout_secs: default_timeout(),
            sampling: FrameSampling::default(),
            workers: default_workers(),
        }
    }
}
