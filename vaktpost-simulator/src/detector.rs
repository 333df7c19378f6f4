//! Scripted detection collaborator.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;
use vaktpost_core::{ChunkName, DetectionResult};
use vaktpost_detection::{DetectionError, DetectionReport, DetectionRequest, Detector};

/// One canned answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Report(Vec<DetectionResult>),
    NoFrames,
    Failure(String),
}

impl ScriptedOutcome {
    fn into_result(self, path: PathBuf) -> Result<DetectionReport, DetectionError> {
        match self {
            ScriptedOutcome::Report(events) => Ok(DetectionReport { events }),
            ScriptedOutcome::NoFrames => Err(DetectionError::NoFrames(path)),
            ScriptedOutcome::Failure(message) => Err(DetectionError::Request(message)),
        }
    }
}

/// What the detector saw on one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedCall {
    pub path: PathBuf,
    pub name: Option<ChunkName>,
    pub file_existed: bool,
    pub context: String,
    pub event_codes: Vec<String>,
}

/// Answers from a queue of outcomes, then repeats the fallback.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    fallback: ScriptedOutcome,
    latency: Duration,
    calls: Mutex<Vec<ObservedCall>>,
}

impl ScriptedDetector {
    pub fn new(fallback: ScriptedOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reports nothing detected, forever.
    pub fn quiet() -> Self {
        Self::new(ScriptedOutcome::Report(Vec::new()))
    }

    pub fn then(self, outcome: ScriptedOutcome) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    /// Real-time delay added to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<ObservedCall> {
        self.calls.lock().clone()
    }
}

impl Detector for ScriptedDetector {
    fn detect(&self, request: &DetectionRequest<'_>) -> Result<DetectionReport, DetectionError> {
        self.calls.lock().push(ObservedCall {
            path: request.video_path.to_path_buf(),
            name: ChunkName::from_path(request.video_path),
            file_existed: request.video_path.exists(),
            context: request.context.to_string(),
            event_codes: request.events.iter().map(|e| e.event_code.clone()).collect(),
        });
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        outcome.into_result(request.video_path.to_path_buf())
    }
}
