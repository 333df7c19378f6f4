//! Everything the pipeline talks to but does not own the logic of.

use std::sync::Arc;

use vaktpost_capture::{source_for_url, ChunkWriterFactory, MjpegWriterFactory, StreamSource};
use vaktpost_config::VaktpostConfig;
use vaktpost_core::{Clock, SystemClock};
use vaktpost_detection::{Detector, HttpDetector};
use vaktpost_sink::{AlertSink, JsonLinesSink};

use crate::error::EngineError;

pub struct Collaborators {
    pub source: Box<dyn StreamSource>,
    pub writers: Box<dyn ChunkWriterFactory>,
    pub detector: Arc<dyn Detector>,
    pub sink: Box<dyn AlertSink>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Production wiring: stream by URL scheme, MJPEG chunk files, HTTP
    /// detector, JSON-lines sink, system clock.
    pub fn from_config(config: &VaktpostConfig) -> Result<Self, EngineError> {
        Ok(Self {
            source: source_for_url(&config.stream)?,
            writers: Box::new(MjpegWriterFactory),
            detector: Arc::new(HttpDetector::new(&config.detection)?),
            sink: Box::new(JsonLinesSink::open(&config.persistence.path)?),
            clock: Arc::new(SystemClock::new()),
        })
    }
}
