//! # Vaktpost Sink
//!
//! The persistence collaborator. A sink takes batches of alerts and reports
//! how many it wrote; failures are logged by the caller and never retried.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vaktpost_core::Alert;

pub mod jsonl;

pub use jsonl::JsonLinesSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot open alert sink {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("alert write failed: {0}")]
    Write(#[from] io::Error),

    #[error("alert encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait AlertSink: Send {
    /// Persists `alerts` and returns the number written.
    fn write(&mut self, alerts: &[Alert]) -> Result<usize, SinkError>;
}
