//! # Vaktpost Engine
//!
//! Wires the pipeline together and owns its lifecycle.
//!
//! ```text
//! source -> [ingest] -> chunk queue -> [detect x N] -> alert queue -> [persist] -> sink
//! ```
//!
//! Every bracketed stage is a named OS thread. The [`Supervisor`] builds the
//! shared [`Pipeline`](vaktpost_core::Pipeline), starts the threads and joins
//! them with a bounded timeout on stop.

pub mod collaborators;
pub mod error;
pub mod recovery;
pub mod supervisor;
pub mod workers;

pub use collaborators::Collaborators;
pub use error::EngineError;
pub use recovery::{recover_chunks, RecoveryReport};
pub use supervisor::{StopReport, Supervisor};
pub use workers::{build_alert, DetectionWorker, PersistenceWorker, UNKNOWN_EVENT_DESCRIPTION};

pub mod prelude {
    pub use super::{Collaborators, EngineError, StopReport, Supervisor};
    pub use vaktpost_core::PipelineStatus;
}
