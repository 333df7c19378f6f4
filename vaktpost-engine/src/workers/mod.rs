//! Consumer loops of the pipeline.
//!
//! Both loops wait on their queue for at most one poll interval, so they see
//! a stop request at most that late.

mod detect;
mod persist;

pub use detect::{build_alert, DetectionWorker, UNKNOWN_EVENT_DESCRIPTION};
pub use persist::PersistenceWorker;
