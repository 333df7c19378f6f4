//! # Vaktpost Telemetry
//!
//! Logging and metrics for the pipeline stages.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
pub use opentelemetry::KeyValue;
