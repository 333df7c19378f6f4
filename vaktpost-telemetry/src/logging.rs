//! Structured logging with tracing and OpenTelemetry attributes.
//!
//! Lifecycle events (chunk finalized, stream lost, alert raised, ...) go through
//! [`EventLogger::log_event`] so they share one span name and field layout.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone, Debug)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
    pub fn init(default_level: &str) -> Result<(), InitError> {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .try_init()
    }

    #[inline]
    pub fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "pipeline_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        span.in_scope(|| {
            tracing::info!(
                metadata = ?metadata,
                "Pipeline event: {}",
                event_type
            );
        });
    }
}
