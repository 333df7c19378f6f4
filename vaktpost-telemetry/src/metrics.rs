//! Prometheus registry for pipeline counters, gauges and detection latency.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub frames: IntCounter,
    pub chunks_finalized: IntCounter,
    pub chunks_discarded: IntCounter,
    pub stream_reconnects: IntCounter,
    pub detection_failures: IntCounter,
    pub alerts: IntCounter,
    pub alerts_persisted: IntCounter,
    pub persistence_failures: IntCounter,
    pub detection_latency: Histogram,
    pub chunk_queue_depth: IntGauge,
    pub alert_queue_depth: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, prometheus::Error> {
    let gauge = IntGauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let detection_latency = Histogram::with_opts(
            HistogramOpts::new(
                "vaktpost_detection_latency_seconds",
                "Time spent in one detection call",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;
        registry.register(Box::new(detection_latency.clone()))?;

        Ok(Self {
            frames: counter(&registry, "vaktpost_frames_total", "Frames read from the stream")?,
            chunks_finalized: counter(
                &registry,
                "vaktpost_chunks_finalized_total",
                "Chunks renamed to their final name and published",
            )?,
            chunks_discarded: counter(
                &registry,
                "vaktpost_chunks_discarded_total",
                "Chunks dropped without finalization",
            )?,
            stream_reconnects: counter(
                &registry,
                "vaktpost_stream_reconnects_total",
                "Connection attempts after a stream failure",
            )?,
            detection_failures: counter(
                &registry,
                "vaktpost_detection_failures_total",
                "Detection calls that returned an error",
            )?,
            alerts: counter(&registry, "vaktpost_alerts_total", "Alerts raised by detection")?,
            alerts_persisted: counter(
                &registry,
                "vaktpost_alerts_persisted_total",
                "Alerts written by the sink",
            )?,
            persistence_failures: counter(
                &registry,
                "vaktpost_persistence_failures_total",
                "Failed sink writes",
            )?,
            chunk_queue_depth: gauge(
                &registry,
                "vaktpost_chunk_queue_depth",
                "Finalized chunks awaiting detection",
            )?,
            alert_queue_depth: gauge(
                &registry,
                "vaktpost_alert_queue_depth",
                "Alerts awaiting persistence",
            )?,
            detection_latency,
            registry,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn set_queue_depths(&self, chunks: usize, alerts: usize) {
        self.chunk_queue_depth.set(chunks as i64);
        self.alert_queue_depth.set(alerts as i64);
    }
}
