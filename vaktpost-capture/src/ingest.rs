//! The ingest loop: reader events drive the segmenter until stop.

use tracing::{info, instrument, warn};
use vaktpost_core::StopSignal;

use crate::reader::{ReaderEvent, StreamReader};
use crate::segmenter::{SegmentError, Segmenter};

/// Runs until `stop` is raised or a fatal segmenter error occurs.
///
/// On every exit path the open chunk is finalized (or discarded when empty)
/// and the connection handle is released before returning.
#[instrument(level = "info", name = "ingest_loop", skip_all, fields(url = %reader.url()))]
pub fn run_ingest_loop(
    reader: &mut StreamReader,
    segmenter: &mut Segmenter,
    stop: &StopSignal,
) -> Result<(), SegmentError> {
    info!("Ingest loop started");
    let result = loop {
        if stop.is_raised() {
            break Ok(());
        }
        match reader.poll(stop) {
            Some(ReaderEvent::Frame(frame)) => match segmenter.push_frame(&frame) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => break Err(e),
                Err(e) => warn!(error = %e, "Frame dropped"),
            },
            Some(ReaderEvent::Lost) => segmenter.flush(),
            None => break Ok(()),
        }
    };

    segmenter.flush();
    reader.disconnect();
    match &result {
        Ok(()) => info!("Ingest loop stopped"),
        Err(e) => warn!(error = %e, "Ingest loop aborted"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffPolicy;
    use crate::source::{CaptureError, Frame, FrameStream, StreamSource};
    use crate::writer::MjpegWriterFactory;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_test::traced_test;
    use vaktpost_config::SegmenterConfig;
    use vaktpost_core::{Pipeline, VirtualClock};
    use vaktpost_telemetry::MetricsRecorder;

    /// Serves `frames_per_session` frames per connection, one interval apart
    /// on the virtual clock; raises `stop` once `sessions` are used up.
    struct Flaky {
        clock: VirtualClock,
        sessions: usize,
        frames_per_session: usize,
        stop: StopSignal,
    }

    struct Session {
        clock: VirtualClock,
        left: usize,
        first: bool,
    }

    impl FrameStream for Session {
        fn next_frame(&mut self) -> Result<Frame, CaptureError> {
            if self.left == 0 {
                return Err(CaptureError::EndOfStream);
            }
            if !self.first {
                self.clock.advance(Duration::from_millis(100));
            }
            self.first = false;
            self.left -= 1;
            Ok(Frame::new(vec![0xFF, 0xD8, 0, 0xFF, 0xD9]))
        }
    }

    impl StreamSource for Flaky {
        fn url(&self) -> &str {
            "flaky://"
        }

        fn connect(&mut self) -> Result<Box<dyn FrameStream>, CaptureError> {
            if self.sessions == 0 {
                self.stop.raise();
                return Err(CaptureError::Exhausted("flaky://".into()));
            }
            self.sessions -= 1;
            self.clock.advance(Duration::from_secs(1));
            Ok(Box::new(Session {
                clock: self.clock.clone(),
                left: self.frames_per_session,
                first: true,
            }))
        }
    }

    #[traced_test]
    #[test]
    fn every_lost_connection_flushes_the_open_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let clock = VirtualClock::new(Utc.with_ymd_and_hms(2025, 5, 4, 2, 8, 20).unwrap());
        let stop = StopSignal::new();
        let pipeline = Arc::new(Pipeline::new(8, 8, Duration::from_millis(10)).unwrap());
        let metrics = MetricsRecorder::new().unwrap();
        let config = SegmenterConfig {
            output_dir: dir.path().to_path_buf(),
            chunk_duration_secs: 5,
            ..SegmenterConfig::default()
        };
        let mut segmenter = Segmenter::new(
            &config,
            Arc::new(clock.clone()),
            Box::new(MjpegWriterFactory),
            pipeline.clone(),
            metrics.clone(),
        )
        .unwrap();
        let source = Flaky {
            clock: clock.clone(),
            sessions: 3,
            frames_per_session: 7,
            stop: stop.clone(),
        };
        let mut reader = StreamReader::new(
            Box::new(source),
            BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(2)),
            metrics.clone(),
        );

        run_ingest_loop(&mut reader, &mut segmenter, &stop).unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = pipeline.chunks.try_pop() {
            chunks.push(chunk);
        }
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.frame_count == 7 && c.is_ready()));
        assert_eq!(metrics.frames.get(), 21);
        assert!(segmenter.open_chunk().is_none());
        assert!(logs_contain("Stream lost"));
        assert!(logs_contain("Ingest loop stopped"));
    }
}
