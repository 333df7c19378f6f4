//! Connection state machine around a [`StreamSource`].
//!
//! ```text
//! Disconnected --start--> Connecting --connected--> Streaming
//!                             ^  |                      |
//!                             |  +--connect failed--+   |
//!                             |                     |   |
//!                             +---------------------+---+-- read failed
//! ```
//!
//! The reader sleeps out the backoff before every attempt that follows a
//! failure. The sleep waits on the stop signal, so a stop interrupts it.

use std::time::Duration;

use tracing::{debug, info, warn};
use vaktpost_core::StopSignal;
use vaktpost_telemetry::{EventLogger, KeyValue, MetricsRecorder};

use crate::backoff::BackoffPolicy;
use crate::source::{Frame, FrameStream, StreamSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Streaming,
}

/// What just happened to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Connected,
    ConnectFailed,
    FrameRead,
    ReadFailed,
}

/// Pure transition function of the reader FSM.
pub fn next_state(state: StreamState, transition: Transition) -> StreamState {
    match (state, transition) {
        (StreamState::Disconnected, Transition::Start) => StreamState::Connecting,
        (StreamState::Connecting, Transition::Connected) => StreamState::Streaming,
        (StreamState::Connecting, Transition::ConnectFailed) => StreamState::Connecting,
        (StreamState::Streaming, Transition::FrameRead) => StreamState::Streaming,
        (StreamState::Streaming, Transition::ReadFailed) => StreamState::Connecting,
        (state, _) => state,
    }
}

/// Connection bookkeeping, owned by the ingest thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSession {
    pub url: String,
    pub state: StreamState,
    pub consecutive_failures: u32,
    /// Delay applied before the next attempt once a failure occurred.
    pub backoff: Duration,
}

/// Output of one [`StreamReader::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    Frame(Frame),
    /// The open connection failed; the caller must flush its open chunk.
    Lost,
}

pub struct StreamReader {
    source: Box<dyn StreamSource>,
    handle: Option<Box<dyn FrameStream>>,
    session: StreamSession,
    policy: BackoffPolicy,
    metrics: MetricsRecorder,
}

impl StreamReader {
    pub fn new(source: Box<dyn StreamSource>, policy: BackoffPolicy, metrics: MetricsRecorder) -> Self {
        let session = StreamSession {
            url: source.url().to_string(),
            state: StreamState::Disconnected,
            consecutive_failures: 0,
            backoff: policy.floor(),
        };
        Self {
            source,
            handle: None,
            session,
            policy,
            metrics,
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn url(&self) -> &str {
        &self.session.url
    }

    /// Blocks until a frame is read, the connection is lost, or `stop` is
    /// raised (`None`).
    pub fn poll(&mut self, stop: &StopSignal) -> Option<ReaderEvent> {
        loop {
            if stop.is_raised() {
                return None;
            }
            match self.session.state {
                StreamState::Disconnected => self.apply(Transition::Start),
                StreamState::Connecting => {
                    if self.session.consecutive_failures > 0 {
                        self.metrics.stream_reconnects.inc();
                        debug!(
                            delay_ms = self.session.backoff.as_millis() as u64,
                            failures = self.session.consecutive_failures,
                            "Backing off before reconnect"
                        );
                        if stop.wait_timeout(self.session.backoff) {
                            return None;
                        }
                    }
                    match self.source.connect() {
                        Ok(handle) => {
                            self.handle = Some(handle);
                            self.apply(Transition::Connected);
                            info!(url = %self.session.url, "Stream connected");
                            EventLogger::log_event(
                                "stream_connected",
                                vec![KeyValue::new("url", self.session.url.clone())],
                            );
                        }
                        Err(e) => {
                            self.record_failure();
                            self.apply(Transition::ConnectFailed);
                            warn!(
                                url = %self.session.url,
                                failures = self.session.consecutive_failures,
                                error = %e,
                                "Stream connect failed"
                            );
                        }
                    }
                }
                StreamState::Streaming => {
                    let Some(handle) = self.handle.as_mut() else {
                        self.apply(Transition::ReadFailed);
                        continue;
                    };
                    match handle.next_frame() {
                        Ok(frame) => {
                            if self.session.consecutive_failures > 0 {
                                self.reset_backoff();
                            }
                            self.apply(Transition::FrameRead);
                            return Some(ReaderEvent::Frame(frame));
                        }
                        Err(e) => {
                            self.release();
                            self.record_failure();
                            self.apply(Transition::ReadFailed);
                            warn!(url = %self.session.url, error = %e, "Stream lost");
                            EventLogger::log_event(
                                "stream_lost",
                                vec![
                                    KeyValue::new("url", self.session.url.clone()),
                                    KeyValue::new("error", e.to_string()),
                                ],
                            );
                            return Some(ReaderEvent::Lost);
                        }
                    }
                }
            }
        }
    }

    /// Drops the connection handle, if any, and returns to `Disconnected`.
    pub fn disconnect(&mut self) {
        self.release();
        self.session.state = StreamState::Disconnected;
    }

    fn release(&mut self) {
        if self.handle.take().is_some() {
            debug!(url = %self.session.url, "Stream handle released");
        }
    }

    fn apply(&mut self, transition: Transition) {
        self.session.state = next_state(self.session.state, transition);
    }

    fn record_failure(&mut self) {
        self.session.consecutive_failures = self.session.consecutive_failures.saturating_add(1);
        self.session.backoff = self.policy.delay_for(self.session.consecutive_failures);
    }

    fn reset_backoff(&mut self) {
        debug!(
            failures = self.session.consecutive_failures,
            "First frame after reconnect, backoff reset"
        );
        self.session.consecutive_failures = 0;
        self.session.backoff = self.policy.floor();
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CaptureError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted connection: yields its frames, then fails.
    struct ScriptedStream {
        frames: VecDeque<Frame>,
    }

    impl FrameStream for ScriptedStream {
        fn next_frame(&mut self) -> Result<Frame, CaptureError> {
            self.frames.pop_front().ok_or(CaptureError::EndOfStream)
        }
    }

    /// Each entry is one connect outcome: `Some(n)` connects and yields `n` frames.
    struct ScriptedSource {
        script: VecDeque<Option<usize>>,
        attempts: Arc<Mutex<u32>>,
    }

    impl StreamSource for ScriptedSource {
        fn url(&self) -> &str {
            "scripted://"
        }

        fn connect(&mut self) -> Result<Box<dyn FrameStream>, CaptureError> {
            *self.attempts.lock().unwrap() += 1;
            match self.script.pop_front().flatten() {
                Some(n) => Ok(Box::new(ScriptedStream {
                    frames: (0..n).map(|i| Frame::new(vec![i as u8])).collect(),
                })),
                None => Err(CaptureError::Exhausted("scripted://".into())),
            }
        }
    }

    fn reader(script: Vec<Option<usize>>) -> (StreamReader, Arc<Mutex<u32>>) {
        let attempts = Arc::new(Mutex::new(0));
        let source = ScriptedSource {
            script: script.into(),
            attempts: attempts.clone(),
        };
        let policy = BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(4));
        (
            StreamReader::new(Box::new(source), policy, MetricsRecorder::new().unwrap()),
            attempts,
        )
    }

    #[test]
    fn transition_table() {
        use StreamState::*;
        assert_eq!(next_state(Disconnected, Transition::Start), Connecting);
        assert_eq!(next_state(Connecting, Transition::ConnectFailed), Connecting);
        assert_eq!(next_state(Connecting, Transition::Connected), Streaming);
        assert_eq!(next_state(Streaming, Transition::ReadFailed), Connecting);
        assert_eq!(next_state(Streaming, Transition::FrameRead), Streaming);
        assert_eq!(next_state(Disconnected, Transition::FrameRead), Disconnected);
    }

    #[test]
    fn read_failure_reports_loss_and_reconnects() {
        let (mut reader, attempts) = reader(vec![Some(2), Some(1)]);
        let stop = StopSignal::new();

        assert!(matches!(reader.poll(&stop), Some(ReaderEvent::Frame(_))));
        assert!(matches!(reader.poll(&stop), Some(ReaderEvent::Frame(_))));
        assert_eq!(reader.poll(&stop), Some(ReaderEvent::Lost));
        assert_eq!(reader.session().state, StreamState::Connecting);
        assert_eq!(reader.session().consecutive_failures, 1);

        assert!(matches!(reader.poll(&stop), Some(ReaderEvent::Frame(_))));
        assert_eq!(*attempts.lock().unwrap(), 2);
    }

    #[test]
    fn first_read_after_failures_resets_backoff() {
        let (mut reader, _) = reader(vec![None, None, None, Some(1)]);
        let stop = StopSignal::new();

        assert!(matches!(reader.poll(&stop), Some(ReaderEvent::Frame(_))));
        assert_eq!(reader.session().consecutive_failures, 0);
        assert_eq!(reader.session().backoff, Duration::from_millis(1));
        assert_eq!(reader.session().state, StreamState::Streaming);
    }

    #[test]
    fn backoff_grows_with_consecutive_failures() {
        let (mut reader, _) = reader(vec![]);
        reader.record_failure();
        assert_eq!(reader.session().backoff, Duration::from_millis(1));
        reader.record_failure();
        assert_eq!(reader.session().backoff, Duration::from_millis(2));
        reader.record_failure();
        reader.record_failure();
        assert_eq!(reader.session().backoff, Duration::from_millis(4));
    }

    #[test]
    fn stop_interrupts_backoff() {
        let attempts = Arc::new(Mutex::new(0));
        let source = ScriptedSource {
            script: VecDeque::new(),
            attempts: attempts.clone(),
        };
        let policy = BackoffPolicy::new(Duration::from_secs(30), Duration::from_secs(60));
        let mut reader = StreamReader::new(Box::new(source), policy, MetricsRecorder::new().unwrap());
        let stop = StopSignal::new();

        let raiser = stop.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            raiser.raise();
        });
        let started = std::time::Instant::now();
        assert_eq!(reader.poll(&stop), None);
        assert!(started.elapsed() < Duration::from_secs(10));
        handle.join().unwrap();
        assert_eq!(*attempts.lock().unwrap(), 1);
    }
}
