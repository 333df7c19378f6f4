//! Synthetic MJPEG source on a virtual clock.
//!
//! Frame `k` is served when the clock reads `k * interval` past the moment
//! the source was built. After the last frame the clock moves to
//! `total * interval` and the stream ends; the source then refuses every
//! reconnect.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use parking_lot::Mutex;
use tracing::trace;
use vaktpost_capture::{CaptureError, Frame, FrameStream, StreamSource};
use vaktpost_core::VirtualClock;

use crate::chaos::ChaosPlan;

struct State {
    next: u64,
    finished: bool,
    refusals_left: u32,
    chaos: ChaosPlan,
    connects: u32,
}

struct Shared {
    clock: VirtualClock,
    base_ns: u64,
    interval: Duration,
    total: u64,
    pacing: Mutex<Duration>,
    state: Mutex<State>,
}

impl Shared {
    /// Moves the clock forward to the slot of frame `index`. Never moves back.
    fn seek(&self, index: u64) {
        let target = self.base_ns + self.interval.as_nanos() as u64 * index;
        let now = self.clock.now_ns();
        if target > now {
            self.clock.advance(Duration::from_nanos(target - now));
        }
    }
}

#[derive(Clone)]
pub struct SyntheticSource {
    url: String,
    shared: Arc<Shared>,
}

impl SyntheticSource {
    pub fn new(clock: VirtualClock, fps: u32, total_frames: u64) -> Self {
        let interval = Duration::from_secs(1) / fps.max(1);
        let base_ns = clock.now_ns();
        Self {
            url: format!("synthetic://{fps}fps/{total_frames}"),
            shared: Arc::new(Shared {
                clock,
                base_ns,
                interval,
                total: total_frames,
                pacing: Mutex::new(Duration::ZERO),
                state: Mutex::new(State {
                    next: 0,
                    finished: false,
                    refusals_left: 0,
                    chaos: ChaosPlan::none(),
                    connects: 0,
                }),
            }),
        }
    }

    pub fn with_chaos(self, chaos: ChaosPlan) -> Self {
        self.shared.state.lock().chaos = chaos;
        self
    }

    /// Real-time sleep before every frame, so a run can be stopped midway.
    pub fn with_pacing(self, pacing: Duration) -> Self {
        *self.shared.pacing.lock() = pacing;
        self
    }

    pub fn frame_interval(&self) -> Duration {
        self.shared.interval
    }

    /// Frames served so far.
    pub fn frames_served(&self) -> u64 {
        self.shared.state.lock().next
    }

    pub fn is_finished(&self) -> bool {
        self.shared.state.lock().finished
    }

    /// Successful connects so far.
    pub fn connects(&self) -> u32 {
        self.shared.state.lock().connects
    }
}

/// A minimal JPEG-framed payload; the body never contains an end marker.
pub fn synthetic_frame(index: u64) -> Frame {
    let body = format!("frame-{index}");
    let mut data = BytesMut::with_capacity(body.len() + 4);
    data.put_slice(&[0xFF, 0xD8]);
    data.put_slice(body.as_bytes());
    data.put_slice(&[0xFF, 0xD9]);
    Frame::new(data.freeze())
}

impl StreamSource for SyntheticSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn connect(&mut self) -> Result<Box<dyn FrameStream>, CaptureError> {
        let mut state = self.shared.state.lock();
        if state.finished {
            return Err(CaptureError::Exhausted(self.url.clone()));
        }
        if state.refusals_left > 0 {
            state.refusals_left -= 1;
            return Err(CaptureError::Connect {
                url: self.url.clone(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "injected refusal"),
            });
        }
        state.connects += 1;
        Ok(Box::new(SyntheticStream {
            shared: self.shared.clone(),
        }))
    }
}

struct SyntheticStream {
    shared: Arc<Shared>,
}

impl FrameStream for SyntheticStream {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let shared = &self.shared;
        let pacing = *shared.pacing.lock();
        if !pacing.is_zero() {
            std::thread::sleep(pacing);
        }
        let mut state = shared.state.lock();
        let index = state.next;

        if index >= shared.total {
            shared.seek(shared.total);
            state.finished = true;
            return Err(CaptureError::EndOfStream);
        }

        shared.seek(index);
        if state.chaos.disconnect_before.remove(&index) {
            state.refusals_left = state.chaos.refused_connects;
            trace!(index, "Injected disconnect");
            return Err(CaptureError::Read(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "injected disconnect",
            )));
        }

        state.next += 1;
        Ok(synthetic_frame(index))
    }
}
