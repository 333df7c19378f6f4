//! Frame sampling: one frame per second of chunk.
//!
//! The chunk's frame rate is derived from its finalized name (frames over
//! labelled duration). Chunks shorter than a second, or with an unparseable
//! name, are assumed to run at 30 fps.

use std::path::Path;

use bytes::Bytes;
use rand::Rng;
use tracing::{debug, warn};
use vaktpost_capture::mjpeg;
use vaktpost_capture::CaptureError;
use vaktpost_config::FrameSampling;
use vaktpost_core::ChunkName;

use crate::detector::DetectionError;

pub const FALLBACK_FPS: f64 = 30.0;

/// Indices of the frames to sample, one per (possibly partial) second.
pub fn frame_indices<R: Rng + ?Sized>(
    total_frames: usize,
    fps: f64,
    sampling: FrameSampling,
    rng: &mut R,
) -> Vec<usize> {
    if total_frames == 0 || fps.is_nan() || fps <= 0.0 {
        return Vec::new();
    }
    let last = total_frames - 1;
    let seconds = (total_frames as f64 / fps).ceil() as usize;

    (0..seconds)
        .map(|second| {
            let end = (((second + 1) as f64 * fps) as usize)
                .saturating_sub(1)
                .min(last);
            let start = ((second as f64 * fps) as usize).min(end);
            match sampling {
                FrameSampling::First => start,
                FrameSampling::Last => end,
                FrameSampling::Random => rng.random_range(start..=end),
            }
        })
        .collect()
}

/// Frame rate implied by a finalized chunk name.
pub fn chunk_fps(path: &Path, total_frames: usize) -> f64 {
    let seconds = ChunkName::from_path(path)
        .and_then(|name| name.ended_at().map(|end| end - name.started_at()))
        .map(|span| span.num_seconds())
        .unwrap_or(0);
    if seconds >= 1 && total_frames > 0 {
        total_frames as f64 / seconds as f64
    } else {
        FALLBACK_FPS
    }
}

/// Reads the chunk and returns the sampled JPEG frames.
pub fn sample_frames(path: &Path, sampling: FrameSampling) -> Result<Vec<Bytes>, DetectionError> {
    let frames = mjpeg::read_frames(path).map_err(|e| match e {
        CaptureError::Read(io) => DetectionError::Io(io),
        other => DetectionError::Malformed(other.to_string()),
    })?;
    if frames.is_empty() {
        warn!(path = %path.display(), "Chunk holds no decodable frames");
        return Ok(Vec::new());
    }

    let fps = chunk_fps(path, frames.len());
    let indices = frame_indices(frames.len(), fps, sampling, &mut rand::rng());
    debug!(
        path = %path.display(),
        total = frames.len(),
        sampled = indices.len(),
        fps,
        "Frames sampled"
    );
    Ok(indices.into_iter().map(|i| frames[i].clone()).collect())
}
