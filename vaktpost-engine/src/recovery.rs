//! Startup recovery of chunks left behind by a previous run.
//!
//! Finalized chunks that never reached detection are re-queued oldest first,
//! as long as the chunk queue has room; the rest stay on disk for the next
//! start. Provisional orphans are reported and left alone.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use vaktpost_capture::mjpeg::count_frames;
use vaktpost_core::{BoundedQueue, Chunk, ChunkName, ChunkStatus};

use crate::error::EngineError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub enqueued: usize,
    /// Finalized chunks left on disk because the queue was full.
    pub deferred: usize,
    /// Finalized chunks without a single frame, deleted.
    pub discarded: usize,
    pub orphans: Vec<PathBuf>,
}

pub fn recover_chunks(
    dir: &Path,
    extension: &str,
    queue: &BoundedQueue<Chunk>,
) -> Result<RecoveryReport, EngineError> {
    let entries = fs::read_dir(dir).map_err(|source| EngineError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut report = RecoveryReport::default();
    let mut finalized = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        match ChunkName::from_path(&path) {
            Some(name @ ChunkName::Finalized { .. }) => finalized.push((name, path)),
            Some(ChunkName::Provisional { .. }) => {
                warn!(path = %path.display(), "Provisional chunk from an interrupted run left in place");
                report.orphans.push(path);
            }
            None => {}
        }
    }
    finalized.sort_by_key(|(name, _)| (name.started_at(), name.ended_at()));

    let mut pending = finalized.into_iter();
    for (name, path) in pending.by_ref() {
        let frame_count = match count_frames(&path) {
            Ok(count) => count,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable leftover chunk skipped");
                continue;
            }
        };
        if frame_count == 0 {
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "Removing empty leftover chunk failed");
            }
            report.discarded += 1;
            continue;
        }

        let chunk = Chunk {
            started_at: name.started_at(),
            ended_at: name.ended_at(),
            path,
            frame_count,
            status: ChunkStatus::Ready,
        };
        if queue.try_push(chunk).is_err() {
            report.deferred += 1;
            break;
        }
        report.enqueued += 1;
    }
    report.deferred += pending.count();

    if report.enqueued + report.deferred + report.discarded + report.orphans.len() > 0 {
        info!(
            enqueued = report.enqueued,
            deferred = report.deferred,
            discarded = report.discarded,
            orphans = report.orphans.len(),
            "Recovered leftover chunks"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: [u8; 5] = [0xFF, 0xD8, 7, 0xFF, 0xD9];

    fn write(dir: &Path, name: &str, frames: usize) {
        fs::write(dir.join(name), FRAME.repeat(frames)).unwrap();
    }

    #[test]
    fn requeues_oldest_first_up_to_capacity() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "20250504020830_20250504020835.mjpeg", 3);
        write(dir.path(), "20250504020820_20250504020825.mjpeg", 2);
        write(dir.path(), "20250504020825_20250504020830.mjpeg", 1);
        write(dir.path(), "20250504020835_ongoing.mjpeg", 4);
        write(dir.path(), "20250504020840_20250504020845.mjpeg", 0);
        fs::write(dir.path().join("notes.txt"), b"unrelated").unwrap();

        let queue = BoundedQueue::with_capacity(2).unwrap();
        let report = recover_chunks(dir.path(), "mjpeg", &queue).unwrap();

        assert_eq!(report.enqueued, 2);
        assert_eq!(report.deferred, 2);
        assert_eq!(report.discarded, 0);
        assert_eq!(report.orphans.len(), 1);

        let first = queue.try_pop().unwrap();
        let second = queue.try_pop().unwrap();
        assert!(first.path.ends_with("20250504020820_20250504020825.mjpeg"));
        assert_eq!(first.frame_count, 2);
        assert!(second.path.ends_with("20250504020825_20250504020830.mjpeg"));
        assert!(second.is_ready());
        assert!(dir.path().join("20250504020835_ongoing.mjpeg").exists());
    }

    #[test]
    fn empty_leftovers_are_deleted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "20250504020840_20250504020845.mjpeg", 0);

        let queue = BoundedQueue::with_capacity(4).unwrap();
        let report = recover_chunks(dir.path(), "mjpeg", &queue).unwrap();

        assert_eq!(report.discarded, 1);
        assert!(queue.is_empty());
        assert!(!dir.path().join("20250504020840_20250504020845.mjpeg").exists());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let queue = BoundedQueue::<Chunk>::with_capacity(1).unwrap();
        let err = recover_chunks(Path::new("/nonexistent/chunks"), "mjpeg", &queue).unwrap_err();
        assert!(matches!(err, EngineError::Scan { .. }));
    }
}
