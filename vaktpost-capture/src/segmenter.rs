//! Frame buffering into fixed-duration chunk files.
//!
//! Boundaries are measured on the clock's monotonic reading; the wall clock
//! only labels files. Finalization order is fixed:
//!
//! 1. close the writer (flush + fsync)
//! 2. take the end label
//! 3. rename `{start}_ongoing.ext` to `{start}_{end}.ext`
//! 4. publish to the chunk queue
//!
//! A failure before step 3 leaves at most a provisional orphan behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use vaktpost_config::SegmenterConfig;
use vaktpost_core::{Chunk, ChunkStatus, Clock, Pipeline};
use vaktpost_telemetry::{EventLogger, KeyValue, MetricsRecorder};

use crate::source::Frame;
use crate::writer::{ChunkWriter, ChunkWriterFactory};

/// Finalized-name collisions are resolved by moving the end label forward,
/// at most this many seconds.
const MAX_LABEL_BUMPS: i64 = 60;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("chunk duration must be positive, got {0}s")]
    InvalidDuration(i64),

    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open chunk writer at {path}: {source}")]
    WriterOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("frame write to {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SegmentError {
    /// Whether the ingest loop must give up. A failed frame write only costs
    /// the open chunk.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SegmentError::Write { .. })
    }
}

struct OpenChunk {
    chunk: Chunk,
    opened_at: Duration,
    writer: Box<dyn ChunkWriter>,
}

pub struct Segmenter {
    output_dir: PathBuf,
    extension: String,
    chunk_duration: Duration,
    clock: Arc<dyn Clock>,
    writers: Box<dyn ChunkWriterFactory>,
    pipeline: Arc<Pipeline>,
    metrics: MetricsRecorder,
    open: Option<OpenChunk>,
}

impl Segmenter {
    /// Creates the output directory if needed.
    pub fn new(
        config: &SegmenterConfig,
        clock: Arc<dyn Clock>,
        writers: Box<dyn ChunkWriterFactory>,
        pipeline: Arc<Pipeline>,
        metrics: MetricsRecorder,
    ) -> Result<Self, SegmentError> {
        let chunk_duration = config
            .chunk_duration()
            .ok_or(SegmentError::InvalidDuration(config.chunk_duration_secs))?;
        fs::create_dir_all(&config.output_dir).map_err(|source| SegmentError::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;
        Ok(Self {
            output_dir: config.output_dir.clone(),
            extension: config.extension.clone(),
            chunk_duration,
            clock,
            writers,
            pipeline,
            metrics,
            open: None,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The chunk currently receiving frames.
    pub fn open_chunk(&self) -> Option<&Chunk> {
        self.open.as_ref().map(|open| &open.chunk)
    }

    /// Appends a frame, rotating first if the open chunk has reached the
    /// configured duration.
    pub fn push_frame(&mut self, frame: &Frame) -> Result<(), SegmentError> {
        let now = self.clock.monotonic();
        let boundary = match &self.open {
            Some(open) => now.saturating_sub(open.opened_at) >= self.chunk_duration,
            None => true,
        };
        if boundary {
            self.flush();
            self.open = Some(self.start_chunk(now)?);
        }

        let Some(open) = self.open.as_mut() else {
            return Ok(());
        };
        if let Err(source) = open.writer.write_frame(frame) {
            let path = open.chunk.path.clone();
            error!(path = %path.display(), error = %source, "Frame write failed, dropping chunk");
            if let Some(open) = self.open.take() {
                self.discard(open.chunk, "write failed");
            }
            return Err(SegmentError::Write { path, source });
        }
        open.chunk.frame_count += 1;
        self.metrics.frames.inc();
        Ok(())
    }

    /// Finalizes the open chunk, or discards it if it holds no frame.
    /// No-op without an open chunk.
    pub fn flush(&mut self) {
        let Some(OpenChunk {
            mut chunk, writer, ..
        }) = self.open.take()
        else {
            return;
        };

        if chunk.frame_count == 0 {
            drop(writer);
            self.discard(chunk, "no frames");
            return;
        }

        chunk.status = ChunkStatus::Finalizing;
        if let Err(e) = writer.finish() {
            error!(path = %chunk.path.display(), error = %e, "Closing chunk writer failed");
            chunk.status = ChunkStatus::Discarded;
            self.metrics.chunks_discarded.inc();
            return;
        }

        let (ended_at, target) = self.free_final_path(&chunk, self.clock.now_utc());
        if let Err(e) = fs::rename(&chunk.path, &target) {
            error!(
                from = %chunk.path.display(),
                to = %target.display(),
                error = %e,
                "Chunk rename failed, provisional file left in place"
            );
            chunk.status = ChunkStatus::Discarded;
            self.metrics.chunks_discarded.inc();
            return;
        }

        chunk.ended_at = Some(ended_at);
        chunk.path = target;
        chunk.status = ChunkStatus::Ready;
        self.metrics.chunks_finalized.inc();
        info!(
            path = %chunk.path.display(),
            frames = chunk.frame_count,
            "Chunk finalized"
        );
        EventLogger::log_event(
            "chunk_finalized",
            vec![
                KeyValue::new("path", chunk.path.display().to_string()),
                KeyValue::new("frames", chunk.frame_count as i64),
            ],
        );

        let wait = self.pipeline.poll_interval();
        if let Err(rejected) = self
            .pipeline
            .chunks
            .push_blocking(chunk, &self.pipeline.stop, wait)
        {
            let reason = rejected.reason;
            let chunk = rejected.into_inner();
            warn!(
                path = %chunk.path.display(),
                %reason,
                "Chunk not queued, left on disk for the next start"
            );
        }
    }

    fn start_chunk(&self, now: Duration) -> Result<OpenChunk, SegmentError> {
        let chunk = Chunk::open(&self.output_dir, &self.extension, self.clock.now_utc());
        let writer = self
            .writers
            .open(&chunk.path)
            .map_err(|source| SegmentError::WriterOpen {
                path: chunk.path.clone(),
                source,
            })?;
        debug!(path = %chunk.path.display(), "Chunk opened");
        Ok(OpenChunk {
            chunk,
            opened_at: now,
            writer,
        })
    }

    fn discard(&self, mut chunk: Chunk, reason: &str) {
        if let Err(e) = fs::remove_file(&chunk.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %chunk.path.display(), error = %e, "Removing discarded chunk failed");
            }
        }
        chunk.status = ChunkStatus::Discarded;
        self.metrics.chunks_discarded.inc();
        info!(path = %chunk.path.display(), reason, "Chunk discarded");
        EventLogger::log_event(
            "chunk_discarded",
            vec![
                KeyValue::new("path", chunk.path.display().to_string()),
                KeyValue::new("reason", reason.to_string()),
            ],
        );
    }

    /// Two short chunks inside the same second would share a finalized name.
    fn free_final_path(&self, chunk: &Chunk, ended_at: DateTime<Utc>) -> (DateTime<Utc>, PathBuf) {
        let mut label = ended_at;
        for _ in 0..MAX_LABEL_BUMPS {
            let target = chunk.finalized_path(label);
            if !target.exists() {
                return (label, target);
            }
            label += chrono::Duration::seconds(1);
        }
        (label, chunk.finalized_path(label))
    }
}

impl Drop for Segmenter {
    fn drop(&mut self) {
        self.flush();
    }
}
