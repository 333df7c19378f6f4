//! vaktpost-capture
//!
//! Everything the ingest thread owns: stream sources, the reconnecting
//! [`StreamReader`], chunk writers and the [`Segmenter`] that turns frames
//! into finalized chunk files.

pub mod backoff;
pub mod file;
pub mod ingest;
pub mod mjpeg;
pub mod reader;
pub mod segmenter;
pub mod source;
pub mod tcp;
pub mod writer;

pub use backoff::BackoffPolicy;
pub use ingest::run_ingest_loop;
pub use reader::{ReaderEvent, StreamReader, StreamSession, StreamState};
pub use segmenter::{SegmentError, Segmenter};
pub use source::{source_for_url, CaptureError, Frame, FrameStream, StreamSource};
pub use writer::{ChunkWriter, ChunkWriterFactory, MjpegFileWriter, MjpegWriterFactory};
