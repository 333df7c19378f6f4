//! Chunk writers.
//!
//! [`ChunkWriter::finish`] consumes the writer: once it returns, every byte is
//! on disk and the file can be renamed to its finalized name.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::source::Frame;

pub trait ChunkWriter: Send {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()>;

    /// Flushes and closes the file.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

pub trait ChunkWriterFactory: Send {
    /// Creates the file at `path`, truncating a stale provisional leftover.
    fn open(&self, path: &Path) -> io::Result<Box<dyn ChunkWriter>>;
}

/// Writes frames back to back, producing a playable MJPEG file.
pub struct MjpegFileWriter {
    file: BufWriter<File>,
}

impl MjpegFileWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        Ok(Self {
            file: BufWriter::new(file),
        })
    }
}

impl ChunkWriter for MjpegFileWriter {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.file.write_all(&frame.data)
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        let file = self.file.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MjpegWriterFactory;

impl ChunkWriterFactory for MjpegWriterFactory {
    fn open(&self, path: &Path) -> io::Result<Box<dyn ChunkWriter>> {
        Ok(Box::new(MjpegFileWriter::create(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_on_disk_after_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk.mjpeg");

        let mut writer = MjpegWriterFactory.open(&path).unwrap();
        writer.write_frame(&Frame::new(vec![0xFF, 0xD8, 1, 0xFF, 0xD9])).unwrap();
        writer.write_frame(&Frame::new(vec![0xFF, 0xD8, 2, 0xFF, 0xD9])).unwrap();
        writer.finish().unwrap();

        assert_eq!(crate::mjpeg::count_frames(&path).unwrap(), 2);
    }

    #[test]
    fn stale_leftover_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk.mjpeg");
        std::fs::write(&path, b"stale bytes").unwrap();
        MjpegWriterFactory.open(&path).unwrap().finish().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn missing_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone").join("chunk.mjpeg");
        assert!(MjpegWriterFactory.open(&path).is_err());
    }
}
