//! Replay of a recorded MJPEG file (`file:///path`).
//!
//! The file is read once, as fast as the pipeline consumes it. Once a pass
//! has been handed out, further connects report [`CaptureError::Exhausted`]
//! so the reader backs off until the supervisor stops it.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::mjpeg::MjpegFrameReader;
use crate::source::{CaptureError, FrameStream, StreamSource};

#[derive(Debug, Clone)]
pub struct FileSource {
    url: String,
    path: PathBuf,
    opened: bool,
}

impl FileSource {
    pub fn new(url: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.to_string(),
            path: path.into(),
            opened: false,
        }
    }
}

impl StreamSource for FileSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn connect(&mut self) -> Result<Box<dyn FrameStream>, CaptureError> {
        if self.opened {
            return Err(CaptureError::Exhausted(self.url.clone()));
        }
        let file = File::open(&self.path).map_err(|source| CaptureError::Connect {
            url: self.url.clone(),
            source,
        })?;
        self.opened = true;
        Ok(Box::new(MjpegFrameReader::new(BufReader::new(file))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_is_replayed_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xFF, 0xD8, 9, 0xFF, 0xD9]).unwrap();
        file.flush().unwrap();

        let mut source = FileSource::new("file://recording", file.path());
        let mut stream = source.connect().unwrap();
        assert!(stream.next_frame().is_ok());
        assert!(matches!(stream.next_frame(), Err(CaptureError::EndOfStream)));
        assert!(matches!(source.connect(), Err(CaptureError::Exhausted(_))));
    }

    #[test]
    fn missing_file_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.mjpeg");
        let mut source = FileSource::new("file://late", &path);
        assert!(matches!(source.connect(), Err(CaptureError::Connect { .. })));

        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        assert!(source.connect().is_ok());
    }
}
