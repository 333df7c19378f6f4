//! Source and frame abstractions shared by the real and simulated inputs.

use std::io;

use bytes::Bytes;
use thiserror::Error;
use vaktpost_config::StreamConfig;

use crate::file::FileSource;
use crate::tcp::TcpSource;

/// One encoded video frame (a complete JPEG image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Bytes,
}

impl Frame {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("stream read failed: {0}")]
    Read(#[from] io::Error),

    #[error("end of stream")]
    EndOfStream,

    #[error("frame exceeds {0} bytes without an end marker")]
    FrameTooLarge(usize),

    #[error("source {0} has no more data")]
    Exhausted(String),

    #[error("unsupported stream url: {0}")]
    UnsupportedUrl(String),
}

/// An open connection yielding frames until it fails.
///
/// Any error is a read failure; the handle is dropped afterwards.
pub trait FrameStream: Send {
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// Something the reader can (re)connect to.
pub trait StreamSource: Send {
    fn url(&self) -> &str;

    fn connect(&mut self) -> Result<Box<dyn FrameStream>, CaptureError>;
}

/// Builds the source matching the configured URL scheme.
pub fn source_for_url(config: &StreamConfig) -> Result<Box<dyn StreamSource>, CaptureError> {
    let url = config.url.as_str();
    if let Some(target) = url.strip_prefix("tcp://") {
        Ok(Box::new(TcpSource::new(
            url,
            target,
            config.connect_timeout(),
            config.read_timeout(),
        )))
    } else if let Some(path) = url.strip_prefix("file://") {
        Ok(Box::new(FileSource::new(url, path)))
    } else {
        Err(CaptureError::UnsupportedUrl(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> StreamConfig {
        StreamConfig {
            url: url.into(),
            ..StreamConfig::default()
        }
    }

    #[test]
    fn picks_source_by_scheme() {
        assert_eq!(
            source_for_url(&config("tcp://127.0.0.1:9000")).unwrap().url(),
            "tcp://127.0.0.1:9000"
        );
        assert_eq!(
            source_for_url(&config("file:///tmp/yard.mjpeg")).unwrap().url(),
            "file:///tmp/yard.mjpeg"
        );
        assert!(matches!(
            source_for_url(&config("rtsp://camera/stream")),
            Err(CaptureError::UnsupportedUrl(_))
        ));
    }
}
