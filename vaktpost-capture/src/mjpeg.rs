//! MJPEG byte-stream framing.
//!
//! An MJPEG stream is a plain concatenation of JPEG images. Frames are cut
//! from the start-of-image marker (`FF D8`) to the next end-of-image marker
//! (`FF D9`); bytes between frames are skipped.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

use bytes::{Buf, Bytes, BytesMut};

use crate::source::{CaptureError, Frame, FrameStream};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const READ_SIZE: usize = 16 * 1024;

/// Largest frame accepted before the stream is declared corrupt.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

fn find(haystack: &[u8], needle: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|window| window == needle)
}

/// Splits an MJPEG byte stream into frames.
pub struct MjpegFrameReader<R> {
    inner: R,
    buf: BytesMut,
    max_frame: usize,
}

impl<R: Read> MjpegFrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_frame(inner, MAX_FRAME_SIZE)
    }

    pub fn with_max_frame(inner: R, max_frame: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_SIZE),
            max_frame,
        }
    }

    /// Next complete frame, or `None` once the input ends. A trailing partial
    /// frame at end of input is dropped.
    pub fn read_frame(&mut self) -> Result<Option<Bytes>, CaptureError> {
        loop {
            if let Some(frame) = self.take_buffered()? {
                return Ok(Some(frame));
            }

            let mut chunk = [0u8; READ_SIZE];
            let n = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CaptureError::Read(e)),
            };
            if n == 0 {
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn take_buffered(&mut self) -> Result<Option<Bytes>, CaptureError> {
        match find(&self.buf, SOI) {
            Some(start) => {
                self.buf.advance(start);
                if let Some(offset) = find(&self.buf[SOI.len()..], EOI) {
                    let end = SOI.len() + offset + EOI.len();
                    return Ok(Some(self.buf.split_to(end).freeze()));
                }
                if self.buf.len() > self.max_frame {
                    self.buf.clear();
                    return Err(CaptureError::FrameTooLarge(self.max_frame));
                }
            }
            None => {
                // Keep a trailing 0xFF, it may be the first half of a marker.
                let keep = usize::from(self.buf.last() == Some(&0xFF));
                let drop = self.buf.len() - keep;
                self.buf.advance(drop);
            }
        }
        Ok(None)
    }
}

impl<R: Read + Send> FrameStream for MjpegFrameReader<R> {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        match self.read_frame()? {
            Some(data) => Ok(Frame { data }),
            None => Err(CaptureError::EndOfStream),
        }
    }
}

/// Reads every frame of an MJPEG file.
pub fn read_frames(path: &Path) -> Result<Vec<Bytes>, CaptureError> {
    let mut reader = MjpegFrameReader::new(BufReader::new(File::open(path)?));
    let mut frames = Vec::new();
    while let Some(frame) = reader.read_frame()? {
        frames.push(frame);
    }
    Ok(frames)
}

/// Number of complete frames in an MJPEG file.
pub fn count_frames(path: &Path) -> io::Result<u64> {
    let mut reader = MjpegFrameReader::new(BufReader::new(File::open(path)?));
    let mut count = 0;
    loop {
        match reader.read_frame() {
            Ok(Some(_)) => count += 1,
            Ok(None) => return Ok(count),
            Err(CaptureError::Read(e)) => return Err(e),
            Err(e) => return Err(io::Error::new(ErrorKind::InvalidData, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn jpeg(payload: &[u8]) -> Vec<u8> {
        let mut data = SOI.to_vec();
        data.extend_from_slice(payload);
        data.extend_from_slice(&EOI);
        data
    }

    /// Hands out at most `step` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn splits_concatenated_frames() {
        let mut stream = jpeg(b"one");
        stream.extend_from_slice(b"\r\n--boundary\r\n");
        stream.extend(jpeg(b"two"));

        let mut reader = MjpegFrameReader::new(Cursor::new(stream));
        assert_eq!(reader.read_frame().unwrap().unwrap(), Bytes::from(jpeg(b"one")));
        assert_eq!(reader.read_frame().unwrap().unwrap(), Bytes::from(jpeg(b"two")));
        assert_eq!(reader.read_frame().unwrap(), None);
    }

    #[test]
    fn markers_split_across_reads() {
        let mut stream = jpeg(b"abc");
        stream.extend(jpeg(b"defgh"));
        let mut reader = MjpegFrameReader::new(Trickle {
            data: stream,
            pos: 0,
            step: 1,
        });
        assert_eq!(reader.read_frame().unwrap().unwrap(), Bytes::from(jpeg(b"abc")));
        assert_eq!(reader.read_frame().unwrap().unwrap(), Bytes::from(jpeg(b"defgh")));
        assert_eq!(reader.read_frame().unwrap(), None);
    }

    #[test]
    fn truncated_frame_is_dropped_and_eof_is_a_failure() {
        let mut stream = jpeg(b"whole");
        stream.extend_from_slice(&SOI);
        stream.extend_from_slice(b"partial");

        let mut reader = MjpegFrameReader::new(Cursor::new(stream));
        assert!(reader.next_frame().is_ok());
        assert!(matches!(reader.next_frame(), Err(CaptureError::EndOfStream)));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut stream = SOI.to_vec();
        stream.extend(std::iter::repeat(0u8).take(64));
        let mut reader = MjpegFrameReader::with_max_frame(Cursor::new(stream), 32);
        assert!(matches!(
            reader.read_frame(),
            Err(CaptureError::FrameTooLarge(32))
        ));
    }

    #[test]
    fn counts_frames_in_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..3u8 {
            file.write_all(&jpeg(&[i])).unwrap();
        }
        file.flush().unwrap();
        assert_eq!(count_frames(file.path()).unwrap(), 3);
        assert_eq!(read_frames(file.path()).unwrap().len(), 3);
    }
}
