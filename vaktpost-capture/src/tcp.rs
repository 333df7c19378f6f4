//! MJPEG over a raw TCP connection (`tcp://host:port`).

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::mjpeg::MjpegFrameReader;
use crate::source::{CaptureError, FrameStream, StreamSource};

#[derive(Debug, Clone)]
pub struct TcpSource {
    url: String,
    target: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpSource {
    pub fn new(url: &str, target: &str, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            target: target.to_string(),
            connect_timeout,
            read_timeout,
        }
    }

    fn open(&self) -> io::Result<TcpStream> {
        let mut last_error = None;
        for addr in self.target.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    // A read that blocks past the timeout surfaces as an error,
                    // which the reader treats as a lost stream.
                    stream.set_read_timeout(Some(self.read_timeout))?;
                    stream.set_nodelay(true)?;
                    debug!(%addr, "TCP stream connected");
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no address resolved")
        }))
    }
}

impl StreamSource for TcpSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn connect(&mut self) -> Result<Box<dyn FrameStream>, CaptureError> {
        let stream = self.open().map_err(|source| CaptureError::Connect {
            url: self.url.clone(),
            source,
        })?;
        Ok(Box::new(MjpegFrameReader::new(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn reads_frames_then_reports_loss_on_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket.write_all(&[0xFF, 0xD8, 1, 2, 3, 0xFF, 0xD9]).unwrap();
        });

        let url = format!("tcp://127.0.0.1:{port}");
        let mut source = TcpSource::new(
            &url,
            &url["tcp://".len()..],
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let mut stream = source.connect().unwrap();
        assert_eq!(stream.next_frame().unwrap().len(), 7);
        server.join().unwrap();
        assert!(stream.next_frame().is_err());
    }

    #[test]
    fn refused_connection_is_a_connect_error() {
        // Bind then drop to find a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut source = TcpSource::new(
            "tcp://closed",
            &format!("127.0.0.1:{port}"),
            Duration::from_millis(200),
            Duration::from_millis(200),
        );
        assert!(matches!(
            source.connect(),
            Err(CaptureError::Connect { .. })
        ));
    }
}
