//! Trait abstraction for the line-oriented command port to enable testing

use async_trait::async_trait;
use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Synchronous request/response line channel to the motion controller
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandPort: Send {
    /// Drop any input received but not yet read
    async fn discard_input(&mut self) -> io::Result<()>;

    /// Write one command line; the newline terminator is appended
    async fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Read one response line, without its terminator
    async fn read_line(&mut self) -> io::Result<String>;
}

/// Streams whose pending OS-level input can be thrown away
pub trait DiscardInput {
    fn discard_input(&self) -> io::Result<()>;
}

impl DiscardInput for tokio_serial::SerialStream {
    fn discard_input(&self) -> io::Result<()> {
        use tokio_serial::SerialPort;
        self.clear(tokio_serial::ClearBuffer::Input)
            .map_err(io::Error::from)
    }
}

/// Newline framing over an async byte stream
pub struct SerialLink<S> {
    stream: S,
    rx: BytesMut,
    device_path: String,
}

impl<S> std::fmt::Debug for SerialLink<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device_path", &self.device_path)
            .field("buffered", &self.rx.len())
            .finish_non_exhaustive()
    }
}

impl<S> SerialLink<S> {
    pub fn new(stream: S, device_path: &str) -> Self {
        Self {
            stream,
            rx: BytesMut::with_capacity(256),
            device_path: device_path.to_string(),
        }
    }

    /// Device path of the underlying port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Splits the first complete line off the receive buffer
    fn take_line(&mut self) -> Option<String> {
        let end = self.rx.iter().position(|&b| b == b'\n')?;
        let line = self.rx.split_to(end + 1);
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

#[async_trait]
impl<S> CommandPort for SerialLink<S>
where
    S: AsyncRead + AsyncWrite + DiscardInput + Unpin + Send,
{
    async fn discard_input(&mut self) -> io::Result<()> {
        self.rx.clear();
        self.stream.discard_input()
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(b'\n');
        self.stream.write_all(&frame).await?;
        self.stream.flush().await
    }

    async fn read_line(&mut self) -> io::Result<String> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }
            if self.stream.read_buf(&mut self.rx).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{} closed while waiting for a response", self.device_path),
                ));
            }
        }
    }
}
