// src/link/transport.rs
//! Opening links and reading them line by line

use crate::error::{GpsError, Result};
use std::{io, time::Duration};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio_serial::SerialPortBuilderExt;

/// Something that can open a byte stream to a device at a given rate.
///
/// Dropping the returned link closes it.
pub trait Transport: Send + Sync {
    type Link: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn open(&self, device: &str, baud: u32) -> Result<Self::Link>;
}

/// Serial ports through `tokio-serial`
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialTransport;

impl Transport for SerialTransport {
    type Link = tokio_serial::SerialStream;

    fn open(&self, device: &str, baud: u32) -> Result<Self::Link> {
        tokio_serial::new(device, baud)
            .timeout(Duration::from_millis(1000))
            .open_native_async()
            .map_err(|e| GpsError::transport_open(device, baud, e))
    }
}

/// List serial ports known to the OS
pub fn available_ports() -> Result<Vec<tokio_serial::SerialPortInfo>> {
    Ok(tokio_serial::available_ports()?)
}

/// Longest line kept, terminator included. NMEA allows 82 bytes.
pub const MAX_LINE_LEN: usize = 256;

/// One newline-delimited line from a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Bytes as received, without the `\r\n` terminator
    Complete(Vec<u8>),
    /// Longer than [`MAX_LINE_LEN`]; carries the length, the bytes were dropped
    Overlong(usize),
}

/// Newline-delimited reader over a link.
///
/// Lines are returned as raw bytes; nothing is decoded here. At most
/// [`MAX_LINE_LEN`] bytes are buffered, so a link that never sends a
/// newline cannot grow the buffer.
#[derive(Debug)]
pub struct LineReader<L> {
    inner: BufReader<L>,
    buf: Vec<u8>,
    /// Bytes of the current line seen so far, kept or not
    seen: usize,
}

impl<L: AsyncRead + Unpin> LineReader<L> {
    pub fn new(link: L) -> Self {
        Self {
            inner: BufReader::new(link),
            buf: Vec::with_capacity(128),
            seen: 0,
        }
    }

    /// Next line, or `None` at end of stream.
    ///
    /// Cancel safe: a partial line read before the future was dropped is
    /// kept and completed by the next call.
    pub async fn next_line(&mut self) -> io::Result<Option<Line>> {
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if self.seen == 0 {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            let (used, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };

            if self.seen + used <= MAX_LINE_LEN {
                self.buf.extend_from_slice(&available[..used]);
            } else {
                self.buf.clear();
            }
            self.seen += used;
            self.inner.consume(used);

            if done {
                return Ok(Some(self.take_line()));
            }
        }
    }

    fn take_line(&mut self) -> Line {
        let line = if self.seen > MAX_LINE_LEN {
            Line::Overlong(self.seen)
        } else {
            let mut bytes = std::mem::take(&mut self.buf);
            while matches!(bytes.last(), Some(b'\r' | b'\n')) {
                bytes.pop();
            }
            Line::Complete(bytes)
        };
        self.buf.clear();
        self.seen = 0;
        line
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn complete(bytes: &[u8]) -> Option<Line> {
        Some(Line::Complete(bytes.to_vec()))
    }

    #[tokio::test]
    async fn test_lines_are_split_and_trimmed() {
        let (link, mut peer) = tokio::io::duplex(1024);
        peer.write_all(b"$GPTXT,1*00\r\n\r\npartial").await.unwrap();
        drop(peer);

        let mut lines = LineReader::new(link);
        assert_eq!(lines.next_line().await.unwrap(), complete(b"$GPTXT,1*00"));
        assert_eq!(lines.next_line().await.unwrap(), complete(b""));
        assert_eq!(lines.next_line().await.unwrap(), complete(b"partial"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_utf8_bytes_are_kept() {
        let (link, mut peer) = tokio::io::duplex(1024);
        peer.write_all(b"$GP\xff\xfeA*00\n").await.unwrap();

        let mut lines = LineReader::new(link);
        assert_eq!(lines.next_line().await.unwrap(), complete(b"$GP\xff\xfeA*00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_line_survives_cancellation() {
        let (link, mut peer) = tokio::io::duplex(1024);
        let mut lines = LineReader::new(link);

        peer.write_all(b"$GPGGA,12").await.unwrap();
        let first = tokio::time::timeout(Duration::from_millis(100), lines.next_line()).await;
        assert!(first.is_err());

        peer.write_all(b"3519*00\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap(), complete(b"$GPGGA,123519*00"));
    }

    #[tokio::test]
    async fn test_overlong_line_is_dropped() {
        let (link, mut peer) = tokio::io::duplex(64 * 1024);
        let mut input = vec![b'x'; 1000];
        input.extend_from_slice(b"\r\n$GPTXT,1*00\r\n");
        peer.write_all(&input).await.unwrap();
        drop(peer);

        let mut lines = LineReader::new(link);
        assert_eq!(lines.next_line().await.unwrap(), Some(Line::Overlong(1002)));
        assert_eq!(lines.next_line().await.unwrap(), complete(b"$GPTXT,1*00"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_at_limit_is_kept() {
        let (link, mut peer) = tokio::io::duplex(1024);
        let mut input = vec![b'x'; MAX_LINE_LEN - 1];
        input.push(b'\n');
        peer.write_all(&input).await.unwrap();

        let mut lines = LineReader::new(link);
        assert_eq!(lines.next_line().await.unwrap(), complete(&input[..MAX_LINE_LEN - 1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffer_is_bounded_without_newlines() {
        let (link, mut peer) = tokio::io::duplex(64 * 1024);
        let mut lines = LineReader::new(link);

        peer.write_all(&vec![0x55; 20_000]).await.unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(100), lines.next_line()).await;

        assert!(pending.is_err());
        assert!(lines.buf.len() <= MAX_LINE_LEN);
        assert_eq!(lines.seen, 20_000);
    }
}
