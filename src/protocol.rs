//! Wire protocol for packet-log.
//!
//! Every message in either direction is one length-prefixed frame:
//!
//! ```text
//! <length>\r\n<data of exactly length bytes>
//!
//! Example:
//! Request:  5\r\nhello
//! Response: 29\r\nhello from server (packet #1)
//! ```
//!
//! A connection strictly alternates: one request frame from the client,
//! then one reply frame from the server. The payload of a request is
//! opaque text except for the reserved value `show`.

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::TransportError;

/// The only control token. Anything else is a packet to log.
pub const SHOW: &str = "show";

/// Default upper bound on a single frame's payload
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16MB

/// Read buffer size
const BUFFER_SIZE: usize = 4 * 1024;

/// Longest accepted header line, excluding \r\n
const MAX_HEADER_LENGTH: usize = 20;

/// A classified request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Return the whole log
    ReadAll,
    /// Append this payload to the log
    Write(String),
}

impl Request {
    /// Classify a raw request payload. Only an exact `show` reads the log.
    pub fn classify(payload: &[u8]) -> Self {
        let text = String::from_utf8_lossy(payload);
        if text == SHOW {
            Request::ReadAll
        } else {
            Request::Write(text.into_owned())
        }
    }
}

/// Parsed frame header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Length of the payload that follows
    pub length: usize,
    /// Bytes consumed by the header (length + \r\n)
    pub header_len: usize,
}

/// Header parse result
#[derive(Debug)]
pub enum ParseResult {
    /// Successfully parsed header
    Complete(Header),
    /// Need more data for header
    Incomplete,
    /// Invalid length format
    InvalidLength,
}

/// Parse a frame header from the input buffer.
///
/// The payload is not inspected; the caller must wait for
/// `header_len + length` bytes before taking it.
pub fn parse_header(input: &[u8]) -> ParseResult {
    let line_end = match find_crlf(input) {
        Some(pos) => pos,
        None if input.len() > MAX_HEADER_LENGTH + 1 => return ParseResult::InvalidLength,
        None => return ParseResult::Incomplete,
    };

    let line = &input[..line_end];
    if line.is_empty() || !line.iter().all(u8::is_ascii_digit) {
        return ParseResult::InvalidLength;
    }

    // Digits only, so this is valid UTF-8
    let length: usize = match std::str::from_utf8(line).ok().and_then(|s| s.parse().ok()) {
        Some(len) => len,
        None => return ParseResult::InvalidLength,
    };

    ParseResult::Complete(Header {
        length,
        header_len: line_end + 2,
    })
}

/// Encode `payload` as a complete frame.
pub fn encode_frame(payload: &[u8]) -> BytesMut {
    let header = format!("{}\r\n", payload.len());
    let mut frame = BytesMut::with_capacity(header.len() + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Find \r\n in buffer, returning the position of \r.
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    (0..buffer.len().saturating_sub(1)).find(|&i| buffer[i] == b'\r' && buffer[i + 1] == b'\n')
}

/// A byte stream carrying length-prefixed frames.
pub struct FramedStream<S> {
    stream: S,
    buffer: BytesMut,
    max_message_size: usize,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream using the default frame size limit
    pub fn new(stream: S) -> Self {
        Self::with_max_message_size(stream, DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Wrap a stream that accepts frames of any length.
    ///
    /// Used for replies: a `show` reply is as large as the log itself.
    pub fn unbounded(stream: S) -> Self {
        Self::with_max_message_size(stream, usize::MAX)
    }

    /// Wrap a stream, rejecting frames longer than `max_message_size`
    pub fn with_max_message_size(stream: S, max_message_size: usize) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(BUFFER_SIZE),
            max_message_size,
        }
    }

    /// Receive the next frame.
    ///
    /// Returns `Ok(None)` when the peer closes the connection between
    /// frames.
    pub async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        let header = loop {
            match parse_header(&self.buffer) {
                ParseResult::Complete(header) => break header,
                ParseResult::InvalidLength => return Err(TransportError::InvalidLength),
                ParseResult::Incomplete => {
                    let n = self.stream.read_buf(&mut self.buffer).await?;
                    if n == 0 {
                        if self.buffer.is_empty() {
                            trace!("Connection closed by peer");
                            return Ok(None);
                        }
                        return Err(TransportError::UnexpectedEof);
                    }
                }
            }
        };

        if header.length > self.max_message_size {
            return Err(TransportError::PayloadTooLarge {
                length: header.length,
                max: self.max_message_size,
            });
        }

        let total = header.header_len + header.length;
        if self.buffer.len() < total {
            self.buffer.reserve(total - self.buffer.len());
        }
        while self.buffer.len() < total {
            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(TransportError::UnexpectedEof);
            }
        }

        self.buffer.advance(header.header_len);
        let payload = self.buffer.split_to(header.length).freeze();
        trace!(bytes = payload.len(), "Received frame");
        Ok(Some(payload))
    }

    /// Send one frame and flush it.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let frame = encode_frame(payload);
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        trace!(bytes = payload.len(), "Sent frame");
        Ok(())
    }
}
