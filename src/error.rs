//! Error types for packet-log.
//!
//! Transport errors end a single connection, store errors end a single
//! request. Neither stops the server once it is listening.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the framing layer on a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error on the underlying socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame header was not a decimal length
    #[error("invalid length")]
    InvalidLength,

    /// Frame header announced more bytes than the configured limit
    #[error("payload too large: {length} bytes (max {max})")]
    PayloadTooLarge { length: usize, max: usize },

    /// Peer closed the connection in the middle of a frame
    #[error("unexpected EOF while reading payload")]
    UnexpectedEof,
}

/// Errors raised while reading or appending the packet log.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error on the log file
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The session counter cannot be advanced any further
    #[error("packet counter exhausted")]
    CounterExhausted,
}

impl StoreError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_names_path() {
        let err = StoreError::io(
            "/var/lib/packet_log.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "I/O error on '/var/lib/packet_log.txt': denied"
        );
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = TransportError::PayloadTooLarge {
            length: 100,
            max: 10,
        };
        assert_eq!(err.to_string(), "payload too large: 100 bytes (max 10)");
    }
}
