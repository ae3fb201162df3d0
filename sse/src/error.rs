//! Error types for the `sse` crate.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for the stream client.
/// Holds the error kind and an optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Categories of stream errors. None of them are fatal to the client; they
/// all feed the reconnect loop.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The endpoint URL or a request header was rejected before connecting.
    InvalidEndpoint,
    /// The connection could not be established or broke mid-stream.
    Transport,
    /// The server closed the stream before sending anything.
    StreamClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Stream error ({:?}): {}", self.error_kind, source),
            None => write!(f, "Stream error ({:?})", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Helper function to create stream errors.
pub fn stream_error(kind: ErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: kind,
    }
}
