//! Error types for the `api_client` crate.
//!
//! Follows the same pattern as the other crates: a root `Error` struct holding
//! an error kind tree plus the optional source error.

use std::error::Error as StdError;
use std::fmt;

/// Shown when the server reports a failure without a message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong, please try again.";
pub const NETWORK_FAILURE_MESSAGE: &str =
    "Network error, please check your connection and try again.";
pub const CSRF_RETRY_MESSAGE: &str =
    "Your security token expired and has been renewed. Please retry the action.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired, please log in again.";

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of REST client errors.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Http(HttpErrorKind),
    /// The backend answered `success: false`, optionally with a message.
    Server(Option<String>),
    Csrf(CsrfErrorKind),
    Response(ResponseErrorKind),
}

#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
    Unauthorized,
    Status(u16),
}

#[derive(Debug, PartialEq)]
pub enum CsrfErrorKind {
    /// The token endpoint did not hand out a token.
    TokenUnavailable,
    /// The backend refused the token (HTTP 403). The token has already been
    /// refreshed; the caller should offer a retry.
    Rejected,
}

#[derive(Debug, PartialEq)]
pub enum ResponseErrorKind {
    /// The body was not JSON, even after the leading-noise recovery.
    Malformed,
    /// The envelope reported success but carried no `data`.
    MissingData,
}

impl Error {
    /// Message suitable for a toast. Server messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match &self.error_kind {
            ErrorKind::Server(Some(message)) if !message.trim().is_empty() => message.clone(),
            ErrorKind::Http(HttpErrorKind::Network) | ErrorKind::Http(HttpErrorKind::RequestFailed) => {
                NETWORK_FAILURE_MESSAGE.to_string()
            }
            ErrorKind::Http(HttpErrorKind::Unauthorized) => SESSION_EXPIRED_MESSAGE.to_string(),
            ErrorKind::Csrf(CsrfErrorKind::Rejected) => CSRF_RETRY_MESSAGE.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_csrf_rejection(&self) -> bool {
        self.error_kind == ErrorKind::Csrf(CsrfErrorKind::Rejected)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
            ErrorKind::Server(Some(message)) => write!(f, "Server error: {}", message),
            ErrorKind::Server(None) => write!(f, "Server error without message"),
            ErrorKind::Csrf(kind) => write!(f, "CSRF error: {:?}", kind),
            ErrorKind::Response(kind) => write!(f, "Response error: {:?}", kind),
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

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else if err.is_decode() {
            ErrorKind::Response(ResponseErrorKind::Malformed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create HTTP errors.
pub fn http_error(kind: HttpErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Http(kind),
    }
}

/// Helper function to create server-reported errors.
pub fn server_error(message: Option<String>) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Server(message),
    }
}

/// Helper function to create CSRF errors.
pub fn csrf_error(kind: CsrfErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Csrf(kind),
    }
}

/// Helper function to create response decoding errors.
pub fn response_error(kind: ResponseErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Response(kind),
    }
}
