//! Error types for the `domain` layer.
use api_client::error::{
    CsrfErrorKind, ErrorKind as ApiErrorKind, HttpErrorKind, ResponseErrorKind,
    CSRF_RETRY_MESSAGE, GENERIC_FAILURE_MESSAGE, NETWORK_FAILURE_MESSAGE, SESSION_EXPIRED_MESSAGE,
};
use api_client::Error as ApiError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the domain layer are modeled as a tree with `domain::error::Error`
/// as the root, holding an `error_kind` that says where the failure came from
/// and the original error in `source`. Lower layers (`api_client`, surfaces)
/// are translated here so callers of the domain never depend on them directly.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// A panel could not be mounted (anchor gone, file not writable).
    Surface,
    Config,
    Other(String),
}

/// Failures reported by, or on the way to, the backend.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Server(Option<String>),
    CsrfRejected,
    Unauthorized,
    Malformed,
    Other(String),
}

impl Error {
    /// Message suitable for a toast.
    pub fn user_message(&self) -> String {
        match &self.error_kind {
            DomainErrorKind::External(ExternalErrorKind::Server(Some(message)))
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            DomainErrorKind::External(ExternalErrorKind::Network) => {
                NETWORK_FAILURE_MESSAGE.to_string()
            }
            DomainErrorKind::External(ExternalErrorKind::CsrfRejected) => {
                CSRF_RETRY_MESSAGE.to_string()
            }
            DomainErrorKind::External(ExternalErrorKind::Unauthorized) => {
                SESSION_EXPIRED_MESSAGE.to_string()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_csrf_rejection(&self) -> bool {
        self.error_kind == DomainErrorKind::External(ExternalErrorKind::CsrfRejected)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Domain Error ({:?}): {}", self.error_kind, source),
            None => write!(f, "Domain Error ({:?})", self.error_kind),
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

// This is where we translate errors from the `api_client` layer to the `domain` layer.
impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        let external = match &err.error_kind {
            ApiErrorKind::Http(HttpErrorKind::Unauthorized) => ExternalErrorKind::Unauthorized,
            ApiErrorKind::Http(HttpErrorKind::BuilderFailed) => {
                return Error {
                    source: Some(Box::new(err)),
                    error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
                }
            }
            ApiErrorKind::Http(HttpErrorKind::Status(code)) => {
                ExternalErrorKind::Other(format!("HTTP {code}"))
            }
            ApiErrorKind::Http(_) => ExternalErrorKind::Network,
            ApiErrorKind::Server(message) => ExternalErrorKind::Server(message.clone()),
            ApiErrorKind::Csrf(CsrfErrorKind::Rejected) => ExternalErrorKind::CsrfRejected,
            ApiErrorKind::Csrf(CsrfErrorKind::TokenUnavailable) => {
                ExternalErrorKind::Other("CSRF token unavailable".to_string())
            }
            ApiErrorKind::Response(ResponseErrorKind::Malformed)
            | ApiErrorKind::Response(ResponseErrorKind::MissingData) => ExternalErrorKind::Malformed,
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::External(external),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Surface),
        }
    }
}

/// Helper function to create surface errors.
pub fn surface_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Surface),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::error::{csrf_error, http_error, server_error};

    #[test]
    fn api_errors_translate_to_external_kinds() {
        let err: Error = server_error(Some("Paper tray empty".to_string())).into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Server(Some(
                "Paper tray empty".to_string()
            )))
        );
        assert_eq!(err.user_message(), "Paper tray empty");

        let err: Error = csrf_error(CsrfErrorKind::Rejected, "403").into();
        assert!(err.is_csrf_rejection());

        let err: Error = http_error(HttpErrorKind::Network, "reset").into();
        assert_eq!(err.user_message(), NETWORK_FAILURE_MESSAGE);
    }

    #[test]
    fn surface_errors_use_the_generic_message() {
        let err = surface_error("anchor missing");
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Surface)
        );
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }
}
