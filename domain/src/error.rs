//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the domain layer are modeled as a tree with `domain::error::Error`
/// as the root type holding `error_kind` enums for the kinds of failures that
/// can occur here or in collaborators. The `source` field holds the original
/// error that caused the domain error. The various `error_kind`s are
/// ultimately used by `web` to return appropriate HTTP status codes and
/// structured bodies to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Auth(AuthErrorKind),
    Stream(StreamErrorKind),
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Failures while establishing a caller's identity from a stream ticket or
/// bearer credential.
#[derive(Debug, PartialEq)]
pub enum AuthErrorKind {
    /// No credential was supplied at all.
    Unauthenticated,
    /// Signature or claim verification failed.
    InvalidCredential,
    /// The signature verified but the ticket's store record is gone.
    TicketExpired,
    /// The ticket's purpose does not allow the requested stream.
    PurposeMismatch,
}

/// Failures while admitting a stream connection.
#[derive(Debug, PartialEq)]
pub enum StreamErrorKind {
    /// Device ownership was denied for at least one requested device.
    Forbidden,
    /// The data purpose requires at least one device.
    MissingDeviceSelector,
    /// More distinct devices were requested than one connection may hold.
    TooManyDevices { requested: usize, limit: usize },
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

impl Error {
    pub fn auth(kind: AuthErrorKind) -> Self {
        Self {
            source: None,
            error_kind: DomainErrorKind::Auth(kind),
        }
    }

    pub fn stream(kind: StreamErrorKind) -> Self {
        Self {
            source: None,
            error_kind: DomainErrorKind::Stream(kind),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(message.into())),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Any verification failure on a presented token is an invalid credential;
// the distinction between a bad signature and an expired signature is not
// surfaced to callers.
impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Auth(AuthErrorKind::InvalidCredential),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "JSON serialization related error".to_string(),
            )),
        }
    }
}
