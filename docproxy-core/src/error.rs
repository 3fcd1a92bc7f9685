//! Error types and result types shared by the client and driver contracts.
//!
//! Both sides of the adapter speak [`DocError`], so errors raised by a wrapped client
//! reach driver callers unchanged. Use [`DocResult<T>`] as the return type for fallible
//! operations.

use serde_json::Error as SerdeJsonError;
use std::{borrow::Cow, fmt};
use thiserror::Error;

/// Status classification attached to an error.
///
/// The values follow HTTP status codes, extended with the client-side codes used for
/// transport and decoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Status {
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    Conflict = 409,
    PreconditionFailed = 412,
    InternalServerError = 500,
    /// The operation is not supported by this driver.
    NotImplemented = 501,
    /// The request never reached the server, or the connection dropped.
    Network = 601,
    /// The server answered with something that could not be decoded.
    BadResponse = 602,
}

impl Status {
    /// Returns the numeric status code.
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Represents every error that can cross the adapter boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocError {
    /// A status-classified error, usually reported by the wrapped client.
    #[error("{message}")]
    Status {
        status: Status,
        message: Cow<'static, str>,
    },
    /// A payload could not be extracted or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The caller cancelled the request context.
    #[error("context canceled")]
    Canceled,
    /// The request context deadline passed before the operation completed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// A cursor has no more records.
    #[error("end of stream")]
    EndOfStream,
    /// A cursor was used after it was closed.
    #[error("cursor closed")]
    CursorClosed,
    /// A driver entry point that the calling convention never uses was invoked.
    #[error("contract violation: {0}")]
    ContractViolation(Cow<'static, str>),
}

/// A specialized `Result` type for client and driver operations.
pub type DocResult<T> = Result<T, DocError>;

/// The error returned by every operation the proxy driver declines to support.
///
/// Return it with `NOT_IMPLEMENTED.clone()`; the message is borrowed, so the clone is
/// cheap and always compares equal to the original.
pub static NOT_IMPLEMENTED: DocError = DocError::Status {
    status: Status::NotImplemented,
    message: Cow::Borrowed("docproxy: not yet implemented in proxy driver"),
};

impl DocError {
    /// Creates a status-classified error.
    pub fn status_error(status: Status, message: impl Into<Cow<'static, str>>) -> Self {
        DocError::Status {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for a `404 Not Found` error.
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::status_error(Status::NotFound, message)
    }

    /// Returns the status classification of this error.
    ///
    /// `EndOfStream` is not a failure and has no classification.
    pub fn status(&self) -> Option<Status> {
        match self {
            DocError::Status { status, .. } => Some(*status),
            DocError::Serialization(_) => Some(Status::BadResponse),
            DocError::Canceled | DocError::DeadlineExceeded => Some(Status::RequestTimeout),
            DocError::CursorClosed => Some(Status::BadRequest),
            DocError::ContractViolation(_) => Some(Status::InternalServerError),
            DocError::EndOfStream => None,
        }
    }

    /// Returns `true` if this error reports an unsupported operation.
    pub fn is_not_implemented(&self) -> bool {
        self.status() == Some(Status::NotImplemented)
    }

    /// Returns `true` if this error is the cursor end signal.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, DocError::EndOfStream)
    }
}

impl From<SerdeJsonError> for DocError {
    fn from(err: SerdeJsonError) -> Self {
        DocError::Serialization(err.to_string())
    }
}
