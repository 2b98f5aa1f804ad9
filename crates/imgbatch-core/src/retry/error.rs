//! Transfer error type for retry classification.

use std::path::PathBuf;

use super::policy::ErrorKind;

/// A resource id that does not look like a downloadable image on the asset host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{id} does not match {pattern}")]
pub struct ValidationError {
    pub id: String,
    pub pattern: String,
}

/// Error returned by one transfer attempt (validation, fetch, or save).
/// Classified into an `ErrorKind` before the retry policy decides what to do.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransferError {
    /// Identifier rejected before any network call. Never retried.
    #[error("invalid resource id: {0}")]
    Invalid(#[from] ValidationError),
    /// Destination file already exists and overwriting is off. Never retried.
    #[error("already present: {}", .0.display())]
    AlreadyPresent(PathBuf),
    /// Server answered 429 Too Many Requests.
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    /// Server answered with any other non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// The request failed below HTTP (DNS, connect, timeout, reset, oversized body).
    #[error("transport: {message}")]
    Transport { kind: ErrorKind, message: String },
    /// Writing the payload to disk failed (e.g. disk full). Not retried.
    #[error("storage: {0}")]
    Storage(String),
    /// Retry budget is zero, so no request was made.
    #[error("no attempts allowed (max_retries = 0)")]
    NoAttempts,
}

impl TransferError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u32> {
        match self {
            TransferError::RateLimited => Some(429),
            TransferError::Http(code) => Some(*code),
            _ => None,
        }
    }
}
