//! Error types for capstan-fetch.

use std::io;

use thiserror::Error;

use crate::effects::transport::TransportError;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The operation was aborted through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// The cancellation token was disposed before the operation started.
    #[error("cancellation token already disposed")]
    Disposed,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Terminal HTTP status. Non-2xx responses other than redirects are
    /// never retried.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    #[error("redirect limit exceeded ({limit} redirects)")]
    TooManyRedirects { limit: u32 },

    #[error("giving up after {attempts} attempts: {source}")]
    RetriesExhausted { attempts: u32, source: TransportError },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid JSON response: {source} (body: {body:?})")]
    Json {
        source: serde_json::Error,
        body: String,
    },

    #[error("file I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    /// Returns `true` if this error reports cancellation rather than a
    /// genuine failure. Callers that cancelled an operation themselves
    /// branch on this to suppress error reporting.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}
