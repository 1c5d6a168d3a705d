//! Error types for upload sessions

use thiserror::Error;

use crate::session::SessionState;

/// Errors that can terminate or reject an upload operation.
#[derive(Error, Debug, Clone)]
pub enum UploadError {
    /// Creation request failed or returned no resource reference.
    #[error("Upload initiation failed: {message}")]
    Initiation {
        status: Option<u16>,
        message: String,
    },

    /// A single chunk attempt failed (non-success status, timeout or network error).
    #[error("Chunk transfer failed at offset {offset}: {message}")]
    Transfer {
        offset: u64,
        status: Option<u16>,
        message: String,
    },

    /// The retry bound was exceeded for one chunk.
    #[error(
        "Retries exhausted for resource {resource_id} at offset {offset} after {attempts} attempts: {last_error}"
    )]
    RetryExhausted {
        resource_id: String,
        offset: u64,
        attempts: u32,
        last_error: String,
    },

    /// Operation not permitted in the current session state.
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Reading the source data failed.
    #[error("Failed to read upload source at offset {offset}: {message}")]
    Source { offset: u64, message: String },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {message}")]
    Client { message: String },

    /// The target cannot be uploaded (e.g. unreadable path).
    #[error("Invalid upload target: {message}")]
    InvalidTarget { message: String },
}

impl UploadError {
    /// Whether another attempt at the same offset may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Transfer { .. })
    }

    /// Offset at which the error occurred, if it is tied to one.
    pub fn offset(&self) -> Option<u64> {
        match self {
            UploadError::Transfer { offset, .. }
            | UploadError::RetryExhausted { offset, .. }
            | UploadError::Source { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    pub(crate) fn transfer(offset: u64, status: Option<u16>, message: impl Into<String>) -> Self {
        UploadError::Transfer {
            offset,
            status,
            message: message.into(),
        }
    }

    pub(crate) fn initiation(status: Option<u16>, message: impl Into<String>) -> Self {
        UploadError::Initiation {
            status,
            message: message.into(),
        }
    }
}

/// Soft error: the server's confirmed offset could not be used as-is.
///
/// Never returned from an operation. The caller falls back to `fallback`
/// and carries on; the error is logged and kept for observation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unusable Upload-Offset {reported:?} (prior {prior}), using {fallback}")]
pub struct OffsetParseError {
    /// Raw header value, `None` when the header was absent.
    pub reported: Option<String>,
    /// Offset recorded before the attempt.
    pub prior: u64,
    /// Offset adopted instead.
    pub fallback: u64,
}
