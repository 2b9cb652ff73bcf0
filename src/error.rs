//! Error types for wiki revision operations.

use crate::types::{DocumentKey, RevisionNumber};
use thiserror::Error;

/// Main error type for wiki operations.
#[derive(Debug, Error)]
pub enum WikiError {
    #[error("Not authorized")]
    NotAuthorized,

    #[error("Base version outdated for {key}: expected {expected}")]
    Conflict {
        key: DocumentKey,
        expected: RevisionNumber,
    },

    #[error("Update rejected for {key} at revision {number}")]
    UpdateRejected {
        key: DocumentKey,
        number: RevisionNumber,
    },

    #[error("Technical problem: {0}")]
    Technical(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid snapshot format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },
}

impl WikiError {
    /// Whether a caller may reasonably retry the same request later.
    ///
    /// Conflicts need a reload first; nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WikiError::Conflict { .. } | WikiError::Technical(_))
    }

    /// Whether this error came from the request context rather than a collaborator.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, WikiError::Cancelled | WikiError::DeadlineExceeded)
    }
}

impl From<serde_json::Error> for WikiError {
    fn from(e: serde_json::Error) -> Self {
        WikiError::Deserialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for WikiError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        WikiError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for WikiError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        WikiError::Deserialization(e.to_string())
    }
}

/// Result type for wiki operations.
pub type Result<T> = std::result::Result<T, WikiError>;
