//! Error types for the Noteline engine.

use crate::NoteId;
use thiserror::Error;

/// All errors surfaced by the sync core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Local storage errors
    #[error("local storage unavailable: {0}")]
    StorageUnavailable(String),

    // Remote errors (always retryable)
    #[error("remote store unreachable: {0}")]
    Unreachable(String),

    #[error("note not found: {0}")]
    NotFound(NoteId),

    // Reconciliation errors
    #[error("merge failed for note '{id}': {reason}")]
    MergeFailed { id: NoteId, reason: String },

    // Validation errors
    #[error("invalid note: {0}")]
    InvalidNote(String),
}

impl Error {
    /// Whether a later attempt may succeed without any change on our side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Unreachable(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
