//! Error types for the storage engine.

use thiserror::Error;

use crate::limits::LimitScope;

/// Errors that can occur in the storage engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or operation failed. Propagated unmodified.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A configured memory-count ceiling would be violated by a new memory.
    ///
    /// Never raised for updates to an existing id. The caller decides
    /// whether to retry with different parameters or abort.
    #[error("Memory limit exceeded: {scope} (current: {current}, limit: {limit})")]
    LimitExceeded {
        scope: LimitScope,
        current: usize,
        limit: usize,
    },

    /// An id-keyed mutation matched no rows.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored row could not be decoded into the data model.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<engram_types::TypesError> for StoreError {
    fn from(e: engram_types::TypesError) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
