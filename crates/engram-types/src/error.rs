//! Error types for the data model.

use thiserror::Error;

/// Errors produced when parsing external input into core types.
///
/// Every enum value crossing the crate boundary (CLI text, JSON fields,
/// database columns) goes through a validated parse; invalid input yields
/// one of these variants, never a silent default.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Unknown memory region string.
    #[error("unknown region: {0}")]
    UnknownRegion(String),

    /// Unknown memory kind string.
    #[error("unknown memory kind: {0}")]
    UnknownKind(String),

    /// Unknown impact level string.
    #[error("unknown impact level: {0}")]
    UnknownImpact(String),

    /// Invalid memory ID format.
    #[error("invalid memory id: {0}")]
    InvalidId(#[from] uuid::Error),

    /// Malformed timestamp.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Result type alias for data model operations.
pub type Result<T> = std::result::Result<T, TypesError>;
