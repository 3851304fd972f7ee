//! Store error types.

use thiserror::Error;

/// Remote store and upload session errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("part {part_number} upload rejected: {reason}")]
    PartUpload { part_number: u32, reason: String },

    #[error("finalize rejected: {0}")]
    Finalize(String),

    #[error("abort failed: {0}")]
    Abort(String),

    #[error("upload session error: {0}")]
    Session(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] stevedore_core::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
