//! Error types for the core primitives.

use thiserror::Error;

/// Core error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("source file is empty: {0}")]
    EmptySource(String),

    #[error("invalid piece size: {0} (must be greater than zero)")]
    InvalidPieceSize(u64),

    #[error("invalid source path: {0}")]
    InvalidSourcePath(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
