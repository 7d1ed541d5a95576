//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A type name or identity cannot address a record.
    #[error("invalid record key: {0}")]
    InvalidKey(String),

    /// A stored record is not valid UTF-8 text.
    #[error("record is not valid UTF-8: {0}")]
    NotText(String),
}
