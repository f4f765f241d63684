//! Storage error types.

use thiserror::Error;

/// Errors surfaced by the byte store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested key does not exist.
    #[error("key not found")]
    KeyNotFound,

    /// A write was attempted on a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnly,

    /// The transaction has already been committed or rolled back.
    #[error("transaction is closed")]
    TransactionClosed,

    /// The commit log on disk is truncated or corrupt.
    #[error("corrupt commit log: {0}")]
    CorruptLog(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
