//! Durable storage error types.
//!
//! Used by `KeyValueStorage` implementations and the local memory store.

use thiserror::Error;

/// Errors that can occur when using durable key-value storage.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write was rejected because the store is out of space. The local
    /// memory store reacts with emergency pruning rather than failing the
    /// caller's operation.
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// True when the error is the quota-exhaustion condition.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded(_))
    }
}
