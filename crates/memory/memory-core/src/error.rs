//! Memory engine error types.
//!
//! Used by the engine facade and callers of memory APIs.

use thiserror::Error;

/// Errors that can occur when using memory engine operations.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// An engine method was called before `initialize()` completed.
    #[error("Memory engine not initialized; call initialize() first")]
    NotReady,

    /// The active backend failed during an operation after startup.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Durable storage failed in a way pruning could not absorb.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Embedding layer failure surfaced to a caller (internal fallbacks
    /// absorb transport failures, so this is rare).
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Stats were requested for a speaker with zero memories. Deliberately an
    /// error: an empty stats object would be misleading.
    #[error("No memories found for speaker: {0}")]
    UnknownSpeaker(String),
}
