//! # Memory Core
//!
//! Core types and traits shared by every memory storage backend.
//!
//! ## Modules
//!
//! - [`types`] - `Memory`, `MemoryMetadata`, `MemoryType`, search options and results
//! - [`backend`] - The `MemoryBackend` storage trait
//! - [`error`] - `MemoryError` taxonomy
//!
//! Backends implementing [`MemoryBackend`] must be observably equivalent to a
//! caller: the same option semantics, the same score direction (higher = more
//! relevant), inclusive (`>=`) threshold handling, and a stable tie-break that
//! preserves insertion order among equal scores.

pub mod backend;
pub mod error;
pub mod types;

pub use backend::MemoryBackend;
pub use error::MemoryError;
pub use types::{Memory, MemoryMetadata, MemoryType, ScoredMemory, SearchOptions};
