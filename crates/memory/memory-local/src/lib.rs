//! # Local Memory Fallback
//!
//! In-process brute-force vector index backed by durable key-value storage.
//!
//! This crate is the fallback path of the memory engine: when no external
//! vector database is available, [`LocalMemoryStore`] keeps the full memory
//! list in process, mirrors it to one namespaced storage key as JSON, and
//! answers similarity searches by scanning every candidate.
//!
//! ## Modules
//!
//! - [`error`] - `StorageError` with a distinguishable quota-exceeded variant
//! - [`kv`] - `KeyValueStorage` trait plus file-backed and in-memory stores
//! - [`store`] - `LocalMemoryStore`, the `MemoryBackend` implementation

pub mod error;
pub mod kv;
pub mod store;

pub use error::StorageError;
pub use kv::{FileKvStorage, InMemoryKvStorage, KeyValueStorage};
pub use store::LocalMemoryStore;
