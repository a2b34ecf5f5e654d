//! # External Vector Store Backend
//!
//! Adapter between the `MemoryBackend` trait and an environment-provided
//! vector-database client.
//!
//! The engine depends only on a minimal client shape
//! ([`VectorDatabase`] / [`VectorCollection`]): get-or-create a named
//! collection, add records, nearest-neighbor query with an equality filter,
//! bulk get, per-id delete, and collection deletion. Any client exposing that
//! shape can be plugged in; [`InProcessVectorDb`] is a brute-force reference
//! implementation used in tests and development.
//!
//! ## Modules
//!
//! - [`client`] - the minimal client traits and result types
//! - [`backend`] - `VectorStoreBackend`, the `MemoryBackend` adapter
//! - [`inprocess`] - `InProcessVectorDb` reference implementation

pub mod backend;
pub mod client;
pub mod inprocess;

pub use backend::VectorStoreBackend;
pub use client::{GetResult, QueryResult, VectorCollection, VectorDatabase};
pub use inprocess::InProcessVectorDb;
