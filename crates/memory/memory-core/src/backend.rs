//! # Memory Backend
//!
//! This module defines the storage interface shared by the local fallback
//! store and the external vector-store adapter.
//!
//! ## MemoryBackend Trait
//!
//! One backend is selected at engine startup and held behind a single
//! injected handle; call sites never branch on the concrete type. The two
//! implementations must be observably equivalent:
//!
//! - `search` applies the same speaker/persona/type option semantics
//! - scores are directed the same way (higher = more relevant)
//! - the threshold is inclusive (`score >= threshold` is kept)
//! - equal scores preserve insertion order (stable sort)
//!
//! `get`, `update`, and `delete` on a non-existent id report absence through
//! their return value rather than an error.

use async_trait::async_trait;

use crate::types::{Memory, ScoredMemory, SearchOptions};

/// Trait for storing and querying memory entries.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Adds a new memory entry.
    async fn add(&self, memory: Memory) -> Result<(), anyhow::Error>;

    /// Retrieves a memory by id. Returns `None` if not found.
    async fn get(&self, id: &str) -> Result<Option<Memory>, anyhow::Error>;

    /// Retrieves every stored memory.
    async fn get_all(&self) -> Result<Vec<Memory>, anyhow::Error>;

    /// Replaces the memory with the given id. Returns `false` when the id is
    /// absent; the replacement keeps the original id.
    async fn update(&self, id: &str, replacement: Memory) -> Result<bool, anyhow::Error>;

    /// Deletes a memory by id. Returns `false` when the id is absent.
    async fn delete(&self, id: &str) -> Result<bool, anyhow::Error>;

    /// Similarity search against the query embedding, filtered and ranked per
    /// `options`. Entries without embeddings never match.
    async fn search(
        &self,
        query_embedding: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredMemory>, anyhow::Error>;

    /// Removes every stored memory.
    async fn clear(&self) -> Result<(), anyhow::Error>;

    /// Number of stored memories.
    async fn count(&self) -> Result<usize, anyhow::Error>;

    /// Short backend name for diagnostics ("local" or "external").
    fn name(&self) -> &'static str;
}
