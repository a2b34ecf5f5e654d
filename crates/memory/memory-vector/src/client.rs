//! Minimal vector-database client shape.
//!
//! Mirrors what cosine-space vector stores commonly expose: named
//! collections, batched add, filtered nearest-neighbor query returning
//! distances, bulk get, and per-id delete. Distances are in cosine space
//! (`distance = 1 - similarity`); the backend converts them back to scores.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of a nearest-neighbor query. Parallel vectors, one entry per hit,
/// ordered nearest first.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<serde_json::Value>,
    pub distances: Vec<f32>,
}

/// Result of a bulk get. Parallel vectors in insertion order; embeddings are
/// not returned.
#[derive(Debug, Clone, Default)]
pub struct GetResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<serde_json::Value>,
}

/// One named collection inside a vector database.
#[async_trait]
pub trait VectorCollection: Send + Sync {
    /// Adds records. The four vectors are parallel and must be equal length.
    async fn add(
        &self,
        ids: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        documents: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<(), anyhow::Error>;

    /// Nearest-neighbor query for up to `n_results` records, optionally
    /// narrowed by an equality filter on metadata fields.
    async fn query(
        &self,
        query_embedding: &[f32],
        n_results: usize,
        where_filter: Option<&HashMap<String, String>>,
    ) -> Result<QueryResult, anyhow::Error>;

    /// Returns stored records in insertion order, up to `limit` when given.
    async fn get(&self, limit: Option<usize>) -> Result<GetResult, anyhow::Error>;

    /// Deletes records by id. Unknown ids are ignored.
    async fn delete(&self, ids: Vec<String>) -> Result<(), anyhow::Error>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize, anyhow::Error>;
}

/// A vector database holding named collections.
#[async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Opens the named collection, creating it with the given metadata
    /// (e.g. `{"hnsw:space": "cosine"}`) when absent.
    async fn get_or_create_collection(
        &self,
        name: &str,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<Arc<dyn VectorCollection>, anyhow::Error>;

    /// Deletes the named collection and all its records.
    async fn delete_collection(&self, name: &str) -> Result<(), anyhow::Error>;
}
