//! # Memory Engine
//!
//! The engine facade: embeds text through the generator, persists and
//! queries through whichever backend is active, and renders results for
//! prompt assembly.
//!
//! ## Failure semantics
//!
//! - any call before `initialize()` completes raises [`MemoryError::NotReady`]
//! - embedding failures never surface (the generator has a total fallback)
//! - backend failures after startup propagate; the engine does not silently
//!   downgrade to local mode mid-session, to avoid inconsistent state
//! - operations on a non-existent id return `false`/`None`, never an error

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use memory_core::{
    Memory, MemoryBackend, MemoryError, MemoryMetadata, MemoryType, ScoredMemory, SearchOptions,
};
use memory_local::KeyValueStorage;
use memory_vector::VectorDatabase;

use crate::config::EngineConfig;
use crate::generator::EmbeddingGenerator;
use crate::manager::VectorMemoryManager;

/// Diagnostic snapshot of the engine's active backend and embedding mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageInfo {
    /// Active backend: "local" or "external".
    pub backend: String,
    /// Embedding mode: "remote" or "local".
    pub embedding_mode: String,
    /// Number of stored memories.
    pub memory_count: usize,
    /// Number of cached embeddings.
    pub cached_embeddings: usize,
}

/// Memory engine facade.
pub struct RagMemoryManager {
    generator: Arc<EmbeddingGenerator>,
    external: Option<Arc<dyn VectorDatabase>>,
    storage: Arc<dyn KeyValueStorage>,
    manager: RwLock<VectorMemoryManager>,
}

impl RagMemoryManager {
    /// Creates an uninitialized engine. `external` is the optional
    /// environment-provided vector database; `storage` backs the local
    /// fallback either way.
    pub fn new(
        generator: Arc<EmbeddingGenerator>,
        external: Option<Arc<dyn VectorDatabase>>,
        storage: Arc<dyn KeyValueStorage>,
        config: EngineConfig,
    ) -> Self {
        Self {
            generator,
            external,
            storage,
            manager: RwLock::new(VectorMemoryManager::new(config)),
        }
    }

    /// Initializes the embedding generator, then selects the storage
    /// backend. Idempotent: a second call logs and returns.
    pub async fn initialize(&self) -> Result<(), MemoryError> {
        let mut manager = self.manager.write().await;
        if manager.is_ready() {
            info!("memory engine already initialized");
            return Ok(());
        }

        let remote = self.generator.initialize().await;
        manager
            .initialize_database(self.external.clone(), self.storage.clone())
            .await;
        info!(
            remote_embeddings = remote,
            external_store = manager.using_external(),
            "memory engine initialized"
        );
        Ok(())
    }

    async fn backend(&self) -> Result<Arc<dyn MemoryBackend>, MemoryError> {
        self.manager.read().await.backend().ok_or(MemoryError::NotReady)
    }

    /// True when the external vector store is active.
    pub async fn using_external(&self) -> bool {
        self.manager.read().await.using_external()
    }

    /// Embeds `text`, builds the memory, writes it to the active backend,
    /// and returns its id.
    pub async fn add_memory(
        &self,
        text: &str,
        speaker: &str,
        memory_type: MemoryType,
        persona: &str,
        importance: i32,
        extra: HashMap<String, serde_json::Value>,
    ) -> Result<String, MemoryError> {
        let backend = self.backend().await?;
        let embedding = self.generator.generate(text).await;

        let mut metadata = MemoryMetadata::new(speaker, memory_type, persona, importance);
        metadata.extra = extra;

        let memory = Memory::new(text.to_string(), Some(embedding), metadata);
        let id = memory.id.clone();
        backend
            .add(memory)
            .await
            .map_err(|e| MemoryError::Backend(e.to_string()))?;
        debug!(id = %id, memory_type = %memory_type, "memory added");
        Ok(id)
    }

    /// Embeds `query` and runs a similarity search on the active backend.
    /// Both backends honor the same option semantics, score direction, and
    /// inclusive threshold.
    pub async fn retrieve_relevant_memories(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        let backend = self.backend().await?;
        let query_embedding = self.generator.generate(query).await;
        backend
            .search(&query_embedding, &options)
            .await
            .map_err(|e| MemoryError::Backend(e.to_string()))
    }

    /// Renders results as a numbered, human-readable block for downstream
    /// prompt assembly. Pure formatting, no side effects.
    pub fn format_memories_for_context(&self, results: &[ScoredMemory]) -> String {
        if results.is_empty() {
            return "No relevant memories found.".to_string();
        }

        let mut out = String::from("Relevant memories:\n");
        for (index, result) in results.iter().enumerate() {
            let m = &result.memory;
            out.push_str(&format!(
                "{}. [{:.0}% relevant] [importance {}] {} ({}, {}): {}\n",
                index + 1,
                result.score * 100.0,
                m.metadata.importance,
                m.metadata.speaker,
                m.metadata.memory_type,
                m.metadata.timestamp.format("%Y-%m-%d"),
                m.text
            ));
        }
        out
    }

    /// Retrieves a memory by id.
    pub async fn get_memory_by_id(&self, id: &str) -> Result<Option<Memory>, MemoryError> {
        self.backend()
            .await?
            .get(id)
            .await
            .map_err(|e| MemoryError::Backend(e.to_string()))
    }

    /// Retrieves every stored memory.
    pub async fn get_all_memories(&self) -> Result<Vec<Memory>, MemoryError> {
        self.backend()
            .await?
            .get_all()
            .await
            .map_err(|e| MemoryError::Backend(e.to_string()))
    }

    /// Replaces a memory wholesale, recomputing the embedding when the text
    /// changed (or when the replacement carries none). Returns `false` when
    /// the id is absent.
    pub async fn update_memory(
        &self,
        id: &str,
        mut replacement: Memory,
    ) -> Result<bool, MemoryError> {
        let backend = self.backend().await?;
        let Some(existing) = backend
            .get(id)
            .await
            .map_err(|e| MemoryError::Backend(e.to_string()))?
        else {
            return Ok(false);
        };

        if existing.text != replacement.text || replacement.embedding.is_none() {
            replacement.embedding = Some(self.generator.generate(&replacement.text).await);
        }

        backend
            .update(id, replacement)
            .await
            .map_err(|e| MemoryError::Backend(e.to_string()))
    }

    /// Deletes a memory permanently. Returns `false` when the id is absent.
    pub async fn delete_memory(&self, id: &str) -> Result<bool, MemoryError> {
        self.backend()
            .await?
            .delete(id)
            .await
            .map_err(|e| MemoryError::Backend(e.to_string()))
    }

    /// Removes every stored memory (external path: delete and recreate the
    /// collection; local path: clear and rewrite the storage key).
    pub async fn clear_all_memories(&self) -> Result<(), MemoryError> {
        self.backend()
            .await?
            .clear()
            .await
            .map_err(|e| MemoryError::Backend(e.to_string()))
    }

    /// Reports the active backend and embedding mode.
    pub async fn get_storage_info(&self) -> Result<StorageInfo, MemoryError> {
        let backend = self.backend().await?;
        let memory_count = backend
            .count()
            .await
            .map_err(|e| MemoryError::Backend(e.to_string()))?;
        Ok(StorageInfo {
            backend: backend.name().to_string(),
            embedding_mode: if self.generator.is_remote() {
                "remote".to_string()
            } else {
                "local".to_string()
            },
            memory_count,
            cached_embeddings: self.generator.cache_len().await,
        })
    }
}
