//! # Vector Store Backend
//!
//! `MemoryBackend` implementation over the minimal vector-database client
//! shape. Search translates the speaker/persona/type options into an
//! equality `where` filter, issues a nearest-neighbor query, and converts
//! each returned distance `d` into `score = 1 - d`, dropping entries under
//! the threshold. Equal scores keep the order the store returned them in
//! (insertion order for `InProcessVectorDb`), matching the local fallback's
//! stable tie-break.
//!
//! Speaker filtering is case-insensitive, matching the local fallback: `add`
//! stores an ASCII-folded copy of the speaker alongside the serialized
//! metadata, and the `where` filter matches against that folded key. Records
//! without an embedding are stored (so `get`/`get_all` see them) but carry a
//! marker that excludes them from `search` results, again matching the local
//! fallback. Both injected keys are stripped on readback.
//!
//! Records read back from the store carry `embedding = None`; the client
//! shape does not return vectors.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use memory_core::{Memory, MemoryBackend, MemoryMetadata, ScoredMemory, SearchOptions};

use crate::client::{VectorCollection, VectorDatabase};

/// ASCII-folded speaker copy stored for case-insensitive filtering.
const SPEAKER_KEY_FIELD: &str = "speaker_key";
/// Marks whether the record carries a real embedding vector.
const HAS_EMBEDDING_FIELD: &str = "has_embedding";

/// Collection metadata requesting cosine-space similarity.
fn cosine_space_metadata() -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("hnsw:space".to_string(), "cosine".to_string());
    metadata
}

/// `MemoryBackend` over an external vector-database collection.
pub struct VectorStoreBackend {
    db: Arc<dyn VectorDatabase>,
    collection_name: String,
    collection: RwLock<Arc<dyn VectorCollection>>,
}

impl VectorStoreBackend {
    /// Opens (or creates) the named collection in cosine space.
    pub async fn open(
        db: Arc<dyn VectorDatabase>,
        collection_name: impl Into<String>,
    ) -> Result<Self, anyhow::Error> {
        let collection_name = collection_name.into();
        let collection = db
            .get_or_create_collection(&collection_name, Some(cosine_space_metadata()))
            .await?;
        info!(collection = %collection_name, "opened external vector collection");
        Ok(Self {
            db,
            collection_name,
            collection: RwLock::new(collection),
        })
    }

    async fn collection(&self) -> Arc<dyn VectorCollection> {
        self.collection.read().await.clone()
    }

    fn where_filter(options: &SearchOptions) -> Option<HashMap<String, String>> {
        let mut filter = HashMap::new();
        if let Some(speaker) = &options.speaker {
            filter.insert(SPEAKER_KEY_FIELD.to_string(), speaker.to_ascii_lowercase());
        }
        if let Some(persona) = &options.persona {
            filter.insert("persona".to_string(), persona.clone());
        }
        if let Some(memory_type) = options.memory_type {
            filter.insert("type".to_string(), memory_type.as_str().to_string());
        }
        (!filter.is_empty()).then_some(filter)
    }

    fn memory_from_parts(
        id: String,
        document: String,
        mut metadata: serde_json::Value,
    ) -> Result<Memory, anyhow::Error> {
        if let Some(object) = metadata.as_object_mut() {
            object.remove(SPEAKER_KEY_FIELD);
            object.remove(HAS_EMBEDDING_FIELD);
        }
        let metadata: MemoryMetadata = serde_json::from_value(metadata)
            .map_err(|e| anyhow::anyhow!("malformed record metadata: {}", e))?;
        Ok(Memory {
            id,
            text: document,
            embedding: None,
            metadata,
        })
    }
}

#[async_trait]
impl MemoryBackend for VectorStoreBackend {
    async fn add(&self, memory: Memory) -> Result<(), anyhow::Error> {
        let embedding = memory.embedding.unwrap_or_default();
        let mut metadata = serde_json::to_value(&memory.metadata)?;
        if let Some(object) = metadata.as_object_mut() {
            object.insert(
                SPEAKER_KEY_FIELD.to_string(),
                memory.metadata.speaker.to_ascii_lowercase().into(),
            );
            object.insert(
                HAS_EMBEDDING_FIELD.to_string(),
                (!embedding.is_empty()).into(),
            );
        }
        self.collection()
            .await
            .add(
                vec![memory.id.clone()],
                vec![embedding],
                vec![memory.text],
                vec![metadata],
            )
            .await?;
        debug!(id = %memory.id, "memory added to external store");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Memory>, anyhow::Error> {
        let result = self.collection().await.get(None).await?;
        for ((record_id, document), metadata) in result
            .ids
            .into_iter()
            .zip(result.documents)
            .zip(result.metadatas)
        {
            if record_id == id {
                return Ok(Some(Self::memory_from_parts(record_id, document, metadata)?));
            }
        }
        Ok(None)
    }

    async fn get_all(&self) -> Result<Vec<Memory>, anyhow::Error> {
        let result = self.collection().await.get(None).await?;
        result
            .ids
            .into_iter()
            .zip(result.documents)
            .zip(result.metadatas)
            .map(|((id, document), metadata)| Self::memory_from_parts(id, document, metadata))
            .collect()
    }

    /// Delete-then-add; the client shape has no atomic replace. If the add
    /// fails, the original record is put back (text and metadata only, the
    /// client does not return vectors) and the add error propagates.
    async fn update(&self, id: &str, mut replacement: Memory) -> Result<bool, anyhow::Error> {
        let Some(original) = self.get(id).await? else {
            return Ok(false);
        };
        let collection = self.collection().await;
        collection.delete(vec![id.to_string()]).await?;
        replacement.id = id.to_string();
        if let Err(add_err) = self.add(replacement).await {
            if let Err(restore_err) = self.add(original).await {
                warn!(id = %id, error = %restore_err, "failed to restore record after update error");
            }
            return Err(add_err);
        }
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool, anyhow::Error> {
        if self.get(id).await?.is_none() {
            return Ok(false);
        }
        self.collection().await.delete(vec![id.to_string()]).await?;
        Ok(true)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredMemory>, anyhow::Error> {
        let filter = Self::where_filter(options);
        let result = self
            .collection()
            .await
            .query(query_embedding, options.limit, filter.as_ref())
            .await?;

        let mut scored = Vec::with_capacity(result.ids.len());
        for (((id, document), metadata), distance) in result
            .ids
            .into_iter()
            .zip(result.documents)
            .zip(result.metadatas)
            .zip(result.distances)
        {
            if metadata.get(HAS_EMBEDDING_FIELD).and_then(|v| v.as_bool()) == Some(false) {
                continue;
            }
            let score = 1.0 - distance;
            if score < options.threshold {
                continue;
            }
            scored.push(ScoredMemory {
                memory: Self::memory_from_parts(id, document, metadata)?,
                score,
            });
        }
        Ok(scored)
    }

    /// Deletes and recreates the collection.
    async fn clear(&self) -> Result<(), anyhow::Error> {
        self.db.delete_collection(&self.collection_name).await?;
        let fresh = self
            .db
            .get_or_create_collection(&self.collection_name, Some(cosine_space_metadata()))
            .await?;
        *self.collection.write().await = fresh;
        info!(collection = %self.collection_name, "external collection cleared");
        Ok(())
    }

    async fn count(&self) -> Result<usize, anyhow::Error> {
        self.collection().await.count().await
    }

    fn name(&self) -> &'static str {
        "external"
    }
}
