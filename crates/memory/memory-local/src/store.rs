//! # Local Memory Store
//!
//! Brute-force vector index over a full in-memory memory list, mirrored to
//! durable key-value storage under a single namespace key as JSON.
//!
//! ## Search semantics
//!
//! Higher layers assume these are interchangeable with the external-store
//! path, so they are pinned here:
//!
//! - filters: speaker (case-insensitive), persona and type (exact)
//! - candidates without an embedding never match
//! - a result scoring exactly `threshold` is kept (`>=`, not `>`)
//! - descending stable sort: equal scores preserve insertion order
//!
//! ## Quota handling
//!
//! On a quota-exceeded write the store performs emergency pruning: the list
//! is cut to the most recent `prune_target` records by metadata timestamp and
//! the write retried once. A second quota failure is logged and the operation
//! still succeeds, leaving the in-memory list as the source of truth for the
//! rest of the session (durability is sacrificed before availability).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use memory_core::{Memory, MemoryBackend, ScoredMemory, SearchOptions};

use crate::error::StorageError;
use crate::kv::KeyValueStorage;

/// Default number of records kept by emergency pruning.
pub const DEFAULT_PRUNE_TARGET: usize = 500;

/// In-process brute-force vector index with durable persistence.
pub struct LocalMemoryStore {
    storage: Arc<dyn KeyValueStorage>,
    storage_key: String,
    prune_target: usize,
    memories: Arc<RwLock<Vec<Memory>>>,
}

impl LocalMemoryStore {
    /// Opens the store, loading any previously persisted list. A missing blob
    /// starts the store empty; an unreadable or corrupt blob is logged and
    /// also starts it empty rather than failing startup.
    pub async fn new(storage: Arc<dyn KeyValueStorage>, storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();
        let memories = match storage.get_item(&storage_key).await {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<Memory>>(&blob) {
                Ok(list) => {
                    info!(count = list.len(), key = %storage_key, "loaded persisted memories");
                    list
                }
                Err(e) => {
                    warn!(error = %e, key = %storage_key, "persisted memory blob is corrupt, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, key = %storage_key, "could not read persisted memories, starting empty");
                Vec::new()
            }
        };

        Self {
            storage,
            storage_key,
            prune_target: DEFAULT_PRUNE_TARGET,
            memories: Arc::new(RwLock::new(memories)),
        }
    }

    /// Overrides the emergency-prune retention count.
    pub fn with_prune_target(mut self, prune_target: usize) -> Self {
        self.prune_target = prune_target;
        self
    }

    /// Serializes and writes the list, pruning and retrying once on quota
    /// exhaustion. Called with the write lock held so interleaved writers
    /// serialize at this step (last write wins).
    async fn persist(&self, memories: &mut Vec<Memory>) -> Result<(), StorageError> {
        let payload = serde_json::to_string(&*memories)?;
        match self.storage.set_item(&self.storage_key, &payload).await {
            Ok(()) => Ok(()),
            Err(StorageError::QuotaExceeded(reason)) => {
                warn!(
                    reason = %reason,
                    count = memories.len(),
                    prune_target = self.prune_target,
                    "storage quota exceeded, emergency pruning"
                );
                // Keep only the most recent records, then restore
                // chronological insertion order for stable tie-breaks.
                memories.sort_by(|a, b| b.metadata.timestamp.cmp(&a.metadata.timestamp));
                memories.truncate(self.prune_target);
                memories.sort_by(|a, b| a.metadata.timestamp.cmp(&b.metadata.timestamp));

                let payload = serde_json::to_string(&*memories)?;
                match self.storage.set_item(&self.storage_key, &payload).await {
                    Ok(()) => {
                        info!(count = memories.len(), "emergency prune write succeeded");
                        Ok(())
                    }
                    Err(e) => {
                        // In-memory state stays the source of truth for the
                        // rest of the session.
                        warn!(error = %e, "retry after emergency prune failed, continuing without durability");
                        Ok(())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Standard dot-product-over-norms cosine similarity.
    ///
    /// Returns 0.0 when the vectors differ in length or either norm is zero;
    /// never panics.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    fn matches_filters(memory: &Memory, options: &SearchOptions) -> bool {
        if let Some(speaker) = &options.speaker {
            if !memory.metadata.speaker.eq_ignore_ascii_case(speaker) {
                return false;
            }
        }
        if let Some(persona) = &options.persona {
            if &memory.metadata.persona != persona {
                return false;
            }
        }
        if let Some(memory_type) = options.memory_type {
            if memory.metadata.memory_type != memory_type {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl MemoryBackend for LocalMemoryStore {
    /// Appends the memory and persists the list.
    async fn add(&self, memory: Memory) -> Result<(), anyhow::Error> {
        let mut memories = self.memories.write().await;
        memories.push(memory);
        self.persist(&mut memories).await?;
        debug!(count = memories.len(), "memory added to local store");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Memory>, anyhow::Error> {
        let memories = self.memories.read().await;
        Ok(memories.iter().find(|m| m.id == id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Memory>, anyhow::Error> {
        Ok(self.memories.read().await.clone())
    }

    /// Replaces the memory with the given id, keeping the original id.
    async fn update(&self, id: &str, mut replacement: Memory) -> Result<bool, anyhow::Error> {
        let mut memories = self.memories.write().await;
        let Some(slot) = memories.iter_mut().find(|m| m.id == id) else {
            return Ok(false);
        };
        replacement.id = id.to_string();
        *slot = replacement;
        self.persist(&mut memories).await?;
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool, anyhow::Error> {
        let mut memories = self.memories.write().await;
        let before = memories.len();
        memories.retain(|m| m.id != id);
        if memories.len() == before {
            return Ok(false);
        }
        self.persist(&mut memories).await?;
        Ok(true)
    }

    /// Scans every candidate, scoring by cosine similarity.
    async fn search(
        &self,
        query_embedding: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredMemory>, anyhow::Error> {
        let memories = self.memories.read().await;

        let mut results: Vec<ScoredMemory> = memories
            .iter()
            .filter(|m| Self::matches_filters(m, options))
            .filter_map(|m| {
                let embedding = m.embedding.as_ref()?;
                let score = Self::cosine_similarity(query_embedding, embedding);
                (score >= options.threshold).then(|| ScoredMemory {
                    memory: m.clone(),
                    score,
                })
            })
            .collect();

        // Stable: equal scores keep insertion order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(options.limit);

        Ok(results)
    }

    /// Clears the list and rewrites the storage key.
    async fn clear(&self) -> Result<(), anyhow::Error> {
        let mut memories = self.memories.write().await;
        memories.clear();
        self.persist(&mut memories).await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize, anyhow::Error> {
        Ok(self.memories.read().await.len())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKvStorage;
    use chrono::{Duration, Utc};
    use memory_core::{MemoryMetadata, MemoryType};

    fn entry(text: &str, embedding: Option<Vec<f32>>) -> Memory {
        Memory::new(
            text.to_string(),
            embedding,
            MemoryMetadata::new("user", MemoryType::Conversation, "NIRVANA", 5),
        )
    }

    async fn store() -> LocalMemoryStore {
        LocalMemoryStore::new(Arc::new(InMemoryKvStorage::new()), "memories").await
    }

    #[tokio::test]
    async fn test_add_get_delete() {
        let store = store().await;
        let memory = entry("hello", Some(vec![1.0, 0.0]));
        let id = memory.id.clone();

        store.add(memory).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(&id).await.unwrap().unwrap().text, "hello");

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_reports_absence() {
        let store = store().await;
        let memory = entry("original", Some(vec![1.0, 0.0]));
        let id = memory.id.clone();
        store.add(memory).await.unwrap();

        let mut replacement = entry("updated", Some(vec![0.0, 1.0]));
        replacement.id = "something-else".to_string();
        assert!(store.update(&id, replacement).await.unwrap());

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.text, "updated");
        assert_eq!(stored.id, id);

        let ghost = entry("ghost", None);
        assert!(!store.update("missing-id", ghost).await.unwrap());
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(InMemoryKvStorage::new());
        {
            let store = LocalMemoryStore::new(storage.clone(), "memories").await;
            store.add(entry("persisted", Some(vec![1.0]))).await.unwrap();
        }
        let reopened = LocalMemoryStore::new(storage, "memories").await;
        let all = reopened.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "persisted");
    }

    #[tokio::test]
    async fn test_corrupt_blob_starts_empty() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(InMemoryKvStorage::new());
        storage.set_item("memories", "{not json").await.unwrap();
        let store = LocalMemoryStore::new(storage, "memories").await;
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cosine_similarity_bounds() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((LocalMemoryStore::cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);

        let b = vec![-1.0, -2.0, -3.0];
        assert!((LocalMemoryStore::cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);

        let c = vec![0.0, 0.0, 0.0];
        assert_eq!(LocalMemoryStore::cosine_similarity(&a, &c), 0.0);

        // Length mismatch must not raise.
        let short = vec![1.0];
        assert_eq!(LocalMemoryStore::cosine_similarity(&a, &short), 0.0);

        let empty: Vec<f32> = vec![];
        assert_eq!(LocalMemoryStore::cosine_similarity(&empty, &empty), 0.0);
    }

    #[tokio::test]
    async fn test_search_threshold_is_inclusive() {
        let store = store().await;
        // cos with query [1,0]: exactly 0.6 and exactly 0.8.
        let mut low = entry("low", Some(vec![0.6, 0.8]));
        low.metadata.speaker = "user".to_string();
        let high = entry("high", Some(vec![0.8, 0.6]));
        store.add(low).await.unwrap();
        store.add(high).await.unwrap();

        let options = SearchOptions {
            threshold: 0.8,
            ..Default::default()
        };
        let results = store.search(&[1.0, 0.0], &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].memory.text, "high");
        assert!((results[0].score - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_skips_missing_embeddings_and_applies_filters() {
        let store = store().await;

        let mut a = entry("note from alice", Some(vec![1.0, 0.0]));
        a.metadata.speaker = "Alice".to_string();
        a.metadata.memory_type = MemoryType::Note;

        let mut b = entry("fact from bob", Some(vec![1.0, 0.0]));
        b.metadata.speaker = "bob".to_string();
        b.metadata.memory_type = MemoryType::Fact;

        let no_vector = entry("unsearchable", None);

        store.add(a).await.unwrap();
        store.add(b).await.unwrap();
        store.add(no_vector).await.unwrap();

        // Speaker filter is case-insensitive.
        let options = SearchOptions {
            speaker: Some("alice".to_string()),
            threshold: 0.5,
            ..Default::default()
        };
        let results = store.search(&[1.0, 0.0], &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].memory.text, "note from alice");

        // Type filter is exact.
        let options = SearchOptions {
            memory_type: Some(MemoryType::Fact),
            threshold: 0.5,
            ..Default::default()
        };
        let results = store.search(&[1.0, 0.0], &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].memory.text, "fact from bob");
    }

    #[tokio::test]
    async fn test_search_stable_tie_break_and_limit() {
        let store = store().await;
        for i in 0..5 {
            store
                .add(entry(&format!("tied-{}", i), Some(vec![1.0, 0.0])))
                .await
                .unwrap();
        }

        let options = SearchOptions {
            threshold: 0.9,
            limit: 3,
            ..Default::default()
        };
        let results = store.search(&[1.0, 0.0], &options).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.memory.text.as_str()).collect();
        // Equal scores keep insertion order; limit truncates after sorting.
        assert_eq!(texts, vec!["tied-0", "tied-1", "tied-2"]);
    }

    #[tokio::test]
    async fn test_emergency_pruning_keeps_most_recent() {
        let kv = InMemoryKvStorage::new();
        let storage: Arc<dyn KeyValueStorage> = Arc::new(kv.clone());
        let store = LocalMemoryStore::new(storage.clone(), "memories")
            .await
            .with_prune_target(500);

        // Fill 599 records with no quota, oldest first.
        let base = Utc::now() - Duration::days(1);
        for i in 0..599 {
            let mut memory = entry(&format!("m-{}", i), Some(vec![0.5, 0.5]));
            memory.metadata.timestamp = base + Duration::seconds(i);
            store.add(memory).await.unwrap();
        }

        // Impose a quota that fits ~550 records, then write the 600th: the
        // full list is rejected, pruning keeps the 500 most recent, and the
        // retried write succeeds.
        let blob = storage.get_item("memories").await.unwrap().unwrap();
        let per_record = blob.len() / 599;
        kv.set_max_value_bytes(Some(per_record * 550)).await;

        let mut last = entry("m-599", Some(vec![0.5, 0.5]));
        last.metadata.timestamp = base + Duration::seconds(599);
        store.add(last).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 500);
        // Exactly the 500 most recent (m-100 .. m-599) remain, in
        // chronological order.
        assert_eq!(all[0].text, "m-100");
        assert_eq!(all[499].text, "m-599");

        // The retried write landed.
        let blob = storage.get_item("memories").await.unwrap().unwrap();
        let persisted: Vec<Memory> = serde_json::from_str(&blob).unwrap();
        assert_eq!(persisted.len(), 500);
    }

    #[tokio::test]
    async fn test_prune_retry_failure_keeps_in_memory_state() {
        // Quota so small even the pruned list cannot be written: the add
        // still succeeds and in-memory state is the source of truth.
        let storage: Arc<dyn KeyValueStorage> =
            Arc::new(InMemoryKvStorage::new().with_max_value_bytes(10));
        let store = LocalMemoryStore::new(storage, "memories")
            .await
            .with_prune_target(500);

        store.add(entry("survives", Some(vec![1.0]))).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_rewrites_storage() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(InMemoryKvStorage::new());
        let store = LocalMemoryStore::new(storage.clone(), "memories").await;
        store.add(entry("gone soon", Some(vec![1.0]))).await.unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        let blob = storage.get_item("memories").await.unwrap().unwrap();
        assert_eq!(blob, "[]");
    }
}
