//! # Storage Backend Selector
//!
//! Selects the storage backend once at startup. When an external vector
//! database handle is supplied and its collection opens, the engine runs in
//! external mode; on any failure during that attempt, or when no handle is
//! supplied, it constructs the local fallback store instead. Selection never
//! fails: degraded startup beats no startup.

use std::sync::Arc;
use tracing::{info, warn};

use memory_core::MemoryBackend;
use memory_local::{KeyValueStorage, LocalMemoryStore};
use memory_vector::{VectorDatabase, VectorStoreBackend};

use crate::config::EngineConfig;

/// Backend selection state. Constructed unready; `initialize_database`
/// always leaves it ready with one backend active.
pub struct VectorMemoryManager {
    config: EngineConfig,
    backend: Option<Arc<dyn MemoryBackend>>,
    using_external: bool,
}

impl VectorMemoryManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            backend: None,
            using_external: false,
        }
    }

    /// Detects and opens the storage backend. Never fails: an external-store
    /// error falls back to the local store.
    pub async fn initialize_database(
        &mut self,
        external: Option<Arc<dyn VectorDatabase>>,
        storage: Arc<dyn KeyValueStorage>,
    ) {
        if let Some(db) = external {
            match VectorStoreBackend::open(db, self.config.collection_name.clone()).await {
                Ok(backend) => {
                    info!(collection = %self.config.collection_name, "using external vector store");
                    self.backend = Some(Arc::new(backend));
                    self.using_external = true;
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "external vector store unavailable, falling back to local store");
                }
            }
        }

        let store = LocalMemoryStore::new(storage, self.config.storage_key.clone())
            .await
            .with_prune_target(self.config.prune_target);
        info!(key = %self.config.storage_key, "using local fallback store");
        self.backend = Some(Arc::new(store));
        self.using_external = false;
    }

    /// True once a backend has been selected (either path).
    pub fn is_ready(&self) -> bool {
        self.backend.is_some()
    }

    /// True when the external vector store is active.
    pub fn using_external(&self) -> bool {
        self.using_external
    }

    /// The selected backend handle, if initialization has run.
    pub fn backend(&self) -> Option<Arc<dyn MemoryBackend>> {
        self.backend.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use memory_local::InMemoryKvStorage;
    use memory_vector::{InProcessVectorDb, VectorCollection};
    use std::collections::HashMap;

    /// External database stub whose collection never opens.
    struct BrokenDb;

    #[async_trait]
    impl VectorDatabase for BrokenDb {
        async fn get_or_create_collection(
            &self,
            _name: &str,
            _metadata: Option<HashMap<String, String>>,
        ) -> Result<Arc<dyn VectorCollection>, anyhow::Error> {
            anyhow::bail!("connection refused")
        }

        async fn delete_collection(&self, _name: &str) -> Result<(), anyhow::Error> {
            anyhow::bail!("connection refused")
        }
    }

    fn storage() -> Arc<dyn KeyValueStorage> {
        Arc::new(InMemoryKvStorage::new())
    }

    #[tokio::test]
    async fn test_selects_external_when_available() {
        let mut manager = VectorMemoryManager::new(EngineConfig::default());
        assert!(!manager.is_ready());

        manager
            .initialize_database(Some(Arc::new(InProcessVectorDb::new())), storage())
            .await;

        assert!(manager.is_ready());
        assert!(manager.using_external());
        assert_eq!(manager.backend().unwrap().name(), "external");
    }

    #[tokio::test]
    async fn test_falls_back_without_external_client() {
        let mut manager = VectorMemoryManager::new(EngineConfig::default());
        manager.initialize_database(None, storage()).await;

        assert!(manager.is_ready());
        assert!(!manager.using_external());
        assert_eq!(manager.backend().unwrap().name(), "local");
    }

    #[tokio::test]
    async fn test_external_failure_degrades_to_local() {
        let mut manager = VectorMemoryManager::new(EngineConfig::default());
        manager
            .initialize_database(Some(Arc::new(BrokenDb)), storage())
            .await;

        assert!(manager.is_ready());
        assert!(!manager.using_external());
        assert_eq!(manager.backend().unwrap().name(), "local");
    }
}
