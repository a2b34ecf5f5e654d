//! # Key-Value Storage
//!
//! Namespaced durable storage used by the local memory store for its one
//! JSON blob. The interface is deliberately minimal (`get_item` /
//! `set_item` / `remove_item`) and must surface quota exhaustion as a
//! distinguishable error so the store can prune and retry.
//!
//! Two implementations are provided:
//!
//! - [`FileKvStorage`]: one file per key under a directory, survives restarts
//! - [`InMemoryKvStorage`]: HashMap-backed, for tests and ephemeral sessions
//!
//! Both accept an optional byte quota per value.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;

/// Namespaced durable key-value storage.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Reads the value stored under `key`. Returns `None` if absent.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` under `key`, replacing any previous value. Must return
    /// `StorageError::QuotaExceeded` when the store is out of space.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the value stored under `key`. Removing an absent key succeeds.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed key-value storage: one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileKvStorage {
    dir: PathBuf,
    max_value_bytes: Option<usize>,
}

impl FileKvStorage {
    /// Creates the storage, creating `dir` if needed.
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            max_value_bytes: None,
        })
    }

    /// Sets a per-value byte quota; writes above it fail with
    /// `QuotaExceeded`.
    pub fn with_max_value_bytes(mut self, max: usize) -> Self {
        self.max_value_bytes = Some(max);
        self
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are caller-controlled namespaces, not user input, but keep the
        // file name safe anyway.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl KeyValueStorage for FileKvStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(max) = self.max_value_bytes {
            if value.len() > max {
                return Err(StorageError::QuotaExceeded(format!(
                    "value is {} bytes, quota is {}",
                    value.len(),
                    max
                )));
            }
        }
        let path = self.path_for(key);
        tokio::fs::write(&path, value).await?;
        debug!(key, bytes = value.len(), "kv write");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory key-value storage for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKvStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
    max_value_bytes: Arc<RwLock<Option<usize>>>,
}

impl InMemoryKvStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a per-value byte quota; writes above it fail with
    /// `QuotaExceeded`. Tests use this to trigger emergency pruning.
    pub fn with_max_value_bytes(self, max: usize) -> Self {
        Self {
            entries: self.entries,
            max_value_bytes: Arc::new(RwLock::new(Some(max))),
        }
    }

    /// Changes the quota at runtime (clones share it), so tests can fill the
    /// store first and exhaust it afterwards.
    pub async fn set_max_value_bytes(&self, max: Option<usize>) {
        *self.max_value_bytes.write().await = max;
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStorage for InMemoryKvStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(max) = *self.max_value_bytes.read().await {
            if value.len() > max {
                return Err(StorageError::QuotaExceeded(format!(
                    "value is {} bytes, quota is {}",
                    value.len(),
                    max
                )));
            }
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileKvStorage::new(dir.path()).await.unwrap();

        assert!(storage.get_item("memories").await.unwrap().is_none());
        storage.set_item("memories", "[1,2,3]").await.unwrap();
        assert_eq!(
            storage.get_item("memories").await.unwrap().as_deref(),
            Some("[1,2,3]")
        );

        storage.remove_item("memories").await.unwrap();
        assert!(storage.get_item("memories").await.unwrap().is_none());
        // Removing an absent key succeeds.
        storage.remove_item("memories").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = FileKvStorage::new(dir.path()).await.unwrap();
            storage.set_item("blob", "persisted").await.unwrap();
        }
        let reopened = FileKvStorage::new(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get_item("blob").await.unwrap().as_deref(),
            Some("persisted")
        );
    }

    #[tokio::test]
    async fn test_file_storage_quota() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileKvStorage::new(dir.path())
            .await
            .unwrap()
            .with_max_value_bytes(8);

        storage.set_item("k", "small").await.unwrap();
        let err = storage.set_item("k", "way too large").await.unwrap_err();
        assert!(err.is_quota_exceeded());
        // Previous value is untouched by the rejected write.
        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("small"));
    }

    #[tokio::test]
    async fn test_in_memory_storage_quota() {
        let storage = InMemoryKvStorage::new().with_max_value_bytes(4);
        storage.set_item("k", "ok").await.unwrap();
        assert!(storage
            .set_item("k", "too long")
            .await
            .unwrap_err()
            .is_quota_exceeded());
    }

    #[tokio::test]
    async fn test_file_storage_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileKvStorage::new(dir.path()).await.unwrap();
        storage.set_item("ns/mem:main", "v").await.unwrap();
        assert_eq!(
            storage.get_item("ns/mem:main").await.unwrap().as_deref(),
            Some("v")
        );
    }
}
