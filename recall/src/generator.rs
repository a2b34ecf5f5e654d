//! # Embedding Generator
//!
//! Turns text into a fixed-length vector, whatever happens upstream.
//!
//! ## Fallback chain
//!
//! 1. Bounded cache, keyed by a polynomial string hash of the text
//! 2. Remote embedding service, when configured and the startup probe passed
//! 3. Deterministic local hash embedding - always succeeds
//!
//! Remote failures after startup are absorbed silently (logged) by step 3,
//! so `generate` never fails. The path taken is reported through
//! [`EmbeddingSource`] so callers and tests can assert which branch ran.
//!
//! The cache evicts its oldest entry (insertion order) once capacity is
//! exceeded.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use embedding::{EmbeddingService, EnvEmbeddingConfig};
use hash_embedding::HashEmbedding;
use openai_embedding::OpenAiEmbedding;

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Which path produced an embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingSource {
    /// Served from the bounded cache.
    Cache,
    /// Produced by the remote embedding service.
    Remote,
    /// Produced by the deterministic local vectorizer.
    LocalFallback,
}

/// Bounded insertion-order cache.
struct EmbeddingCache {
    capacity: usize,
    entries: HashMap<u64, Vec<f32>>,
    order: VecDeque<u64>,
}

impl EmbeddingCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: u64) -> Option<Vec<f32>> {
        self.entries.get(&key).cloned()
    }

    fn insert(&mut self, key: u64, vector: Vec<f32>) {
        if self.entries.insert(key, vector).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Simple polynomial string hash; cheap, not cryptographic.
fn cache_key(text: &str) -> u64 {
    text.bytes()
        .fold(0u64, |hash, byte| hash.wrapping_mul(31).wrapping_add(byte as u64))
}

/// Embedding generator with remote mode, local fallback, and a bounded cache.
pub struct EmbeddingGenerator {
    remote: Option<Arc<dyn EmbeddingService>>,
    local: HashEmbedding,
    cache: Mutex<EmbeddingCache>,
    remote_available: AtomicBool,
}

impl EmbeddingGenerator {
    /// Creates a generator. Pass `None` to run in local-only mode.
    pub fn new(remote: Option<Arc<dyn EmbeddingService>>) -> Self {
        Self::with_cache_capacity(remote, 1000)
    }

    /// Creates a generator with a custom cache capacity.
    pub fn with_cache_capacity(
        remote: Option<Arc<dyn EmbeddingService>>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            remote,
            local: HashEmbedding::new(),
            cache: Mutex::new(EmbeddingCache::new(cache_capacity)),
            remote_available: AtomicBool::new(false),
        }
    }

    /// Creates a generator from environment configuration. Remote mode is
    /// wired up only when the provider is `openai` and an API key is present;
    /// anything else yields a local-only generator.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = EnvEmbeddingConfig::from_env()?;
        config.validate()?;

        let remote: Option<Arc<dyn EmbeddingService>> = if config.remote_configured() {
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
            Some(Arc::new(OpenAiEmbedding::with_base_url(
                config.api_key.clone(),
                model,
                config.base_url.as_deref(),
            )))
        } else {
            None
        };
        Ok(Self::new(remote))
    }

    /// Probes the remote embedding service and returns whether remote mode is
    /// available. Without a remote service, or when the probe fails, the
    /// generator stays in local mode; this is a degradation, not an error.
    pub async fn initialize(&self) -> bool {
        let Some(remote) = &self.remote else {
            info!("no remote embedding service configured, using local vectorizer");
            self.remote_available.store(false, Ordering::SeqCst);
            return false;
        };

        match remote.embed("ping").await {
            Ok(vector) => {
                info!(dimension = vector.len(), "remote embedding service is reachable");
                self.remote_available.store(true, Ordering::SeqCst);
                true
            }
            Err(e) => {
                warn!(error = %e, "remote embedding probe failed, using local vectorizer");
                self.remote_available.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// True when the startup probe selected remote mode.
    pub fn is_remote(&self) -> bool {
        self.remote_available.load(Ordering::SeqCst)
    }

    /// Generates an embedding for `text`. Never fails: remote errors fall
    /// back to the deterministic local vectorizer.
    pub async fn generate(&self, text: &str) -> Vec<f32> {
        self.generate_with_source(text).await.0
    }

    /// Generates an embedding and reports which path produced it.
    pub async fn generate_with_source(&self, text: &str) -> (Vec<f32>, EmbeddingSource) {
        let key = cache_key(text);

        {
            let cache = self.cache.lock().await;
            if let Some(vector) = cache.get(key) {
                debug!(key, "embedding cache hit");
                return (vector, EmbeddingSource::Cache);
            }
        }

        if self.is_remote() {
            if let Some(remote) = &self.remote {
                match remote.embed(text).await {
                    Ok(vector) => {
                        self.cache.lock().await.insert(key, vector.clone());
                        return (vector, EmbeddingSource::Remote);
                    }
                    Err(e) => {
                        warn!(error = %e, "remote embedding failed, falling back to local vectorizer");
                    }
                }
            }
        }

        let vector = self.local.embed_text(text);
        self.cache.lock().await.insert(key, vector.clone());
        (vector, EmbeddingSource::LocalFallback)
    }

    /// Number of cached embeddings.
    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
