//! # OpenAI Embedding Service
//!
//! Remote implementation of the `EmbeddingService` trait over an
//! OpenAI-compatible embeddings API.
//!
//! The memory engine treats this service as best-effort: any failure here
//! (timeout, API error, malformed response) is absorbed by the caller's
//! deterministic local fallback, so errors are returned rather than retried.
//!
//! ## Example
//!
//! ```rust,no_run
//! use openai_embedding::OpenAiEmbedding;
//!
//! // Key may be empty, in which case OPENAI_API_KEY is read from the env.
//! let service = OpenAiEmbedding::new("sk-...".to_string(), "text-embedding-3-small".to_string());
//! ```

use async_openai::{types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use embedding::EmbeddingService;
use tracing::{debug, info, instrument, warn};

/// Timeout for a single embed request (connect + request + response).
const EMBED_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
/// Timeout for a batch request (larger payload).
const EMBED_BATCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Remote embedding service over an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    client: Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAiEmbedding {
    /// Creates a new remote embedding service.
    ///
    /// # Arguments
    ///
    /// * `api_key` - API key; if empty, `OPENAI_API_KEY` is read from the environment.
    /// * `model` - Embedding model name (e.g. "text-embedding-3-small").
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, None)
    }

    /// Creates a new remote embedding service pointed at a custom base URL
    /// (for OpenAI-compatible endpoints).
    pub fn with_base_url(api_key: String, model: String, base_url: Option<&str>) -> Self {
        let api_key = if api_key.is_empty() {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        } else {
            api_key
        };

        let mut config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url.filter(|s| !s.is_empty()) {
            config = config.with_api_base(url);
        }

        Self {
            client: Client::with_config(config),
            model,
        }
    }

    /// Returns the embedding model name (for diagnostics).
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedding {
    /// Generates an embedding vector for a single text string.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is invalid, the request fails or times
    /// out, or the response carries no embedding data.
    #[instrument(skip(self, text), fields(model = %self.model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        info!(model = %self.model, text_len = text.len(), "step: remote embed request");

        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(vec![text])
            .build()?;

        let embeddings = self.client.embeddings();
        let response = match tokio::time::timeout(EMBED_TIMEOUT, embeddings.create(request)).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                warn!(error = %e, "remote embed request failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(timeout_secs = EMBED_TIMEOUT.as_secs(), "remote embed request timed out");
                return Err(anyhow::anyhow!(
                    "embed request timed out after {} seconds",
                    EMBED_TIMEOUT.as_secs()
                ));
            }
        };

        let embedding = match response.data.into_iter().next() {
            Some(item) => item.embedding,
            None => {
                warn!("remote embed response has no embedding data");
                return Err(anyhow::anyhow!("no embedding in response"));
            }
        };

        debug!(dimension = embedding.len(), "step: remote embed done");
        Ok(embedding)
    }

    /// Generates embedding vectors for multiple texts in a single API call.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response carries fewer
    /// embeddings than inputs.
    #[instrument(skip(self, texts), fields(model = %self.model, batch_size = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        if texts.is_empty() {
            debug!("remote embed_batch empty input, skipping");
            return Ok(vec![]);
        }

        info!(model = %self.model, batch_size = texts.len(), "step: remote embed_batch request");

        let inputs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(inputs)
            .build()?;

        let embeddings = self.client.embeddings();
        let response =
            match tokio::time::timeout(EMBED_BATCH_TIMEOUT, embeddings.create(request)).await {
                Ok(Ok(r)) => r,
                Ok(Err(e)) => {
                    warn!(error = %e, "remote embed_batch request failed");
                    return Err(e.into());
                }
                Err(_) => {
                    warn!(
                        timeout_secs = EMBED_BATCH_TIMEOUT.as_secs(),
                        "remote embed_batch request timed out"
                    );
                    return Err(anyhow::anyhow!(
                        "embed_batch request timed out after {} seconds",
                        EMBED_BATCH_TIMEOUT.as_secs()
                    ));
                }
            };

        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|item| item.embedding).collect();

        if vectors.len() != texts.len() {
            warn!(
                expected = texts.len(),
                got = vectors.len(),
                "remote embed_batch response count mismatch"
            );
            return Err(anyhow::anyhow!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            ));
        }

        debug!(count = vectors.len(), "step: remote embed_batch done");
        Ok(vectors)
    }
}
