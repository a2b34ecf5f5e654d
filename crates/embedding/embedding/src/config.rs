//! Embedding configuration loaded from environment variables.

use anyhow::Result;
use std::env;

/// Embedding config loaded from environment variables.
///
/// `EMBEDDING_PROVIDER` selects `openai` (remote, OpenAI-compatible) or
/// `local` (deterministic hash embedding only). Remote mode additionally
/// reads `OPENAI_API_KEY`, optional `OPENAI_BASE_URL`, and optional
/// `EMBEDDING_MODEL`.
#[derive(Debug, Clone)]
pub struct EnvEmbeddingConfig {
    pub provider: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl EnvEmbeddingConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self> {
        let provider = env::var("EMBEDDING_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let base_url = env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let model = env::var("EMBEDDING_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        Ok(Self {
            provider,
            api_key,
            base_url,
            model,
        })
    }

    /// Validate config. An unknown provider is an error; a missing API key is
    /// not, since the engine degrades to the local embedder.
    pub fn validate(&self) -> Result<()> {
        if !self.provider.eq_ignore_ascii_case("openai")
            && !self.provider.eq_ignore_ascii_case("local")
        {
            anyhow::bail!(
                "EMBEDDING_PROVIDER must be 'openai' or 'local', got '{}'",
                self.provider
            );
        }
        Ok(())
    }

    /// True when the config describes a usable remote embedding service.
    pub fn remote_configured(&self) -> bool {
        self.provider.eq_ignore_ascii_case("openai") && !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let config = EnvEmbeddingConfig {
            provider: "cohere".to_string(),
            api_key: String::new(),
            base_url: None,
            model: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_remote_configured_requires_key() {
        let mut config = EnvEmbeddingConfig {
            provider: "openai".to_string(),
            api_key: String::new(),
            base_url: None,
            model: None,
        };
        assert!(!config.remote_configured());
        config.api_key = "sk-test".to_string();
        assert!(config.remote_configured());
        config.provider = "local".to_string();
        assert!(!config.remote_configured());
    }
}
