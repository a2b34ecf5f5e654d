//! # Hash Embedding Service
//!
//! Deterministic local implementation of the `EmbeddingService` trait.
//!
//! This is NOT a semantic embedding. It exists so the memory engine can keep
//! working when no remote embedding service is reachable: every input gets a
//! reproducible fixed-length vector, and similarity scores derived from these
//! vectors must be treated as lower quality than real semantic embeddings.
//!
//! ## Guarantees
//!
//! - `embed` never fails
//! - Identical text produces a bit-identical vector, on every call and across
//!   process restarts (no randomness, no time seeding)
//! - Output is L2-normalized (self-similarity is 1.0 up to float tolerance)

use async_trait::async_trait;
use embedding::EmbeddingService;

/// Dimensionality of the deterministic fallback vectors.
pub const EMBEDDING_DIM: usize = 768;

/// Deterministic hash-based embedding service.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dim: usize,
}

impl HashEmbedding {
    /// Creates a hash embedder with the default 768-dim output.
    pub fn new() -> Self {
        Self { dim: EMBEDDING_DIM }
    }

    /// Creates a hash embedder with a custom dimensionality (tests use small
    /// dims to keep fixtures readable).
    pub fn with_dim(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Returns the output dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Vectorizes text deterministically.
    ///
    /// Accumulates a per-character weighted hash and a per-word weighted hash
    /// into the vector, then L2-normalizes. Character contributions decay
    /// slowly with position so long texts do not drown out their prefix; word
    /// hashes land on a single component each so shared words between two
    /// texts still produce overlap.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];

        for (i, ch) in text.chars().enumerate() {
            let code = ch as u32 as u64;
            let index = (code
                .wrapping_mul(31)
                .wrapping_add((i as u64).wrapping_mul(7))
                % self.dim as u64) as usize;
            let weight = ((code % 97) as f32 / 97.0) / (1.0 + i as f32 * 0.01);
            vector[index] += weight;
        }

        for (w, word) in text.split_whitespace().enumerate() {
            let mut hash: u64 = 0;
            for ch in word.chars() {
                hash = hash.wrapping_mul(31).wrapping_add(ch as u32 as u64);
            }
            let index = (hash % self.dim as u64) as usize;
            let weight = (0.5 + (hash % 1000) as f32 / 2000.0) / (1.0 + w as f32 * 0.05);
            vector[index] += weight;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        vector
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for HashEmbedding {
    /// Generates a deterministic embedding. Never fails.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        Ok(self.embed_text(text))
    }

    /// Generates deterministic embeddings for every input. Never fails.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 {
            return 0.0;
        }
        dot / (na * nb)
    }

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedding::new();
        let a = embedder.embed_text("The quick brown fox");
        let b = embedder.embed_text("The quick brown fox");
        assert_eq!(a, b);
    }

    #[test]
    fn test_dimension() {
        let embedder = HashEmbedding::new();
        assert_eq!(embedder.embed_text("hello").len(), EMBEDDING_DIM);
        let small = HashEmbedding::with_dim(16);
        assert_eq!(small.embed_text("hello").len(), 16);
    }

    #[test]
    fn test_normalized() {
        let embedder = HashEmbedding::new();
        let v = embedder.embed_text("some text to embed");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedding::new();
        let v = embedder.embed_text("");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_self_similarity_is_one() {
        let embedder = HashEmbedding::new();
        let v = embedder.embed_text("Meeting at 3pm");
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_increase_similarity() {
        let embedder = HashEmbedding::new();
        let a = embedder.embed_text("I love hiking in the mountains");
        let b = embedder.embed_text("I love hiking near the lake");
        let c = embedder.embed_text("quarterly revenue projections spreadsheet");
        assert!(cosine(&a, &b) > cosine(&a, &c));
    }

    #[tokio::test]
    async fn test_embed_never_fails() {
        let embedder = HashEmbedding::new();
        assert!(embedder.embed("anything").await.is_ok());
        assert!(embedder.embed("").await.is_ok());
        let batch = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
    }
}
