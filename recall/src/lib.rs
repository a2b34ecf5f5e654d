//! # Recall
//!
//! Semantic memory engine: converts free-text utterances into vector
//! embeddings, persists them with structured metadata, and answers
//! similarity and attribute queries over the accumulated history.
//!
//! ## Architecture
//!
//! - [`EmbeddingGenerator`] - remote embedding with a deterministic local
//!   fallback and a bounded cache; embedding never fails outright
//! - [`VectorMemoryManager`] - selects the storage backend once at startup:
//!   an external vector database when one is supplied, otherwise the local
//!   brute-force store; selection failures degrade, they never abort startup
//! - [`RagMemoryManager`] - the engine facade: add, retrieve, format, update,
//!   delete, clear; raises [`MemoryError::NotReady`] before `initialize()`
//! - [`EnhancedRagMemoryManager`] - analytics layered on `get_all_memories`:
//!   type partitions, speaker stats, date ranges and day buckets, tag search,
//!   recency-boosted re-ranking
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use memory_local::InMemoryKvStorage;
//! use recall::{EmbeddingGenerator, EngineConfig, MemoryType, RagMemoryManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = Arc::new(EmbeddingGenerator::new(None));
//!     let storage = Arc::new(InMemoryKvStorage::new());
//!     let engine = RagMemoryManager::new(generator, None, storage, EngineConfig::default());
//!     engine.initialize().await?;
//!
//!     engine
//!         .add_memory("Meeting at 3pm", "user", MemoryType::Note, "NIRVANA", 5, HashMap::new())
//!         .await?;
//!     let results = engine
//!         .retrieve_relevant_memories("meeting", Default::default())
//!         .await?;
//!     println!("{}", engine.format_memories_for_context(&results));
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod config;
pub mod engine;
pub mod generator;
pub mod manager;

pub use analytics::{EnhancedRagMemoryManager, ListOptions, SpeakerStats, TimeBoostOptions};
pub use config::EngineConfig;
pub use engine::{RagMemoryManager, StorageInfo};
pub use generator::{EmbeddingGenerator, EmbeddingSource};
pub use manager::VectorMemoryManager;

pub use memory_core::{
    Memory, MemoryBackend, MemoryError, MemoryMetadata, MemoryType, ScoredMemory, SearchOptions,
};
