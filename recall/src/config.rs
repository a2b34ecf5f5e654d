//! Engine configuration.

/// Configuration for the memory engine.
///
/// All fields have working defaults; construct with struct-update syntax:
///
/// ```rust
/// use recall::EngineConfig;
///
/// let config = EngineConfig {
///     collection_name: "assistant_memories".to_string(),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name of the external vector-store collection.
    pub collection_name: String,
    /// Namespace key for the local fallback's persisted JSON blob.
    pub storage_key: String,
    /// Records kept by emergency pruning under quota pressure.
    pub prune_target: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collection_name: "memories".to_string(),
            storage_key: "recall_memories".to_string(),
            prune_target: 500,
        }
    }
}
