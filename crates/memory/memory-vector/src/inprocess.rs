//! # In-Process Vector Database
//!
//! Brute-force reference implementation of the client traits, for testing
//! and development. Query scans every record, scores by cosine similarity,
//! and reports `distance = 1 - similarity`; the stable sort means equal
//! distances keep insertion order, matching the local fallback's tie-break.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::client::{GetResult, QueryResult, VectorCollection, VectorDatabase};

#[derive(Debug, Clone)]
struct VectorRecord {
    id: String,
    document: String,
    embedding: Vec<f32>,
    metadata: serde_json::Value,
}

/// One in-process collection.
#[derive(Default)]
pub struct InProcessCollection {
    records: RwLock<Vec<VectorRecord>>,
}

impl InProcessCollection {
    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 1.0;
        }
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        1.0 - dot / (norm_a * norm_b)
    }

    fn matches(metadata: &serde_json::Value, filter: &HashMap<String, String>) -> bool {
        filter.iter().all(|(key, expected)| {
            match metadata.get(key) {
                Some(serde_json::Value::String(s)) => s == expected,
                Some(other) => &other.to_string() == expected,
                None => false,
            }
        })
    }
}

#[async_trait]
impl VectorCollection for InProcessCollection {
    async fn add(
        &self,
        ids: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        documents: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if ids.len() != embeddings.len()
            || ids.len() != documents.len()
            || ids.len() != metadatas.len()
        {
            anyhow::bail!(
                "add arity mismatch: {} ids, {} embeddings, {} documents, {} metadatas",
                ids.len(),
                embeddings.len(),
                documents.len(),
                metadatas.len()
            );
        }

        let mut records = self.records.write().await;
        for (((id, embedding), document), metadata) in ids
            .into_iter()
            .zip(embeddings)
            .zip(documents)
            .zip(metadatas)
        {
            records.push(VectorRecord {
                id,
                document,
                embedding,
                metadata,
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        n_results: usize,
        where_filter: Option<&HashMap<String, String>>,
    ) -> Result<QueryResult, anyhow::Error> {
        let records = self.records.read().await;

        let mut scored: Vec<(f32, &VectorRecord)> = records
            .iter()
            .filter(|r| where_filter.map_or(true, |f| Self::matches(&r.metadata, f)))
            .map(|r| (Self::cosine_distance(query_embedding, &r.embedding), r))
            .collect();

        // Stable: equal distances keep insertion order.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n_results);

        let mut result = QueryResult::default();
        for (distance, record) in scored {
            result.ids.push(record.id.clone());
            result.documents.push(record.document.clone());
            result.metadatas.push(record.metadata.clone());
            result.distances.push(distance);
        }
        Ok(result)
    }

    async fn get(&self, limit: Option<usize>) -> Result<GetResult, anyhow::Error> {
        let records = self.records.read().await;
        let take = limit.unwrap_or(records.len());

        let mut result = GetResult::default();
        for record in records.iter().take(take) {
            result.ids.push(record.id.clone());
            result.documents.push(record.document.clone());
            result.metadatas.push(record.metadata.clone());
        }
        Ok(result)
    }

    async fn delete(&self, ids: Vec<String>) -> Result<(), anyhow::Error> {
        let mut records = self.records.write().await;
        records.retain(|r| !ids.contains(&r.id));
        Ok(())
    }

    async fn count(&self) -> Result<usize, anyhow::Error> {
        Ok(self.records.read().await.len())
    }
}

/// In-process vector database holding named collections.
#[derive(Default)]
pub struct InProcessVectorDb {
    collections: RwLock<HashMap<String, Arc<InProcessCollection>>>,
}

impl InProcessVectorDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorDatabase for InProcessVectorDb {
    async fn get_or_create_collection(
        &self,
        name: &str,
        _metadata: Option<HashMap<String, String>>,
    ) -> Result<Arc<dyn VectorCollection>, anyhow::Error> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InProcessCollection::default()))
            .clone();
        Ok(collection)
    }

    async fn delete_collection(&self, name: &str) -> Result<(), anyhow::Error> {
        self.collections.write().await.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collection() -> Arc<dyn VectorCollection> {
        let db = InProcessVectorDb::new();
        db.get_or_create_collection("test", None).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_and_query_orders_by_distance() {
        let collection = collection().await;
        collection
            .add(
                vec!["a".into(), "b".into(), "c".into()],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]],
                vec!["exact".into(), "orthogonal".into(), "close".into()],
                vec![
                    serde_json::json!({"speaker": "user"}),
                    serde_json::json!({"speaker": "user"}),
                    serde_json::json!({"speaker": "user"}),
                ],
            )
            .await
            .unwrap();

        let result = collection.query(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(result.ids, vec!["a", "c"]);
        assert!(result.distances[0] < result.distances[1]);
    }

    #[tokio::test]
    async fn test_query_where_filter() {
        let collection = collection().await;
        collection
            .add(
                vec!["a".into(), "b".into()],
                vec![vec![1.0, 0.0], vec![1.0, 0.0]],
                vec!["from alice".into(), "from bob".into()],
                vec![
                    serde_json::json!({"speaker": "alice", "type": "note"}),
                    serde_json::json!({"speaker": "bob", "type": "note"}),
                ],
            )
            .await
            .unwrap();

        let mut filter = HashMap::new();
        filter.insert("speaker".to_string(), "bob".to_string());
        let result = collection.query(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(result.ids, vec!["b"]);
    }

    #[tokio::test]
    async fn test_get_preserves_insertion_order() {
        let collection = collection().await;
        collection
            .add(
                vec!["first".into(), "second".into()],
                vec![vec![1.0], vec![0.5]],
                vec!["one".into(), "two".into()],
                vec![serde_json::json!({}), serde_json::json!({})],
            )
            .await
            .unwrap();

        let all = collection.get(None).await.unwrap();
        assert_eq!(all.ids, vec!["first", "second"]);
        let limited = collection.get(Some(1)).await.unwrap();
        assert_eq!(limited.ids, vec!["first"]);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let collection = collection().await;
        collection
            .add(
                vec!["a".into(), "b".into()],
                vec![vec![1.0], vec![0.5]],
                vec!["one".into(), "two".into()],
                vec![serde_json::json!({}), serde_json::json!({})],
            )
            .await
            .unwrap();

        assert_eq!(collection.count().await.unwrap(), 2);
        collection.delete(vec!["a".into(), "ghost".into()]).await.unwrap();
        assert_eq!(collection.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_collection_drops_records() {
        let db = InProcessVectorDb::new();
        let collection = db.get_or_create_collection("mem", None).await.unwrap();
        collection
            .add(
                vec!["a".into()],
                vec![vec![1.0]],
                vec!["doc".into()],
                vec![serde_json::json!({})],
            )
            .await
            .unwrap();

        db.delete_collection("mem").await.unwrap();
        let recreated = db.get_or_create_collection("mem", None).await.unwrap();
        assert_eq!(recreated.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_arity_mismatch_is_error() {
        let collection = collection().await;
        let err = collection
            .add(vec!["a".into()], vec![], vec!["doc".into()], vec![])
            .await;
        assert!(err.is_err());
    }
}
