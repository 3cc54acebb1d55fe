//! In-memory index: useful for testing and offline demos.
//!
//! Dense prefetches rank by cosine similarity, document prefetches by keyword
//! overlap with each point's text, and the lists are fused with RRF just like
//! the Qdrant query API does.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use shopagent_core::error::RetrievalError;
use tokio::sync::RwLock;

use crate::index::{Payload, PrefetchQuery, ScoredPoint, SearchRequest, VectorIndex};
use crate::vector::{RRF_K, cosine_similarity, reciprocal_rank_fusion};

/// A stored point.
#[derive(Debug, Clone)]
pub struct InMemoryPoint {
    pub id: String,
    pub vector: Vec<f32>,
    /// Text searched by document (keyword) prefetches
    pub text: String,
    pub payload: Payload,
}

/// An index that keeps every collection in a `Vec`.
#[derive(Default, Clone)]
pub struct InMemoryIndex {
    collections: Arc<RwLock<HashMap<String, Vec<InMemoryPoint>>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, collection: &str, point: InMemoryPoint) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(point);
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |points| points.len())
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn to_scored(point: &InMemoryPoint, score: f32) -> ScoredPoint {
    ScoredPoint {
        id: serde_json::Value::String(point.id.clone()),
        score,
        payload: point.payload.clone(),
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredPoint>, RetrievalError> {
        let collections = self.collections.read().await;
        let Some(points) = collections.get(&request.collection) else {
            return Err(RetrievalError::Index {
                status_code: 404,
                message: format!("Collection `{}` doesn't exist", request.collection),
            });
        };

        let mut lists = Vec::with_capacity(request.prefetch.len());
        for prefetch in &request.prefetch {
            let candidates = points
                .iter()
                .filter(|p| prefetch.filter.as_ref().is_none_or(|f| f.matches(&p.payload)));

            let mut scored: Vec<ScoredPoint> = match &prefetch.query {
                PrefetchQuery::Dense(query) => candidates
                    .map(|p| to_scored(p, cosine_similarity(&p.vector, query)))
                    .collect(),
                PrefetchQuery::Document { text, .. } => {
                    let query_tokens = tokens(text);
                    candidates
                        .filter_map(|p| {
                            let overlap = tokens(&p.text).intersection(&query_tokens).count();
                            (overlap > 0).then(|| to_scored(p, overlap as f32))
                        })
                        .collect()
                }
            };

            scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(prefetch.limit);
            lists.push(scored);
        }

        Ok(reciprocal_rank_fusion(&lists, RRF_K, request.limit))
    }

    async fn lookup_item(
        &self,
        collection: &str,
        parent_asin: &str,
    ) -> Result<Option<Payload>, RetrievalError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|points| {
            points
                .iter()
                .find(|p| p.payload.get("parent_asin").and_then(|v| v.as_str()) == Some(parent_asin))
                .map(|p| p.payload.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Filter, Prefetch};

    fn item(id: &str, vector: Vec<f32>, description: &str) -> InMemoryPoint {
        let payload = serde_json::json!({
            "parent_asin": id,
            "description": description,
            "average_rating": 4.5,
        });
        InMemoryPoint {
            id: id.to_string(),
            vector,
            text: description.to_string(),
            payload: payload.as_object().cloned().unwrap(),
        }
    }

    async fn seeded() -> InMemoryIndex {
        let index = InMemoryIndex::new();
        index.insert("items", item("B01", vec![1.0, 0.0], "Wireless earphones with case")).await;
        index.insert("items", item("B02", vec![0.0, 1.0], "Garden hose 50ft")).await;
        index.insert("items", item("B03", vec![0.7, 0.7], "Over-ear headphones")).await;
        index
    }

    fn dense(vector: Vec<f32>, limit: usize) -> Prefetch {
        Prefetch {
            query: PrefetchQuery::Dense(vector),
            using: None,
            limit,
            filter: None,
        }
    }

    #[tokio::test]
    async fn dense_search_ranks_by_similarity() {
        let index = seeded().await;
        let request = SearchRequest {
            collection: "items".into(),
            prefetch: vec![dense(vec![1.0, 0.0], 20)],
            limit: 2,
        };
        let results = index.search(&request).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].payload_str("parent_asin"), Some("B01"));
        assert_eq!(results[1].payload_str("parent_asin"), Some("B03"));
    }

    #[tokio::test]
    async fn hybrid_search_fuses_keyword_hits() {
        let index = seeded().await;
        let request = SearchRequest {
            collection: "items".into(),
            prefetch: vec![
                dense(vec![0.0, 1.0], 20),
                Prefetch {
                    query: PrefetchQuery::Document {
                        text: "headphones".into(),
                        model: "qdrant/bm25".into(),
                    },
                    using: Some("bm25".into()),
                    limit: 20,
                    filter: None,
                },
            ],
            limit: 3,
        };
        let results = index.search(&request).await.unwrap();
        // B03 is second in the dense list and first in the keyword list
        assert_eq!(results[0].payload_str("parent_asin"), Some("B03"));
    }

    #[tokio::test]
    async fn prefetch_filter_restricts_candidates() {
        let index = seeded().await;
        let mut prefetch = dense(vec![1.0, 0.0], 20);
        prefetch.filter = Some(Filter::field_in("parent_asin", vec!["B02".into()]));
        let request = SearchRequest {
            collection: "items".into(),
            prefetch: vec![prefetch],
            limit: 5,
        };
        let results = index.search(&request).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].payload_str("parent_asin"), Some("B02"));
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let index = InMemoryIndex::new();
        let request = SearchRequest {
            collection: "nope".into(),
            prefetch: vec![dense(vec![1.0], 5)],
            limit: 5,
        };
        let err = index.search(&request).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Index { status_code: 404, .. }));
    }

    #[tokio::test]
    async fn lookup_by_parent_asin() {
        let index = seeded().await;
        let payload = index.lookup_item("items", "B02").await.unwrap().unwrap();
        assert_eq!(payload["description"], "Garden hose 50ft");
        assert!(index.lookup_item("items", "B99").await.unwrap().is_none());
        assert_eq!(index.count("items").await, 3);
    }
}
