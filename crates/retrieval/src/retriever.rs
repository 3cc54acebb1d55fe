//! The retrieval pipeline: embed the query, hybrid search, optional rerank.

use std::sync::Arc;

use shopagent_config::RetrievalConfig;
use shopagent_core::error::RetrievalError;
use shopagent_core::provider::{EmbeddingRequest, Provider};
use tracing::{debug, info, warn};

use crate::context::{RetrievedItem, RetrievedReview};
use crate::index::{Filter, Prefetch, PrefetchQuery, SearchRequest, VectorIndex};
use crate::qdrant::QdrantIndex;
use crate::rerank::{CohereReranker, RerankDocument, Reranker};

/// Sparse vector name in the items collection.
pub const BM25_VECTOR: &str = "bm25";
/// Qdrant document inference model for the sparse vector.
pub const BM25_MODEL: &str = "qdrant/bm25";

/// Stateless across calls; shared behind `Arc` by the tools.
pub struct Retriever {
    embedder: Arc<dyn Provider>,
    index: Arc<dyn VectorIndex>,
    reranker: Option<Arc<dyn Reranker>>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Provider>,
        index: Arc<dyn VectorIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            reranker: None,
            config,
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Qdrant-backed retriever, with Cohere reranking when enabled and keyed.
    pub fn from_config(config: &RetrievalConfig, embedder: Arc<dyn Provider>) -> Self {
        let index = QdrantIndex::new(&config.qdrant_url).with_api_key(config.qdrant_api_key.clone());
        let mut retriever = Self::new(embedder, Arc::new(index), config.clone());

        if config.enable_reranking {
            match &config.cohere_api_key {
                Some(key) => {
                    retriever = retriever.with_reranker(Arc::new(CohereReranker::new(
                        &config.cohere_url,
                        key,
                        &config.reranking_model,
                    )));
                }
                None => warn!("Reranking enabled but CO_API_KEY is not set; results will not be reranked"),
            }
        }

        retriever
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .embedder
            .embed(EmbeddingRequest {
                model: self.config.embedding_model.clone(),
                inputs: vec![query.to_string()],
            })
            .await?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RetrievalError::EmbeddingFailed("Empty embedding returned".into()))
    }

    /// Top `top_k` catalogue items for `query`.
    pub async fn retrieve_items(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedItem>, RetrievalError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embed_query(query).await?;
        let request = SearchRequest {
            collection: self.config.items_collection.clone(),
            prefetch: vec![
                Prefetch {
                    query: PrefetchQuery::Dense(embedding),
                    using: Some(self.config.embedding_model.clone()),
                    limit: self.config.prefetch_limit,
                    filter: None,
                },
                Prefetch {
                    query: PrefetchQuery::Document {
                        text: query.to_string(),
                        model: BM25_MODEL.to_string(),
                    },
                    using: Some(BM25_VECTOR.to_string()),
                    limit: self.config.prefetch_limit,
                    filter: None,
                },
            ],
            limit: top_k,
        };

        let points = self.index.search(&request).await?;
        let items: Vec<RetrievedItem> = points.iter().filter_map(RetrievedItem::from_point).collect();
        info!(query, top_k, found = items.len(), "Retrieved items");

        match &self.reranker {
            Some(reranker) => Ok(self.rerank(reranker.as_ref(), query, items, top_k).await),
            None => Ok(items),
        }
    }

    /// Reorder items by reranker relevance. A failing reranker leaves the fused order.
    async fn rerank(
        &self,
        reranker: &dyn Reranker,
        query: &str,
        items: Vec<RetrievedItem>,
        top_k: usize,
    ) -> Vec<RetrievedItem> {
        let documents = items
            .iter()
            .enumerate()
            .map(|(i, item)| RerankDocument {
                id: i.to_string(),
                text: item.description.clone(),
            })
            .collect();

        match reranker.rerank(query, documents, top_k).await {
            Ok(results) => {
                debug!(model = reranker.model_name(), results = results.len(), "Reranked items");
                results
                    .into_iter()
                    .filter_map(|r| items.get(r.index).cloned())
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "Reranking failed, keeping fused order");
                items
            }
        }
    }

    /// Top `top_k` reviews of the items in `item_list` relevant to `query`.
    pub async fn retrieve_reviews(
        &self,
        query: &str,
        item_list: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievedReview>, RetrievalError> {
        if top_k == 0 || item_list.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embed_query(query).await?;
        let request = SearchRequest {
            collection: self.config.reviews_collection.clone(),
            prefetch: vec![Prefetch {
                query: PrefetchQuery::Dense(embedding),
                using: None,
                limit: self.config.prefetch_limit,
                filter: Some(Filter::field_in("parent_asin", item_list.to_vec())),
            }],
            limit: top_k,
        };

        let points = self.index.search(&request).await?;
        let reviews: Vec<RetrievedReview> =
            points.iter().filter_map(RetrievedReview::from_point).collect();
        info!(query, items = item_list.len(), found = reviews.len(), "Retrieved reviews");
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::{InMemoryIndex, InMemoryPoint};
    use crate::test_helpers::{FixedEmbedder, items_config};
    use async_trait::async_trait;
    use crate::rerank::RerankResult;

    async fn index() -> InMemoryIndex {
        let index = InMemoryIndex::new();
        let rows = [
            ("B01", vec![1.0, 0.0], "Wireless earphones", 4.5),
            ("B02", vec![0.9, 0.1], "Noise cancelling earphones", 4.1),
            ("B03", vec![0.0, 1.0], "Garden hose", 3.9),
        ];
        for (id, vector, description, rating) in rows {
            let payload = serde_json::json!({
                "parent_asin": id, "description": description, "average_rating": rating
            });
            index
                .insert(
                    "items",
                    InMemoryPoint {
                        id: id.into(),
                        vector,
                        text: description.into(),
                        payload: payload.as_object().cloned().unwrap(),
                    },
                )
                .await;
        }
        for (id, text) in [("B01", "Great bass"), ("B03", "Leaks"), ("B02", "Comfortable")] {
            let payload = serde_json::json!({"parent_asin": id, "text": text});
            index
                .insert(
                    "reviews",
                    InMemoryPoint {
                        id: format!("r-{id}"),
                        vector: vec![1.0, 0.0],
                        text: text.into(),
                        payload: payload.as_object().cloned().unwrap(),
                    },
                )
                .await;
        }
        index
    }

    async fn retriever() -> Retriever {
        Retriever::new(
            Arc::new(FixedEmbedder::new(vec![1.0, 0.0])),
            Arc::new(index().await),
            items_config(),
        )
    }

    struct Reverse;

    #[async_trait]
    impl Reranker for Reverse {
        async fn rerank(
            &self,
            _query: &str,
            documents: Vec<RerankDocument>,
            top_n: usize,
        ) -> Result<Vec<RerankResult>, RetrievalError> {
            Ok(documents
                .iter()
                .enumerate()
                .rev()
                .take(top_n)
                .map(|(i, d)| RerankResult {
                    id: d.id.clone(),
                    score: 1.0,
                    index: i,
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "reverse"
        }
    }

    struct Broken;

    #[async_trait]
    impl Reranker for Broken {
        async fn rerank(
            &self,
            _query: &str,
            _documents: Vec<RerankDocument>,
            _top_n: usize,
        ) -> Result<Vec<RerankResult>, RetrievalError> {
            Err(RetrievalError::RerankFailed("down".into()))
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn retrieves_items_by_hybrid_search() {
        let items = retriever().await.retrieve_items("earphones", 2).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["B01", "B02"]);
        assert_eq!(items[0].average_rating, Some(4.5));
    }

    #[tokio::test]
    async fn zero_top_k_short_circuits() {
        assert!(retriever().await.retrieve_items("earphones", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reranker_reorders_results() {
        let retriever = retriever().await.with_reranker(Arc::new(Reverse));
        let items = retriever.retrieve_items("earphones", 2).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["B02", "B01"]);
    }

    #[tokio::test]
    async fn failing_reranker_keeps_fused_order() {
        let retriever = retriever().await.with_reranker(Arc::new(Broken));
        let items = retriever.retrieve_items("earphones", 2).await.unwrap();
        assert_eq!(items[0].id, "B01");
    }

    #[tokio::test]
    async fn reviews_are_filtered_to_item_list() {
        let reviews = retriever()
            .await
            .retrieve_reviews("sound", &["B01".into(), "B02".into()], 5)
            .await
            .unwrap();
        assert_eq!(reviews.len(), 2);
        assert!(reviews.iter().all(|r| r.id != "B03"));
    }

    #[tokio::test]
    async fn empty_item_list_returns_no_reviews() {
        let reviews = retriever().await.retrieve_reviews("sound", &[], 5).await.unwrap();
        assert!(reviews.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_is_reported() {
        let retriever = Retriever::new(
            Arc::new(FixedEmbedder::failing()),
            Arc::new(index().await),
            items_config(),
        );
        let err = retriever.retrieve_items("earphones", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::EmbeddingFailed(_)));
    }
}
