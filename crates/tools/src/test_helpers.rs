//! Shared fixtures for tool tests: a small catalogue in an in-memory index.

use std::sync::Arc;

use async_trait::async_trait;
use shopagent_config::RetrievalConfig;
use shopagent_core::error::ProviderError;
use shopagent_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
};
use shopagent_retrieval::{InMemoryIndex, InMemoryPoint, Retriever};

/// Embeds every input as `vector`, or fails when `vector` is `None`.
pub struct StubEmbedder(pub Option<Vec<f32>>);

#[async_trait]
impl Provider for StubEmbedder {
    fn name(&self) -> &str {
        "stub_embedder"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::NotConfigured("stub_embedder".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let vector = self.0.clone().ok_or_else(|| ProviderError::Timeout("embedding".into()))?;
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|_| vector.clone()).collect(),
            model: request.model,
            usage: None,
        })
    }
}

async fn catalogue() -> InMemoryIndex {
    let index = InMemoryIndex::new();
    let items = [
        ("B01", vec![1.0, 0.0], "Wireless earphones with deep bass", 4.5),
        ("B02", vec![0.9, 0.1], "Sport earphones, sweat resistant", 4.0),
        ("B03", vec![0.7, 0.3], "Over-ear headphones", 4.2),
        ("B04", vec![0.5, 0.5], "Bluetooth speaker", 3.8),
        ("B05", vec![0.3, 0.7], "USB-C charging cable", 4.6),
        ("B06", vec![0.0, 1.0], "Garden hose", 3.1),
    ];
    for (id, vector, description, rating) in items {
        let payload = serde_json::json!({
            "parent_asin": id,
            "description": description,
            "average_rating": rating,
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
    for (id, text) in [("B01", "Great bass"), ("B02", "Fell out while running")] {
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

fn config() -> RetrievalConfig {
    RetrievalConfig {
        items_collection: "items".into(),
        reviews_collection: "reviews".into(),
        ..RetrievalConfig::default()
    }
}

pub async fn retriever() -> Retriever {
    Retriever::new(
        Arc::new(StubEmbedder(Some(vec![1.0, 0.0]))),
        Arc::new(catalogue().await),
        config(),
    )
}

pub async fn failing_retriever() -> Retriever {
    Retriever::new(Arc::new(StubEmbedder(None)), Arc::new(catalogue().await), config())
}
