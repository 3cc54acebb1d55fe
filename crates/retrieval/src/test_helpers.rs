//! Shared test helpers for retrieval tests.

use async_trait::async_trait;
use shopagent_config::RetrievalConfig;
use shopagent_core::error::ProviderError;
use shopagent_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
};

/// An embedder that returns the same vector for every input.
pub struct FixedEmbedder {
    vector: Option<Vec<f32>>,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
        }
    }

    pub fn failing() -> Self {
        Self { vector: None }
    }
}

#[async_trait]
impl Provider for FixedEmbedder {
    fn name(&self) -> &str {
        "fixed_embedder"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::NotConfigured("fixed_embedder only embeds".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let vector = self
            .vector
            .clone()
            .ok_or_else(|| ProviderError::Network("connection refused".into()))?;
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|_| vector.clone()).collect(),
            model: request.model,
            usage: None,
        })
    }
}

/// Retrieval settings pointing at the `items` / `reviews` test collections.
pub fn items_config() -> RetrievalConfig {
    RetrievalConfig {
        items_collection: "items".into(),
        reviews_collection: "reviews".into(),
        ..RetrievalConfig::default()
    }
}
