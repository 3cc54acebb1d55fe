//! Text-based reranking of retrieved candidates.
//!
//! A reranker scores each document jointly with the query (cross-encoder) and
//! returns the best `top_n` in relevance order.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopagent_core::error::RetrievalError;
use tracing::{debug, warn};

/// A document to be reranked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankDocument {
    pub id: String,
    /// Text content scored for relevance
    pub text: String,
}

/// Result from reranking a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    pub id: String,
    pub score: f32,
    /// Original position in the input list
    pub index: usize,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank `documents` by relevance to `query`, highest first, at most `top_n`.
    async fn rerank(
        &self,
        query: &str,
        documents: Vec<RerankDocument>,
        top_n: usize,
    ) -> Result<Vec<RerankResult>, RetrievalError>;

    fn model_name(&self) -> &str;
}

/// Cohere v2 `/rerank` client.
pub struct CohereReranker {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_retries: usize,
}

impl CohereReranker {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_retries: 2,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn to_results(documents: &[RerankDocument], response: CohereRerankResponse) -> Vec<RerankResult> {
        response
            .results
            .into_iter()
            .filter_map(|r| {
                let doc = documents.get(r.index)?;
                Some(RerankResult {
                    id: doc.id.clone(),
                    score: r.relevance_score,
                    index: r.index,
                })
            })
            .collect()
    }

    async fn send_once(&self, request: &CohereRerankRequest) -> Result<CohereRerankResponse, RetrievalError> {
        let response = self
            .client
            .post(format!("{}/rerank", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| RetrievalError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<CohereApiError>().await {
                Ok(err) => err.message.unwrap_or_else(|| "Unknown error".to_string()),
                Err(_) => format!("HTTP {status}"),
            };
            return Err(RetrievalError::RerankFailed(format!(
                "Cohere rerank API error ({}): {message}",
                status.as_u16()
            )));
        }

        response.json::<CohereRerankResponse>().await.map_err(|e| {
            RetrievalError::RerankFailed(format!("Failed to parse Cohere rerank response: {e}"))
        })
    }
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: Vec<RerankDocument>,
        top_n: usize,
    ) -> Result<Vec<RerankResult>, RetrievalError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let request = CohereRerankRequest {
            model: self.model.clone(),
            query: query.to_string(),
            documents: documents.iter().map(|d| d.text.clone()).collect(),
            top_n: top_n.min(documents.len()),
        };

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * (1 << attempt))).await;
            }

            match self.send_once(&request).await {
                Ok(response) => {
                    debug!(
                        model = %self.model,
                        results = response.results.len(),
                        "Cohere rerank call successful"
                    );
                    return Ok(Self::to_results(&documents, response));
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        warn!(
                            error = %e,
                            "Cohere rerank call failed (attempt {}/{}), retrying...",
                            attempt + 1,
                            self.max_retries + 1
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            RetrievalError::RerankFailed("All Cohere rerank retry attempts failed".into())
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// --- Cohere API types (internal) ---

#[derive(Debug, Serialize)]
struct CohereRerankRequest {
    model: String,
    query: String,
    documents: Vec<String>,
    top_n: usize,
}

#[derive(Debug, Deserialize)]
struct CohereRerankResponse {
    results: Vec<CohereRerankResult>,
}

#[derive(Debug, Deserialize)]
struct CohereRerankResult {
    index: usize,
    relevance_score: f32,
}

#[derive(Debug, Deserialize)]
struct CohereApiError {
    message: Option<String>,
}
