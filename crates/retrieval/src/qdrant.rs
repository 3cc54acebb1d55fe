//! Qdrant REST client.
//!
//! Hybrid search goes through the universal query endpoint
//! (`POST /collections/{name}/points/query`) with one prefetch per ranked list
//! and `{"fusion": "rrf"}` as the outer query. Item lookup uses
//! `POST /collections/{name}/points/scroll` with a payload filter.

use async_trait::async_trait;
use serde::Deserialize;
use shopagent_core::error::RetrievalError;
use tracing::{debug, warn};

use crate::index::{Filter, Payload, ScoredPoint, SearchRequest, VectorIndex};

pub struct QdrantIndex {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl QdrantIndex {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            client,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn query_body(request: &SearchRequest) -> serde_json::Value {
        serde_json::json!({
            "prefetch": request.prefetch,
            "query": { "fusion": "rrf" },
            "limit": request.limit,
            "with_payload": true,
        })
    }

    fn scroll_body(parent_asin: &str) -> serde_json::Value {
        serde_json::json!({
            "filter": Filter::field_equals("parent_asin", parent_asin),
            "limit": 1,
            "with_payload": true,
            "with_vector": false,
        })
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, RetrievalError> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RetrievalError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, path, body = %error_body, "Qdrant returned error");
            return Err(RetrievalError::Index {
                status_code: status,
                message: error_body,
            });
        }

        let envelope: QdrantResponse<T> = response
            .json()
            .await
            .map_err(|e| RetrievalError::Payload(format!("Failed to parse Qdrant response: {e}")))?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredPoint>, RetrievalError> {
        debug!(
            collection = %request.collection,
            prefetch = request.prefetch.len(),
            limit = request.limit,
            "Querying Qdrant"
        );
        let path = format!("/collections/{}/points/query", request.collection);
        let result: QueryResult = self.post(&path, &Self::query_body(request)).await?;
        Ok(result.points)
    }

    async fn lookup_item(
        &self,
        collection: &str,
        parent_asin: &str,
    ) -> Result<Option<Payload>, RetrievalError> {
        let path = format!("/collections/{collection}/points/scroll");
        let result: ScrollResult = self.post(&path, &Self::scroll_body(parent_asin)).await?;
        Ok(result.points.into_iter().next().map(|p| p.payload))
    }
}

// --- Qdrant API types (internal) ---

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    points: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    #[serde(default)]
    points: Vec<RecordPoint>,
}

#[derive(Debug, Deserialize)]
struct RecordPoint {
    #[serde(default)]
    payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Prefetch, PrefetchQuery};

    #[test]
    fn trims_trailing_slash() {
        let index = QdrantIndex::new("http://localhost:6333/");
        assert_eq!(index.base_url, "http://localhost:6333");
    }

    #[test]
    fn query_body_uses_rrf_fusion() {
        let request = SearchRequest {
            collection: "items".into(),
            prefetch: vec![
                Prefetch {
                    query: PrefetchQuery::Dense(vec![0.1]),
                    using: Some("text-embedding-3-small".into()),
                    limit: 20,
                    filter: None,
                },
                Prefetch {
                    query: PrefetchQuery::Document {
                        text: "earphones".into(),
                        model: "qdrant/bm25".into(),
                    },
                    using: Some("bm25".into()),
                    limit: 20,
                    filter: None,
                },
            ],
            limit: 5,
        };
        let body = QdrantIndex::query_body(&request);
        assert_eq!(body["query"], serde_json::json!({"fusion": "rrf"}));
        assert_eq!(body["limit"], 5);
        assert_eq!(body["with_payload"], true);
        assert_eq!(body["prefetch"][0]["using"], "text-embedding-3-small");
        assert_eq!(body["prefetch"][1]["query"]["text"], "earphones");
        assert_eq!(body["prefetch"][1]["using"], "bm25");
    }

    #[test]
    fn scroll_body_filters_on_parent_asin() {
        let body = QdrantIndex::scroll_body("B0C1");
        assert_eq!(body["filter"]["must"][0]["key"], "parent_asin");
        assert_eq!(body["filter"]["must"][0]["match"]["value"], "B0C1");
        assert_eq!(body["limit"], 1);
    }

    #[test]
    fn parses_query_response() {
        let data = r#"{
            "result": {"points": [
                {"id": 42, "version": 3, "score": 0.5, "payload": {"parent_asin": "B01", "average_rating": 4.2}},
                {"id": "7c9e6679-7425-40de-944b-e07fc1f90ae7", "score": 0.25, "payload": {"parent_asin": "B02"}}
            ]},
            "status": "ok",
            "time": 0.002
        }"#;
        let parsed: QdrantResponse<QueryResult> = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.result.points.len(), 2);
        assert_eq!(parsed.result.points[0].payload_str("parent_asin"), Some("B01"));
        assert_eq!(parsed.result.points[1].id, "7c9e6679-7425-40de-944b-e07fc1f90ae7");
    }

    #[test]
    fn parses_scroll_response() {
        let data = r#"{
            "result": {"points": [{"id": 1, "payload": {"parent_asin": "B01", "image": "https://img", "price": 19.99}}],
                       "next_page_offset": null},
            "status": "ok"
        }"#;
        let parsed: QdrantResponse<ScrollResult> = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.result.points[0].payload["price"], 19.99);
    }
}
