//! Vector index abstraction: the hybrid search query model and the
//! `VectorIndex` trait implemented by the Qdrant client and the in-memory index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopagent_core::error::RetrievalError;

/// Point payload as stored in the collection.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// One independent candidate search, fused with the others afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefetch {
    pub query: PrefetchQuery,

    /// Named vector to search (`None` = the collection's default vector)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,

    pub limit: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefetchQuery {
    /// Dense vector similarity
    Dense(Vec<f32>),
    /// Text inferred into a sparse vector by the index (e.g. `qdrant/bm25`)
    Document { text: String, model: String },
}

/// A conjunction of payload conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub must: Vec<FieldCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match")]
    pub matches: Match,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Match {
    Value { value: String },
    Any { any: Vec<String> },
}

impl Filter {
    /// `key` equals `value`.
    pub fn field_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            must: vec![FieldCondition {
                key: key.into(),
                matches: Match::Value {
                    value: value.into(),
                },
            }],
        }
    }

    /// `key` is one of `values`.
    pub fn field_in(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            must: vec![FieldCondition {
                key: key.into(),
                matches: Match::Any { any: values },
            }],
        }
    }

    /// Evaluate the filter against a payload.
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|cond| {
            let Some(field) = payload.get(&cond.key).and_then(|v| v.as_str()) else {
                return false;
            };
            match &cond.matches {
                Match::Value { value } => field == value,
                Match::Any { any } => any.iter().any(|v| v == field),
            }
        })
    }
}

/// A hybrid search: prefetches fused with reciprocal rank fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub collection: String,
    pub prefetch: Vec<Prefetch>,
    /// Final number of points after fusion
    pub limit: usize,
}

/// A point returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: serde_json::Value,
    pub score: f32,
    #[serde(default)]
    pub payload: Payload,
}

impl ScoredPoint {
    /// A payload field as a string.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// Text of a payload field, joining string arrays with spaces.
pub fn payload_text(payload: &Payload, key: &str) -> Option<String> {
    match payload.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// A search backend for product and review collections.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logs (e.g. "qdrant").
    fn name(&self) -> &str;

    /// Run a fused hybrid search.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredPoint>, RetrievalError>;

    /// Fetch the payload of the item whose `parent_asin` equals `parent_asin`.
    async fn lookup_item(
        &self,
        collection: &str,
        parent_asin: &str,
    ) -> Result<Option<Payload>, RetrievalError>;
}
