//! # shopagent retrieval
//!
//! Product and review retrieval for the agent's tools.
//!
//! ## Pipeline
//!
//! 1. Embed the query with the configured embedding model
//! 2. Hybrid search: dense prefetch + BM25 prefetch, fused with RRF
//! 3. Optionally rerank the fused list (Cohere)
//! 4. Render one line per item for the agent
//!
//! Backends sit behind [`VectorIndex`]: [`QdrantIndex`] in production,
//! [`InMemoryIndex`] for tests and offline runs.

pub mod context;
pub mod enrich;
pub mod in_memory;
pub mod index;
pub mod qdrant;
pub mod rerank;
pub mod retriever;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{RetrievedItem, RetrievedReview, format_items, format_reviews};
pub use enrich::enrich_references;
pub use in_memory::{InMemoryIndex, InMemoryPoint};
pub use index::{Filter, Payload, Prefetch, PrefetchQuery, ScoredPoint, SearchRequest, VectorIndex};
pub use qdrant::QdrantIndex;
pub use rerank::{CohereReranker, RerankDocument, RerankResult, Reranker};
pub use retriever::Retriever;
