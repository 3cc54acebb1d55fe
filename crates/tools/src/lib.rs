//! Built-in tools for the shopping assistant.
//!
//! Both tools are thin wrappers over [`Retriever`]: they parse the agent's
//! arguments, run retrieval and render the results as plain text lines the
//! agent can cite from.

pub mod item_context;
pub mod review_context;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use shopagent_core::tool::ToolRegistry;
use shopagent_retrieval::Retriever;

pub use item_context::ItemContextTool;
pub use review_context::ReviewContextTool;

/// Default number of results when the agent does not pass `top_k`.
pub const DEFAULT_TOP_K: usize = 5;

/// Create the tool registry the agent runs with.
pub fn default_registry(retriever: Arc<Retriever>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ItemContextTool::new(retriever.clone())));
    registry.register(Arc::new(ReviewContextTool::new(retriever)));
    registry
}

/// Read an optional `top_k` argument, falling back to `default`.
///
/// Never more than `max`, the number of candidates each prefetch returns.
pub(crate) fn top_k_argument(arguments: &serde_json::Value, default: usize, max: usize) -> usize {
    arguments
        .get("top_k")
        .and_then(|v| v.as_u64())
        .map(|k| usize::try_from(k).unwrap_or(usize::MAX))
        .unwrap_or(default)
        .min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::retriever;

    #[tokio::test]
    async fn registry_has_both_tools() {
        let registry = default_registry(Arc::new(retriever().await));
        assert_eq!(
            registry.names(),
            vec!["get_formatted_context", "get_formatted_reviews_context"]
        );
        assert!(registry.describe().contains("item_list"));
    }

    #[test]
    fn top_k_defaults_when_missing_or_invalid() {
        assert_eq!(top_k_argument(&serde_json::json!({}), 5, 20), 5);
        assert_eq!(top_k_argument(&serde_json::json!({"top_k": "x"}), 5, 20), 5);
        assert_eq!(top_k_argument(&serde_json::json!({"top_k": 2}), 5, 20), 2);
    }

    #[test]
    fn top_k_is_capped() {
        assert_eq!(top_k_argument(&serde_json::json!({"top_k": 1000}), 5, 20), 20);
        assert_eq!(top_k_argument(&serde_json::json!({"top_k": u64::MAX}), 5, 20), 20);
        assert_eq!(top_k_argument(&serde_json::json!({}), 50, 20), 20);
    }
}
