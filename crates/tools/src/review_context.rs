//! `get_formatted_reviews_context`: user reviews for a shortlist of items.

use std::sync::Arc;

use async_trait::async_trait;
use shopagent_core::error::ToolError;
use shopagent_core::tool::{Tool, ToolResult};
use shopagent_retrieval::{Retriever, format_reviews};
use tracing::debug;

use crate::{DEFAULT_TOP_K, top_k_argument};

pub const NAME: &str = "get_formatted_reviews_context";

pub struct ReviewContextTool {
    retriever: Arc<Retriever>,
}

impl ReviewContextTool {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for ReviewContextTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get the top k reviews matching a query for a list of prefiltered items. \
         Returns one line per review with the item ID and the review text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The query to search the reviews for"
                },
                "item_list": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "IDs of the items to retrieve reviews for"
                },
                "top_k": {
                    "type": "integer",
                    "description": "The number of reviews to retrieve (default 5)",
                    "default": 5
                }
            },
            "required": ["query", "item_list"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let item_list: Vec<String> = arguments["item_list"]
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("'item_list' must be an array".into()))?
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        let top_k = top_k_argument(
            &arguments,
            DEFAULT_TOP_K,
            self.retriever.config().prefetch_limit,
        );

        let reviews = self
            .retriever
            .retrieve_reviews(query, &item_list, top_k)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?;
        debug!(query, items = item_list.len(), reviews = reviews.len(), "Formatted review context");

        Ok(ToolResult::ok(String::new(), format_reviews(&reviews)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::retriever;

    #[tokio::test]
    async fn returns_reviews_for_listed_items_only() {
        let tool = ReviewContextTool::new(Arc::new(retriever().await));
        let result = tool
            .execute(serde_json::json!({"query": "sound", "item_list": ["B01"]}))
            .await
            .unwrap();

        assert_eq!(result.output, "- ID: B01, review: Great bass\n");
    }

    #[tokio::test]
    async fn item_list_must_be_an_array() {
        let tool = ReviewContextTool::new(Arc::new(retriever().await));
        let err = tool
            .execute(serde_json::json!({"query": "sound", "item_list": "B01"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn empty_item_list_gives_empty_context() {
        let tool = ReviewContextTool::new(Arc::new(retriever().await));
        let result = tool
            .execute(serde_json::json!({"query": "sound", "item_list": []}))
            .await
            .unwrap();
        assert!(result.output.is_empty());
    }
}
