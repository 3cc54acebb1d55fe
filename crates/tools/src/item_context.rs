//! `get_formatted_context`: catalogue search for the agent.

use std::sync::Arc;

use async_trait::async_trait;
use shopagent_core::error::ToolError;
use shopagent_core::tool::{Tool, ToolResult};
use shopagent_retrieval::{Retriever, format_items};
use tracing::debug;

use crate::top_k_argument;

pub const NAME: &str = "get_formatted_context";

pub struct ItemContextTool {
    retriever: Arc<Retriever>,
}

impl ItemContextTool {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for ItemContextTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get the top k context, each representing an inventory item for a given query. \
         Returns one line per item with its ID, rating and description."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The query to search the inventory for"
                },
                "top_k": {
                    "type": "integer",
                    "description": "The number of items to retrieve (default 5)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let config = self.retriever.config();
        let top_k = top_k_argument(&arguments, config.top_k, config.prefetch_limit);

        let items = self
            .retriever
            .retrieve_items(query, top_k)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?;
        debug!(query, top_k, items = items.len(), "Formatted item context");

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format_items(&items),
            data: Some(serde_json::json!({
                "ids": items.iter().map(|i| i.id.as_str()).collect::<Vec<_>>()
            })),
        })
    }
}
