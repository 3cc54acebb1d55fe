//! Tool execution node: fan out every pending call, join, record results.

use futures::future::join_all;
use shopagent_core::message::Message;
use shopagent_core::tool::{ToolCall, ToolRegistry};
use tracing::{debug, warn};

use crate::state::{ConversationState, StateDelta};
use crate::stream_event::{EventSink, GraphEvent, GraphNode};

pub struct ToolNode {
    registry: ToolRegistry,
}

/// User-facing status line for a call about to run.
pub fn status_for(call: &ToolCall) -> String {
    match call.name.as_str() {
        "get_formatted_context" => format!(
            "Looking for items: {}.",
            call.arguments
                .get("query")
                .and_then(|q| q.as_str())
                .unwrap_or_default()
        ),
        "get_formatted_reviews_context" => "Fetching user reviews...".to_string(),
        other => format!("Unknown tool: {other}."),
    }
}

impl ToolNode {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run all pending calls concurrently. Results are appended in call
    /// order; a failing call becomes an `Error: ...` tool message.
    pub async fn run(&self, state: &ConversationState, events: &EventSink) -> StateDelta {
        for call in &state.tool_calls {
            events.emit(GraphEvent::started(GraphNode::Tools, status_for(call))).await;
        }

        let results = join_all(state.tool_calls.iter().map(|call| async move {
            let content = match self.registry.execute(call).await {
                Ok(result) => result.output,
                Err(e) => {
                    warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool call failed");
                    format!("Error: {e}")
                }
            };
            Message::tool_result(&call.id, &call.name, content)
        }))
        .await;

        debug!(calls = results.len(), "Tool calls joined");
        StateDelta {
            messages: results,
            tool_calls: Some(Vec::new()),
            ..StateDelta::default()
        }
    }
}
