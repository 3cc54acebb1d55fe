//! Progress events emitted while the graph runs.
//!
//! Callers that want live status pass an `mpsc::Sender<GraphEvent>` to
//! [`AgentGraph::run_with_events`](crate::AgentGraph::run_with_events). The
//! `status` texts are meant to be shown to the user as-is.

use serde::{Deserialize, Serialize};
use shopagent_core::provider::Usage;
use tokio::sync::mpsc;
use tracing::trace;

use crate::outcome::TerminationReason;

/// Graph node names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphNode {
    IntentRouter,
    Agent,
    Tools,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    /// A node (or a single tool call inside the tools node) started.
    NodeStarted { node: GraphNode, status: String },

    /// The run is complete.
    Finished {
        trace_id: String,
        termination: TerminationReason,
        iterations: u32,
        usage: Usage,
    },
}

impl GraphEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NodeStarted { .. } => "node_started",
            Self::Finished { .. } => "finished",
        }
    }

    pub fn started(node: GraphNode, status: impl Into<String>) -> Self {
        Self::NodeStarted {
            node,
            status: status.into(),
        }
    }
}

/// Optional event channel. Sending never fails the run.
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<mpsc::Sender<GraphEvent>>);

impl EventSink {
    pub fn new(sender: Option<mpsc::Sender<GraphEvent>>) -> Self {
        Self(sender)
    }

    pub async fn emit(&self, event: GraphEvent) {
        if let Some(sender) = &self.0 {
            if sender.send(event).await.is_err() {
                trace!("Event receiver dropped");
            }
        }
    }

    /// Send without waiting. A full or closed channel drops the event.
    pub fn try_emit(&self, event: GraphEvent) {
        if let Some(sender) = &self.0 {
            if let Err(e) = sender.try_send(event) {
                trace!(error = %e, "Event not delivered");
            }
        }
    }
}
