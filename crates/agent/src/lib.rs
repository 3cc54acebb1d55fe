//! The shopping assistant's agent graph.
//!
//! A request flows through a small state machine:
//!
//! 1. **Intent router** decides whether the question is about the store
//! 2. **Agent** picks tools to call or gives the final answer
//! 3. **Tools** run the requested retrievals concurrently, then back to 2
//!
//! The run ends on a final answer, when the agent stops requesting tools,
//! after [`MAX_AGENT_ITERATIONS`] steps, or when the request deadline
//! expires. [`AgentGraph::run`] never fails: every ending produces an
//! [`AgentOutcome`] with an answer and a [`TerminationReason`].

pub mod decision;
pub mod graph;
pub mod nodes;
pub mod outcome;
pub mod state;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use decision::{AgentDecision, DecisionError};
pub use graph::{AgentGraph, AgentRoute, MAX_AGENT_ITERATIONS, route_after_agent};
pub use nodes::{AgentNode, IntentRouterNode, ModelSettings, ToolNode};
pub use outcome::{AgentOutcome, TerminationReason};
pub use state::{ConversationState, StateDelta};
pub use stream_event::{EventSink, GraphEvent, GraphNode};
