//! Per-request conversation state, advanced one node at a time.
//!
//! Nodes never mutate the state they are handed. Each one reads
//! `&ConversationState` and returns a [`StateDelta`]; the graph folds the
//! delta in with [`ConversationState::apply`]. A delta can only append
//! messages, so the transcript is append-only by construction.

use shopagent_core::message::Message;
use shopagent_core::provider::Usage;
use shopagent_core::reference::ReferencedItem;
use shopagent_core::tool::ToolCall;

use crate::outcome::TerminationReason;

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    /// User, assistant and tool turns in order
    pub messages: Vec<Message>,

    /// Set once by the intent router
    pub question_relevant: bool,

    /// Number of agent decisions taken so far
    pub iteration: u32,

    pub answer: String,

    /// Calls requested by the latest agent decision, not yet executed
    pub tool_calls: Vec<ToolCall>,

    pub final_answer: bool,

    /// Products cited so far, across all agent steps
    pub references: Vec<ReferencedItem>,

    /// Rendered tool catalogue shown to the agent
    pub available_tools: String,

    /// Token usage summed over every model call
    pub usage: Usage,

    /// Set by a node that cannot continue the run
    pub forced_termination: Option<TerminationReason>,
}

impl ConversationState {
    pub fn new(messages: Vec<Message>, available_tools: impl Into<String>) -> Self {
        Self {
            messages,
            available_tools: available_tools.into(),
            ..Self::default()
        }
    }

    /// Fold a node's output into the next state.
    pub fn apply(mut self, delta: StateDelta) -> Self {
        self.messages.extend(delta.messages);
        self.references.extend(delta.references);
        if let Some(usage) = delta.usage {
            self.usage += usage;
        }
        if let Some(relevant) = delta.question_relevant {
            self.question_relevant = relevant;
        }
        if let Some(iteration) = delta.iteration {
            self.iteration = iteration;
        }
        if let Some(answer) = delta.answer {
            self.answer = answer;
        }
        if let Some(tool_calls) = delta.tool_calls {
            self.tool_calls = tool_calls;
        }
        if let Some(final_answer) = delta.final_answer {
            self.final_answer = final_answer;
        }
        if delta.forced_termination.is_some() {
            self.forced_termination = delta.forced_termination;
        }
        self
    }
}

/// The changes one node makes to the state.
///
/// `messages` and `references` are appended; every `Some` field replaces
/// the current value.
#[derive(Debug, Clone, Default)]
pub struct StateDelta {
    pub messages: Vec<Message>,
    pub references: Vec<ReferencedItem>,
    pub usage: Option<Usage>,
    pub question_relevant: Option<bool>,
    pub iteration: Option<u32>,
    pub answer: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub final_answer: Option<bool>,
    pub forced_termination: Option<TerminationReason>,
}
