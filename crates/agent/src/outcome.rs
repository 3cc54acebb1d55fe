//! The result of one graph run.

use serde::{Deserialize, Serialize};
use shopagent_core::message::Message;
use shopagent_core::provider::Usage;
use shopagent_core::reference::{ReferencedItem, UsedContextItem};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The router judged the question out of scope.
    NotRelevant,
    /// The agent declared a final answer.
    FinalAnswer,
    /// The agent stopped without requesting tools.
    NoToolCalls,
    /// The agent was still requesting tools when the step budget ran out.
    IterationCap,
    /// The agent reply was unusable or the provider failed.
    ProtocolViolation,
    /// The request deadline expired.
    DeadlineExceeded,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotRelevant => "not_relevant",
            Self::FinalAnswer => "final_answer",
            Self::NoToolCalls => "no_tool_calls",
            Self::IterationCap => "iteration_cap",
            Self::ProtocolViolation => "protocol_violation",
            Self::DeadlineExceeded => "deadline_exceeded",
        };
        f.write_str(s)
    }
}

/// Everything a caller needs from a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    pub trace_id: String,
    pub answer: String,
    pub references: Vec<ReferencedItem>,
    /// References enriched with catalogue image and price
    pub used_context: Vec<UsedContextItem>,
    pub transcript: Vec<Message>,
    pub iterations: u32,
    pub usage: Usage,
    pub termination: TerminationReason,
}

impl AgentOutcome {
    /// Whether the agent produced its own answer rather than a fallback.
    pub fn is_answered(&self) -> bool {
        matches!(
            self.termination,
            TerminationReason::FinalAnswer | TerminationReason::NoToolCalls
        )
    }
}
