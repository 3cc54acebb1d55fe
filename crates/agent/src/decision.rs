//! Turning a provider reply into a validated agent decision.
//!
//! The agent may ask for tools natively (provider tool calls) or inside its
//! JSON body, and must either request tools or declare a final answer. A
//! reply that does neither, or both, is a protocol violation.

use serde::Deserialize;
use shopagent_core::message::{Message, MessageToolCall};
use shopagent_core::reference::ReferencedItem;
use shopagent_core::tool::ToolCall;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DecisionError {
    #[error("Agent reply is not a valid decision: {0}")]
    Unparseable(String),

    #[error("Agent reply neither requests tools nor gives a final answer")]
    NoAction,

    #[error("Agent reply requests tools and gives a final answer")]
    Contradictory,
}

/// The JSON body the agent prompt asks for.
#[derive(Debug, Default, Deserialize)]
struct DecisionBody {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    references: Vec<ReferencedItem>,
    #[serde(default)]
    final_answer: bool,
    #[serde(default)]
    tool_calls: Vec<BodyToolCall>,
}

#[derive(Debug, Deserialize)]
struct BodyToolCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// A validated agent step.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDecision {
    pub answer: String,
    pub references: Vec<ReferencedItem>,
    pub final_answer: bool,
    pub tool_calls: Vec<ToolCall>,
}

impl AgentDecision {
    /// Parse and validate an assistant reply.
    pub fn from_message(message: &Message) -> Result<Self, DecisionError> {
        let native: Vec<ToolCall> = message.tool_calls.iter().map(to_tool_call).collect();

        let body = match parse_json::<DecisionBody>(&message.content) {
            Ok(body) => body,
            // Tool-calling replies often carry free-text reasoning instead of a body.
            Err(_) if !native.is_empty() => DecisionBody {
                answer: message.content.trim().to_string(),
                ..DecisionBody::default()
            },
            Err(e) => return Err(e),
        };

        let tool_calls = if native.is_empty() {
            body.tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                    name: call.name,
                    arguments: call.arguments,
                })
                .collect()
        } else {
            native
        };

        match (tool_calls.is_empty(), body.final_answer) {
            (true, false) => Err(DecisionError::NoAction),
            (false, true) => Err(DecisionError::Contradictory),
            _ => Ok(Self {
                answer: body.answer,
                references: body.references,
                final_answer: body.final_answer,
                tool_calls,
            }),
        }
    }

    /// The assistant turn recorded for this decision.
    pub fn to_message(&self) -> Message {
        if self.tool_calls.is_empty() {
            return Message::assistant(&self.answer);
        }
        let calls = self
            .tool_calls
            .iter()
            .map(|call| MessageToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            })
            .collect();
        Message::assistant_with_tool_calls(&self.answer, calls)
    }
}

/// Provider tool-call arguments arrive as a JSON string. Arguments that do
/// not parse are kept as a string so registry validation rejects the call.
fn to_tool_call(call: &MessageToolCall) -> ToolCall {
    let arguments = serde_json::from_str(&call.arguments)
        .unwrap_or_else(|_| serde_json::Value::String(call.arguments.clone()));
    ToolCall {
        id: call.id.clone(),
        name: call.name.clone(),
        arguments,
    }
}

/// Strip a surrounding Markdown code fence, with or without a language tag.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    match rest.split_once('\n') {
        Some((tag, body)) if !tag.trim().contains(' ') => body.trim(),
        _ => rest.trim(),
    }
}

/// Parse a structured model reply, tolerating code fences.
pub fn parse_json<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, DecisionError> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err(DecisionError::Unparseable("empty reply".into()));
    }
    serde_json::from_str(body).map_err(|e| DecisionError::Unparseable(e.to_string()))
}
