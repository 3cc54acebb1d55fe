//! Agent decision node: one model call per step, validated into an
//! [`AgentDecision`].

use std::sync::Arc;

use shopagent_config::prompts::{DEFAULT_AGENT_PROMPT, render};
use shopagent_core::message::Message;
use shopagent_core::provider::{Provider, ProviderRequest, ResponseFormat, ToolDefinition};
use tracing::{debug, warn};

use crate::decision::AgentDecision;
use crate::nodes::ModelSettings;
use crate::outcome::TerminationReason;
use crate::state::{ConversationState, StateDelta};

/// Answer given when the agent reply cannot be used.
pub const PROTOCOL_VIOLATION_ANSWER: &str =
    "Sorry, I couldn't work out an answer to that. Please try rephrasing your question.";

fn decision_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "answer": {"type": "string"},
            "references": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "description": {"type": "string"}
                    },
                    "required": ["id", "description"],
                    "additionalProperties": false
                }
            },
            "final_answer": {"type": "boolean"},
            "tool_calls": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "arguments": {"type": "object"}
                    },
                    "required": ["name", "arguments"]
                }
            }
        },
        "required": ["answer", "references", "final_answer", "tool_calls"]
    })
}

pub struct AgentNode {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
    template: String,
    tools: Vec<ToolDefinition>,
}

impl AgentNode {
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: ModelSettings,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            provider,
            settings,
            template: DEFAULT_AGENT_PROMPT.to_string(),
            tools,
        }
    }

    /// Override the system prompt template (`{{available_tools}}` is substituted).
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    fn request(&self, state: &ConversationState) -> ProviderRequest {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::system(render(&self.template, &state.available_tools)));
        messages.extend(state.messages.iter().cloned());

        let mut request = ProviderRequest::new(&self.settings.model, messages)
            .with_temperature(self.settings.temperature)
            .with_tools(self.tools.clone())
            .with_response_format(ResponseFormat::JsonSchema {
                name: "agent_decision".into(),
                schema: decision_schema(),
            });
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }

    /// Take one agent step. Always bumps the iteration and appends exactly
    /// one assistant message.
    pub async fn run(&self, state: &ConversationState) -> StateDelta {
        let iteration = state.iteration + 1;
        debug!(iteration, "Agent step");

        let response = match self.provider.complete(self.request(state)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, iteration, "Agent call failed, ending run");
                let answer = format!(
                    "Sorry, the assistant is unavailable right now ({} request failed: {e}).",
                    self.provider.name()
                );
                return forced_end(iteration, answer, None);
            }
        };

        match AgentDecision::from_message(&response.message) {
            Ok(decision) => {
                debug!(
                    iteration,
                    tool_calls = decision.tool_calls.len(),
                    final_answer = decision.final_answer,
                    references = decision.references.len(),
                    "Agent decided"
                );
                StateDelta {
                    messages: vec![decision.to_message()],
                    references: decision.references,
                    usage: response.usage,
                    iteration: Some(iteration),
                    answer: Some(decision.answer),
                    tool_calls: Some(decision.tool_calls),
                    final_answer: Some(decision.final_answer),
                    ..StateDelta::default()
                }
            }
            Err(e) => {
                warn!(error = %e, iteration, "Agent protocol violation, ending run");
                forced_end(iteration, PROTOCOL_VIOLATION_ANSWER.to_string(), response.usage)
            }
        }
    }
}

fn forced_end(
    iteration: u32,
    answer: String,
    usage: Option<shopagent_core::provider::Usage>,
) -> StateDelta {
    StateDelta {
        messages: vec![Message::assistant(&answer)],
        usage,
        iteration: Some(iteration),
        answer: Some(answer),
        tool_calls: Some(Vec::new()),
        final_answer: Some(false),
        forced_termination: Some(TerminationReason::ProtocolViolation),
        ..StateDelta::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        FailingProvider, SequentialMockProvider, make_text_response, make_tool_call,
        make_tool_call_response,
    };

    fn node(provider: Arc<dyn Provider>) -> AgentNode {
        AgentNode::new(provider, ModelSettings::new("mock-model"), vec![])
    }

    fn state() -> ConversationState {
        ConversationState::new(
            vec![Message::user("Do you sell earphones?")],
            "- get_formatted_context: search",
        )
    }

    #[tokio::test]
    async fn tool_request_step() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(
            vec![make_tool_call("get_formatted_context", serde_json::json!({"query": "earphones"}))],
            "",
        )]));
        let delta = node(provider).run(&state()).await;

        assert_eq!(delta.iteration, Some(1));
        assert_eq!(delta.messages.len(), 1);
        assert!(delta.messages[0].has_tool_calls());
        assert_eq!(delta.tool_calls.as_ref().map(Vec::len), Some(1));
        assert!(delta.forced_termination.is_none());
    }

    #[tokio::test]
    async fn final_answer_step() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response(
            r#"{"answer": "Yes, B01.", "references": [{"id": "B01", "description": "Earphones"}], "final_answer": true, "tool_calls": []}"#,
        )]));
        let delta = node(provider).run(&state()).await;

        assert_eq!(delta.final_answer, Some(true));
        assert_eq!(delta.answer.as_deref(), Some("Yes, B01."));
        assert_eq!(delta.references.len(), 1);
        assert_eq!(delta.messages[0].content, "Yes, B01.");
    }

    #[tokio::test]
    async fn violation_forces_termination() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response(
            r#"{"answer": "thinking", "final_answer": false, "tool_calls": []}"#,
        )]));
        let delta = node(provider).run(&state()).await;

        assert_eq!(delta.forced_termination, Some(TerminationReason::ProtocolViolation));
        assert_eq!(delta.answer.as_deref(), Some(PROTOCOL_VIOLATION_ANSWER));
        assert_eq!(delta.iteration, Some(1));
        assert_eq!(delta.messages.len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_names_the_failure() {
        let delta = node(Arc::new(FailingProvider)).run(&state()).await;
        assert_eq!(delta.forced_termination, Some(TerminationReason::ProtocolViolation));
        assert!(delta.answer.unwrap().contains("failing"));
    }

    #[tokio::test]
    async fn prompt_lists_available_tools() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response(
            r#"{"answer": "ok", "final_answer": true}"#,
        )]));
        node(provider.clone()).run(&state()).await;

        let request = provider.last_request().unwrap();
        assert!(request.messages[0].content.contains("- get_formatted_context: search"));
        assert_eq!(request.messages[1].content, "Do you sell earphones?");
    }
}
