//! Intent router: decides once per request whether the question is in scope.

use std::sync::Arc;

use serde::Deserialize;
use shopagent_config::prompts::DEFAULT_ROUTER_PROMPT;
use shopagent_core::message::Message;
use shopagent_core::provider::{Provider, ProviderRequest, ResponseFormat};
use tracing::{debug, warn};

use crate::decision::parse_json;
use crate::nodes::ModelSettings;
use crate::state::{ConversationState, StateDelta};

/// Answer used when the question is out of scope and the model gave none.
pub const NOT_RELEVANT_ANSWER: &str =
    "I'm sorry, I can only help with questions about the products available in our store.";

#[derive(Debug, Deserialize)]
struct RouterVerdict {
    question_relevant: bool,
    #[serde(default)]
    answer: String,
}

fn verdict_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "question_relevant": {"type": "boolean"},
            "answer": {"type": "string"}
        },
        "required": ["question_relevant", "answer"],
        "additionalProperties": false
    })
}

pub struct IntentRouterNode {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
    prompt: String,
}

impl IntentRouterNode {
    pub fn new(provider: Arc<dyn Provider>, settings: ModelSettings) -> Self {
        Self {
            provider,
            settings,
            prompt: DEFAULT_ROUTER_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Classify the conversation. Any failure fails closed: not relevant,
    /// with the fixed fallback answer.
    pub async fn run(&self, state: &ConversationState) -> StateDelta {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::system(&self.prompt));
        messages.extend(state.messages.iter().cloned());

        let mut request = ProviderRequest::new(&self.settings.model, messages)
            .with_temperature(self.settings.temperature)
            .with_response_format(ResponseFormat::JsonSchema {
                name: "router_verdict".into(),
                schema: verdict_schema(),
            });
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let (verdict, usage) = match self.provider.complete(request).await {
            Ok(response) => match parse_json::<RouterVerdict>(&response.message.content) {
                Ok(verdict) => (Some(verdict), response.usage),
                Err(e) => {
                    warn!(provider = self.provider.name(), error = %e, "Router reply unparseable, treating as not relevant");
                    (None, response.usage)
                }
            },
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Router call failed, treating as not relevant");
                (None, None)
            }
        };

        match verdict {
            Some(verdict) if verdict.question_relevant => {
                debug!("Question is relevant");
                StateDelta {
                    question_relevant: Some(true),
                    usage,
                    ..StateDelta::default()
                }
            }
            other => {
                let answer = other
                    .map(|v| v.answer.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| NOT_RELEVANT_ANSWER.to_string());
                debug!(answer = %answer, "Question is not relevant");
                StateDelta {
                    messages: vec![Message::assistant(&answer)],
                    question_relevant: Some(false),
                    answer: Some(answer),
                    usage,
                    ..StateDelta::default()
                }
            }
        }
    }
}
