//! System prompt templates for the router and the agent.
//!
//! Templates are plain text with a single `{{available_tools}}` placeholder.
//! Either one can be overridden from `[prompts]` in the config file.

use serde::{Deserialize, Serialize};

/// Placeholder replaced with the rendered tool catalogue.
pub const AVAILABLE_TOOLS_PLACEHOLDER: &str = "{{available_tools}}";

pub const DEFAULT_ROUTER_PROMPT: &str = r#"You are part of a shopping assistant that answers questions about the products available in an online store.

Decide whether the user's latest question is about shopping: products, their features, prices, ratings, availability or other customers' reviews.

Reply with a JSON object and nothing else:
{"question_relevant": <true|false>, "answer": "<text>"}

- If the question is relevant, set "question_relevant" to true and leave "answer" empty.
- If it is not relevant, set "question_relevant" to false and use "answer" to politely explain that you can only help with questions about the products in stock.
"#;

pub const DEFAULT_AGENT_PROMPT: &str = r#"You are a shopping assistant that answers questions about the products in stock.

You can use the following tools:
{{available_tools}}

Instructions:
- Answer only from what the tools return. Never invent products.
- Never use the word "context"; refer to it as the available products.
- To search, call a tool. Extract concise search keywords from the question for the "query" argument.
- When you have enough information, give the final answer and cite every product you used.

Reply with a JSON object and nothing else:
{
  "answer": "<text for the user>",
  "references": [{"id": "<parent ASIN>", "description": "<short description>"}],
  "final_answer": <true|false>,
  "tool_calls": [{"name": "<tool name>", "arguments": {...}}]
}

Either request tool calls with "final_answer" false, or give the final answer with "final_answer" true and no tool calls. Never both.
"#;

/// Prompt overrides from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Intent router system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,

    /// Agent system prompt; should contain `{{available_tools}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl PromptConfig {
    pub fn router_template(&self) -> &str {
        self.router.as_deref().unwrap_or(DEFAULT_ROUTER_PROMPT)
    }

    pub fn agent_template(&self) -> &str {
        self.agent.as_deref().unwrap_or(DEFAULT_AGENT_PROMPT)
    }
}

/// Substitute the tool catalogue into a template.
///
/// Accepts `{{available_tools}}` with or without inner spaces.
pub fn render(template: &str, available_tools: &str) -> String {
    template
        .replace(AVAILABLE_TOOLS_PLACEHOLDER, available_tools)
        .replace("{{ available_tools }}", available_tools)
}
