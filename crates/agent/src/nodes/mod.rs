//! Graph nodes. Each reads the current state and returns a [`StateDelta`](crate::state::StateDelta).

pub mod agent;
pub mod router;
pub mod tools;

pub use agent::AgentNode;
pub use router::IntentRouterNode;
pub use tools::ToolNode;

/// Model call settings shared by the router and agent nodes.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.5,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
