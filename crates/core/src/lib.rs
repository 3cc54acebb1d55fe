//! # shopagent core
//!
//! Domain types, traits, and error definitions shared by every shopagent crate.
//! This crate has **no transport dependencies**: it defines the model that the
//! provider adapters, the retrieval layer and the agent graph implement against.
//!
//! Every external collaborator (LLM backend, tool) is a trait here so the graph
//! can be driven by scripted fakes in tests and by real clients in production.

pub mod error;
pub mod message;
pub mod provider;
pub mod reference;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, MessageToolCall, Role, last_user_message};
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
    ResponseFormat, ToolDefinition, Usage,
};
pub use reference::{ReferencedItem, UsedContextItem};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
