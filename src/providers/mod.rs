//! Chat model providers for redline
//!
//! This module defines the trait and types for talking to a chat-capable LLM.
//! The agent loop only depends on the narrow `ChatModel` interface; provider
//! specifics (HTTP client, auth, request shapes) live in the implementation
//! modules.
//!
//! # Architecture
//!
//! - `ChatModel` is the single seam between the loop and the network
//! - `GeminiModel` implements it against the Gemini `generateContent` API
//! - a scripted mock lives in `providers::mock` for tests

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::prompts;
use crate::tools::ToolSpec;

pub mod gemini;
#[cfg(test)]
pub mod mock;

pub use gemini::GeminiModel;

/// Errors raised by chat model providers
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// HTTP transport failure (connection, timeout, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered successfully but carried no usable text
    #[error("model returned an empty completion")]
    EmptyCompletion,

    /// Required configuration is missing (e.g. API key)
    #[error("provider is not configured: {0}")]
    NotConfigured(String),
}

/// Role of a message sender in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input (also carries corrective instructions mid-run)
    User,
    /// Assistant response
    Assistant,
    /// Tool result fed back to the model
    Tool,
}

impl Role {
    /// Returns the string representation of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message in a run's transcript
///
/// The transcript is append-only within a run: messages are never edited or
/// removed, repair turns are appended rather than substituted in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Creates a new message with the specified role and content
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a tool-result message
    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    /// Returns true if this message is from the system
    pub fn is_system(&self) -> bool {
        matches!(self.role, Role::System)
    }

    /// Returns true if this message is from the user
    pub fn is_user(&self) -> bool {
        matches!(self.role, Role::User)
    }

    /// Returns true if this message carries a tool result
    pub fn is_tool(&self) -> bool {
        matches!(self.role, Role::Tool)
    }
}

/// Trait for chat-capable model providers
///
/// The only network-facing call the agent core makes. Implementations are
/// treated as opaque and potentially slow or unreliable; transport-level
/// retries and timeouts belong here, not in the loop (the loop's own "retry"
/// is strictly the single JSON-repair turn).
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends the transcript to the model and returns its raw text output
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;

    /// Builds the system prompt advertising the given tool specs
    ///
    /// The default appends the serialised specs to the fixed task prompt;
    /// providers with native tool-calling formats may override this.
    fn system_prompt(&self, tool_specs: &[ToolSpec]) -> String {
        let specs = serde_json::to_string(tool_specs).unwrap_or_else(|_| "[]".to_string());
        format!("{}\n\nTOOLS:\n{}", prompts::SYSTEM_PROMPT, specs)
    }

    /// Returns the model name used for requests (for logging)
    fn model_name(&self) -> &str;
}
