//! Inference backend abstraction.
//!
//! The relay and the health probe only talk to `InferenceClient`, so the
//! Ollama HTTP client and the scripted mock are interchangeable.

pub mod mock;
pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mock::{MockInferenceClient, MockOutcome};
pub use ollama::{OllamaClient, OllamaConfig};

/// Error type for backend calls. Every variant is treated as transient by
/// the relay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Backend error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response contained no message content")]
    MissingContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Backend reply to a chat call. `message` is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatCompletion {
    pub message: Option<ChatMessage>,
}

impl ChatCompletion {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            message: Some(ChatMessage::assistant(text)),
        }
    }

    /// Generated text; a missing message counts as a failed call.
    pub fn into_text(self) -> Result<String, InferenceError> {
        self.message
            .map(|m| m.content)
            .ok_or(InferenceError::MissingContent)
    }
}

/// A model the backend can serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
}

/// Trait for LLM inference backends (e.g., Ollama).
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Run one non-streaming chat completion.
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatCompletion, InferenceError>;

    /// Cheap capability check: list the models the backend has.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, InferenceError>;
}
