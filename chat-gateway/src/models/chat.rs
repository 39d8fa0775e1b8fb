use serde::{Deserialize, Serialize};
use validator::Validate;

/// Upper bound on prompt length, counted in characters.
pub const MAX_PROMPT_CHARS: u64 = 2000;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(
        min = 1,
        max = MAX_PROMPT_CHARS,
        message = "Prompt must be between 1 and 2000 characters"
    ))]
    pub prompt: String,
}

/// Status marker of a successful reply. Failures use the
/// `service_core::error::ErrorResponse` envelope instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
}

/// Body returned by `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub status: ResponseStatus,
}

impl ChatResponse {
    pub fn success(response: String) -> Self {
        Self {
            response,
            status: ResponseStatus::Success,
        }
    }
}

/// Body returned by `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
    pub status: ResponseStatus,
}

impl GenerateResponse {
    pub fn success(content: String) -> Self {
        Self {
            content,
            status: ResponseStatus::Success,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    /// Whether the backend lists the configured model.
    pub model_available: bool,
}
