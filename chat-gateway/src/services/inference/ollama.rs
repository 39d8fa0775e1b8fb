//! Ollama backend.
//!
//! Uses the non-streaming `/api/chat` endpoint for generation and
//! `/api/tags` as the liveness capability check.

use super::{ChatCompletion, ChatMessage, InferenceClient, InferenceError, ModelInfo, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama client configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| InferenceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(InferenceError::Api { status, body })
    }
}

fn map_send_error(err: reqwest::Error) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout(err.to_string())
    } else {
        InferenceError::Network(err.to_string())
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatCompletion, InferenceError> {
        let request = ChatRequestBody {
            model,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(self.api_url("chat"))
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = Self::check_status(response).await?;

        let body: ChatResponseBody = response.json().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(e.to_string())
            } else {
                InferenceError::InvalidResponse(format!("Failed to parse response: {}", e))
            }
        })?;

        Ok(body.into_completion())
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, InferenceError> {
        let response = self
            .client
            .get(self.api_url("tags"))
            .send()
            .await
            .map_err(map_send_error)?;
        let response = Self::check_status(response).await?;

        let body: TagsResponseBody = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(format!("Failed to parse tags: {}", e)))?;

        Ok(body
            .models
            .into_iter()
            .map(|m| ModelInfo { name: m.name })
            .collect())
    }
}

// ============================================================================
// Ollama API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponseBody {
    fn into_completion(self) -> ChatCompletion {
        let message = self.message.and_then(|m| {
            let role = match m.role.as_deref() {
                Some("system") => Role::System,
                Some("user") => Role::User,
                _ => Role::Assistant,
            };
            m.content.map(|content| ChatMessage { role, content })
        });
        ChatCompletion { message }
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponseBody {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
