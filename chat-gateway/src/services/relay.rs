//! Retry-wrapped path from a prompt to generated text.

use crate::services::inference::{ChatCompletion, ChatMessage, InferenceClient, InferenceError};
use crate::services::metrics;
use service_core::error::AppError;
use service_core::retry::{retry_with_backoff, RetryConfig, RetryError};
use std::sync::Arc;
use tokio::time::Instant;
use thiserror::Error;
use tracing::Instrument;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to get response from model '{model}' after {attempts} attempts: {last_error}")]
    Exhausted {
        model: String,
        attempts: u32,
        last_error: InferenceError,
    },

    #[error("Relay task failed: {0}")]
    Task(String),
}

impl RelayError {
    /// Backend attempts made, if the retry sequence ran to its end.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RelayError::Exhausted { attempts, .. } => Some(*attempts),
            RelayError::Task(_) => None,
        }
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// Sends a prompt to the backend, retrying failed attempts with a fixed
/// backoff. Holds no per-request state.
#[derive(Clone)]
pub struct RetryingRelay {
    client: Arc<dyn InferenceClient>,
    retry: RetryConfig,
}

impl RetryingRelay {
    pub fn new(client: Arc<dyn InferenceClient>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Run [`relay`](Self::relay) on its own task. Dropping the returned
    /// future, as hyper does when the client disconnects, leaves the retry
    /// sequence running until it succeeds or is exhausted.
    pub async fn relay_detached(&self, model: String, prompt: String) -> Result<String, RelayError> {
        let relay = self.clone();
        let task = tokio::spawn(
            async move { relay.relay(&model, &prompt).await }.in_current_span(),
        );

        task.await.map_err(|e| {
            tracing::error!(error = %e, "Relay task did not complete");
            RelayError::Task(e.to_string())
        })?
    }

    /// Relay `prompt` to `model` and return the generated text unchanged.
    ///
    /// A reply without message content counts as a failed attempt. The
    /// prompt itself is never logged, only its length.
    pub async fn relay(&self, model: &str, prompt: &str) -> Result<String, RelayError> {
        let messages = [ChatMessage::user(prompt)];
        let messages = &messages;
        let client = self.client.as_ref();
        let prompt_len = prompt.chars().count();
        let max_attempts = self.retry.attempts();

        let result = retry_with_backoff(&self.retry, "relay_chat", |attempt| async move {
            let started = Instant::now();
            let outcome = client
                .chat(model, messages)
                .await
                .and_then(ChatCompletion::into_text);
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match &outcome {
                Ok(text) => {
                    tracing::info!(
                        model,
                        attempt,
                        max_attempts,
                        prompt_len,
                        response_len = text.chars().count(),
                        elapsed_ms,
                        "Backend call succeeded"
                    );
                    metrics::record_attempt("success");
                }
                Err(e) => {
                    tracing::warn!(
                        model,
                        attempt,
                        max_attempts,
                        prompt_len,
                        elapsed_ms,
                        error = %e,
                        "Backend call failed"
                    );
                    metrics::record_attempt("failure");
                }
            }

            outcome
        })
        .await;

        match result {
            Ok(text) => {
                metrics::record_relay("success");
                Ok(text)
            }
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                metrics::record_relay("exhausted");
                tracing::error!(
                    model,
                    attempts,
                    prompt_len,
                    error = %last_error,
                    "Backend relay exhausted all attempts"
                );
                Err(RelayError::Exhausted {
                    model: model.to_string(),
                    attempts,
                    last_error,
                })
            }
        }
    }
}
