//! Backend liveness probe.

use crate::services::inference::{InferenceClient, InferenceError};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy {
        model: String,
        /// The backend lists the configured model. Informational only.
        model_available: bool,
    },
    Unavailable {
        model: String,
        reason: InferenceError,
    },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }
}

#[derive(Clone)]
pub struct HealthProbe {
    client: Arc<dyn InferenceClient>,
    model: String,
}

impl HealthProbe {
    pub fn new(client: Arc<dyn InferenceClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Single capability check against the backend, never retried.
    pub async fn probe(&self) -> HealthStatus {
        match self.client.list_models().await {
            Ok(models) => {
                let model_available = models.iter().any(|m| matches_model(&m.name, &self.model));
                if !model_available {
                    tracing::warn!(
                        model = %self.model,
                        available = models.len(),
                        "Configured model is not listed by the backend"
                    );
                }
                HealthStatus::Healthy {
                    model: self.model.clone(),
                    model_available,
                }
            }
            Err(e) => {
                tracing::error!(model = %self.model, error = %e, "Backend health check failed");
                HealthStatus::Unavailable {
                    model: self.model.clone(),
                    reason: e,
                }
            }
        }
    }
}

/// Ollama reports `llama3.2:latest` for a model configured as `llama3.2`.
fn matches_model(listed: &str, configured: &str) -> bool {
    listed == configured
        || (!configured.contains(':') && listed.strip_suffix(":latest") == Some(configured))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::inference::MockInferenceClient;

    #[tokio::test]
    async fn healthy_when_models_listed() {
        let client = Arc::new(MockInferenceClient::replying("x").with_models(["llama3.2:latest"]));
        let probe = HealthProbe::new(client.clone(), "llama3.2");

        let status = probe.probe().await;

        assert_eq!(
            status,
            HealthStatus::Healthy {
                model: "llama3.2".into(),
                model_available: true
            }
        );
        assert_eq!(client.list_calls(), 1);
        assert_eq!(client.chat_calls(), 0);
    }

    #[tokio::test]
    async fn missing_model_is_still_healthy() {
        let client = Arc::new(MockInferenceClient::replying("x").with_models(["mistral"]));
        let status = HealthProbe::new(client, "llama3.2").probe().await;

        assert!(status.is_healthy());
        assert!(matches!(
            status,
            HealthStatus::Healthy {
                model_available: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn failure_is_unavailable_without_retry() {
        let client = Arc::new(
            MockInferenceClient::replying("x")
                .with_unavailable_models(InferenceError::Network("connection refused".into())),
        );
        let status = HealthProbe::new(client.clone(), "llama3.2").probe().await;

        assert!(!status.is_healthy());
        assert_eq!(client.list_calls(), 1);
    }

    #[test]
    fn latest_tag_matches_untagged_name() {
        assert!(matches_model("llama3.2:latest", "llama3.2"));
        assert!(matches_model("llama3.2:1b", "llama3.2:1b"));
        assert!(!matches_model("llama3.2:1b", "llama3.2"));
    }
}
