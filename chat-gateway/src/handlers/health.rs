use axum::{extract::State, http::StatusCode, Json};

use crate::models::{HealthResponse, RootResponse};
use crate::services::HealthStatus;
use crate::startup::AppState;
use service_core::error::AppError;

/// Service banner with the configured model.
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "LLM chat gateway is running".to_string(),
        model: state.config.model.name.clone(),
    })
}

/// Liveness of the inference backend.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    match state.health.probe().await {
        HealthStatus::Healthy {
            model,
            model_available,
        } => Ok(Json(HealthResponse {
            status: "healthy".to_string(),
            model,
            model_available,
        })),
        HealthStatus::Unavailable { model, reason } => Err(AppError::ServiceUnavailable(format!(
            "Inference backend for model '{}' is unavailable: {}",
            model, reason
        ))),
    }
}

/// Readiness check endpoint for K8s readiness probes.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.health.probe().await.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
