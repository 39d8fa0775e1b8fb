use axum::{extract::rejection::JsonRejection, extract::State, Json};
use validator::Validate;

use crate::models::{ChatRequest, ChatResponse, GenerateResponse};
use crate::startup::AppState;
use service_core::error::AppError;

/// Validate the prompt and relay it to the configured model.
///
/// Validation failures never reach the backend. Once relayed, the retry
/// sequence completes even if the client goes away.
async fn relay_prompt(
    state: &AppState,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<String, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let text = state
        .relay
        .relay_detached(state.config.model.name.clone(), request.prompt)
        .await?;
    Ok(text)
}

#[tracing::instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let text = relay_prompt(&state, payload).await?;
    Ok(Json(ChatResponse::success(text)))
}

#[tracing::instrument(skip(state, payload))]
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let content = relay_prompt(&state, payload).await?;
    Ok(Json(GenerateResponse::success(content)))
}
