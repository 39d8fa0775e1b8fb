//! Application startup and lifecycle management.
//!
//! Builds the shared state from `GatewayConfig`, wires the HTTP router and
//! runs the server until a shutdown signal arrives.

use crate::config::{BackendKind, CorsConfig, GatewayConfig};
use crate::handlers;
use crate::services::inference::{MockInferenceClient, OllamaConfig};
use crate::services::{HealthProbe, InferenceClient, OllamaClient, RetryingRelay};
use axum::{
    http::{HeaderValue, Request},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state. Cloned per request; everything inside is
/// immutable or internally synchronized.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub relay: RetryingRelay,
    pub health: HealthProbe,
}

impl AppState {
    pub fn new(config: GatewayConfig, client: Arc<dyn InferenceClient>) -> Self {
        let relay = RetryingRelay::new(client.clone(), config.relay.retry_config());
        let health = HealthProbe::new(client, config.model.name.clone());

        Self {
            config: Arc::new(config),
            relay,
            health,
        }
    }
}

/// Construct the inference backend selected by configuration.
pub fn build_inference_client(config: &GatewayConfig) -> Result<Arc<dyn InferenceClient>, AppError> {
    let client: Arc<dyn InferenceClient> = match config.model.backend {
        BackendKind::Ollama => {
            let client = OllamaClient::new(OllamaConfig {
                base_url: config.model.base_url.clone(),
                request_timeout: Duration::from_secs(config.model.request_timeout_secs),
            })
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
            Arc::new(client)
        }
        BackendKind::Mock => {
            tracing::warn!("Using mock inference backend; replies are canned");
            Arc::new(MockInferenceClient::echo().with_models([config.model.name.clone()]))
        }
    };

    tracing::info!(
        model = %config.model.name,
        backend = ?config.model.backend,
        base_url = %config.model.base_url,
        "Initialized inference client"
    );

    Ok(client)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    // Credentials rule out wildcards, so methods and headers are mirrored.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/chat", post(handlers::chat::chat))
        .route("/generate", post(handlers::chat::generate))
        .route("/metrics", get(handlers::metrics::metrics))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(cors)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the configured inference backend.
    pub async fn build(config: GatewayConfig) -> Result<Self, AppError> {
        let client = build_inference_client(&config)?;
        Self::build_with_client(config, client).await
    }

    /// Build the application around an existing inference client.
    pub async fn build_with_client(
        config: GatewayConfig,
        client: Arc<dyn InferenceClient>,
    ) -> Result<Self, AppError> {
        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            model = %config.model.name,
            max_attempts = config.relay.max_attempts,
            backoff_ms = config.relay.backoff_ms,
            "Chat gateway listening"
        );

        Ok(Self {
            port,
            listener,
            state: AppState::new(config, client),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}
