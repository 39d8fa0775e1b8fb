//! Prometheus metrics for the chat gateway.
//!
//! HTTP request metrics come from `service_core::middleware::metrics`; this
//! module adds relay counters and owns the exporter handle.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;

    if METRICS_HANDLE.set(handle).is_err() {
        tracing::warn!("Metrics recorder already initialized");
    }

    Ok(())
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record one backend attempt (`success` or `failure`).
pub fn record_attempt(outcome: &'static str) {
    counter!("relay_attempts_total", "outcome" => outcome).increment(1);
}

/// Record the final outcome of a relay call (`success` or `exhausted`).
pub fn record_relay(outcome: &'static str) {
    counter!("relay_requests_total", "outcome" => outcome).increment(1);
}
