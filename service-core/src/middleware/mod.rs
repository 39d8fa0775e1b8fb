//! Axum middleware shared by the gateway router.

pub mod metrics;
pub mod tracing;
