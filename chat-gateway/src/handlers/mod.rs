//! HTTP handlers for the chat gateway.

pub mod chat;
pub mod health;
pub mod metrics;
