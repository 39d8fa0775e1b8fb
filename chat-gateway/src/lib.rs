//! chat-gateway: HTTP relay from chat prompts to a local LLM backend.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState, Application};
