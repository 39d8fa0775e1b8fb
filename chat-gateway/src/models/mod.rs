//! Request and response bodies of the HTTP surface.

pub mod chat;

pub use chat::{
    ChatRequest, ChatResponse, GenerateResponse, HealthResponse, ResponseStatus, RootResponse,
    MAX_PROMPT_CHARS,
};
