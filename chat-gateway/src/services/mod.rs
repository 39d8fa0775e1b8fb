pub mod health;
pub mod inference;
pub mod metrics;
pub mod relay;

pub use health::{HealthProbe, HealthStatus};
pub use inference::{InferenceClient, InferenceError, MockInferenceClient, OllamaClient};
pub use relay::{RelayError, RetryingRelay};
