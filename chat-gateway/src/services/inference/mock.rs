//! Scripted inference backend for tests and offline runs.

use super::{ChatCompletion, ChatMessage, InferenceClient, InferenceError, ModelInfo};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What a single mocked chat call yields.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Reply(String),
    /// Reply with the last message of the request.
    Echo,
    /// Well-formed reply without message content.
    Empty,
    Fail(InferenceError),
}

impl MockOutcome {
    fn into_result(self, messages: &[ChatMessage]) -> Result<ChatCompletion, InferenceError> {
        match self {
            MockOutcome::Reply(text) => Ok(ChatCompletion::from_text(text)),
            MockOutcome::Echo => Ok(ChatCompletion::from_text(
                messages
                    .last()
                    .map(|m| format!("Mock response for: {}", m.content))
                    .unwrap_or_default(),
            )),
            MockOutcome::Empty => Ok(ChatCompletion::default()),
            MockOutcome::Fail(err) => Err(err),
        }
    }
}

/// Mock backend. Scripted outcomes are consumed in order; once the script
/// runs out every call yields the fallback outcome.
pub struct MockInferenceClient {
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: MockOutcome,
    models: Result<Vec<ModelInfo>, InferenceError>,
    latency: Duration,
    chat_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MockInferenceClient {
    /// Always replies with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_fallback(MockOutcome::Reply(text.into()))
    }

    /// Always fails with `error`.
    pub fn failing(error: InferenceError) -> Self {
        Self::with_fallback(MockOutcome::Fail(error))
    }

    /// Yields `script` in order, then `fallback` forever.
    pub fn scripted(script: Vec<MockOutcome>, fallback: MockOutcome) -> Self {
        let mut client = Self::with_fallback(fallback);
        client.script = Mutex::new(script.into());
        client
    }

    /// Echoes the last user message back. Used by the `mock` backend kind.
    pub fn echo() -> Self {
        Self::with_fallback(MockOutcome::Echo)
    }

    fn with_fallback(fallback: MockOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            models: Ok(Vec::new()),
            latency: Duration::ZERO,
            chat_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Models reported by `list_models`.
    pub fn with_models<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Ok(names
            .into_iter()
            .map(|name| ModelInfo { name: name.into() })
            .collect());
        self
    }

    /// Make `list_models` fail.
    pub fn with_unavailable_models(mut self, error: InferenceError) -> Self {
        self.models = Err(error);
        self
    }

    /// Delay every chat call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> MockOutcome {
        let mut script = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        script.pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn chat(
        &self,
        _model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatCompletion, InferenceError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.next_outcome().into_result(messages)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, InferenceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.models.clone()
    }
}
