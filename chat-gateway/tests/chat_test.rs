mod common;

use axum::http::StatusCode;
use chat_gateway::services::inference::{InferenceError, MockInferenceClient, MockOutcome};
use common::{post_json, post_raw, router_with};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn timeout() -> InferenceError {
    InferenceError::Timeout("operation timed out".into())
}

#[tokio::test]
async fn chat_returns_backend_text_on_first_success() {
    let client = Arc::new(MockInferenceClient::replying("hi there"));

    let (status, body) = post_json(
        router_with(client.clone()),
        "/chat",
        json!({ "prompt": "hello" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "response": "hi there", "status": "success" }));
    assert_eq!(client.chat_calls(), 1);
}

#[tokio::test]
async fn generate_uses_content_envelope() {
    let client = Arc::new(MockInferenceClient::replying("a haiku"));

    let (status, body) = post_json(
        router_with(client.clone()),
        "/generate",
        json!({ "prompt": "write a haiku" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "content": "a haiku", "status": "success" }));
    assert_eq!(client.chat_calls(), 1);
}

#[tokio::test]
async fn prompt_at_both_bounds_is_accepted() {
    for prompt in ["x".to_string(), "x".repeat(2000)] {
        let client = Arc::new(MockInferenceClient::replying("ok"));
        let (status, _) = post_json(
            router_with(client.clone()),
            "/chat",
            json!({ "prompt": prompt }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(client.chat_calls(), 1);
    }
}

#[tokio::test]
async fn empty_prompt_is_rejected_without_backend_call() {
    for uri in ["/chat", "/generate"] {
        let client = Arc::new(MockInferenceClient::replying("unused"));

        let (status, body) =
            post_json(router_with(client.clone()), uri, json!({ "prompt": "" })).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "error");
        assert_eq!(client.chat_calls(), 0);
    }
}

#[tokio::test]
async fn oversized_prompt_is_rejected_without_backend_call() {
    let client = Arc::new(MockInferenceClient::replying("unused"));

    let (status, body) = post_json(
        router_with(client.clone()),
        "/chat",
        json!({ "prompt": "x".repeat(2001) }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("2000"));
    assert_eq!(client.chat_calls(), 0);
}

#[tokio::test]
async fn missing_prompt_field_is_rejected_without_backend_call() {
    let client = Arc::new(MockInferenceClient::replying("unused"));

    let (status, body) =
        post_json(router_with(client.clone()), "/chat", json!({ "text": "hello" })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid request body");
    assert_eq!(client.chat_calls(), 0);
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let client = Arc::new(MockInferenceClient::replying("unused"));

    let (status, _) = post_raw(router_with(client.clone()), "/chat", "{not json".into()).await;

    assert!(status.is_client_error());
    assert_eq!(client.chat_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_until_success() {
    let client = Arc::new(MockInferenceClient::scripted(
        vec![MockOutcome::Fail(timeout()), MockOutcome::Empty],
        MockOutcome::Reply("third time".into()),
    ));
    let start = Instant::now();

    let (status, body) = post_json(
        router_with(client.clone()),
        "/chat",
        json!({ "prompt": "hello" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "third time");
    assert_eq!(client.chat_calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_return_server_error_with_attempt_count() {
    let client = Arc::new(MockInferenceClient::failing(InferenceError::Network(
        "connection refused".into(),
    )));
    let start = Instant::now();

    let (status, body) = post_json(
        router_with(client.clone()),
        "/chat",
        json!({ "prompt": "hello" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("3 attempts"), "detail was: {}", detail);
    assert!(detail.contains("llama3.2"));
    assert_eq!(client.chat_calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn generate_shares_retry_behavior() {
    let client = Arc::new(MockInferenceClient::failing(timeout()));

    let (status, body) = post_json(
        router_with(client.clone()),
        "/generate",
        json!({ "prompt": "hello" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("3 attempts"));
    assert_eq!(client.chat_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn client_disconnect_does_not_cut_retries_short() {
    let client = Arc::new(MockInferenceClient::failing(timeout()));
    let request = post_json(
        router_with(client.clone()),
        "/chat",
        json!({ "prompt": "hello" }),
    );

    // Caller gives up during the first backoff.
    assert!(tokio::time::timeout(Duration::from_millis(500), request)
        .await
        .is_err());
    assert_eq!(client.chat_calls(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(client.chat_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_do_not_share_retry_state() {
    let client = Arc::new(
        MockInferenceClient::replying("shared backend").with_latency(Duration::from_millis(500)),
    );
    let app = router_with(client.clone());
    let start = Instant::now();

    let requests = (0..4).map(|i| {
        let app = app.clone();
        async move { post_json(app, "/chat", json!({ "prompt": format!("prompt {}", i) })).await }
    });
    let results = spawn_all(requests).await;

    for (status, body) in results {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "shared backend");
    }
    assert_eq!(client.chat_calls(), 4);
    // Handled concurrently: total time is one backend latency, not four.
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

async fn spawn_all<F, T>(futures: impl Iterator<Item = F>) -> Vec<T>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futures.map(tokio::spawn).collect();
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}
