//! HTTP-level tests for the OpenAI-compatible backend.
//!
//! Each test stands up a local mock server and checks both what the backend
//! sends and how it classifies the reply.

#![cfg(feature = "openai")]

use serde_json::json;
use studia_core::{Error, GenerationBackend};
use studia_inference::openai::{OpenAIBackend, OpenAIConfig};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> OpenAIBackend {
    let config = OpenAIConfig::default()
        .with_base_url(server.uri())
        .with_api_key("test-key")
        .with_model("test-gen")
        .with_timeout_seconds(5);
    OpenAIBackend::new(config).expect("Failed to create backend")
}

fn chat_reply(content: serde_json::Value, finish_reason: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": finish_reason
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
    })
}

fn error_body(message: &str, error_type: &str, code: Option<&str>) -> serde_json::Value {
    json!({"error": {"message": message, "type": error_type, "code": code}})
}

async fn respond_with(template: ResponseTemplate) -> (MockServer, OpenAIBackend) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(template)
        .mount(&server)
        .await;
    let backend = backend_for(&server);
    (server, backend)
}

#[tokio::test]
async fn test_generate_sends_json_mode_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_partial_json(json!({
            "model": "test-gen",
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": "Return JSON."},
                {"role": "user", "content": "Summarize."}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(json!("{\"ok\":true}"), "stop")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let reply = backend.generate("Return JSON.", "Summarize.").await;

    assert_eq!(reply.unwrap(), "{\"ok\":true}");
}

#[tokio::test]
async fn test_generate_without_json_mode_omits_response_format() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(json!("{}"), "stop")))
        .expect(1)
        .mount(&server)
        .await;

    let config = OpenAIConfig::default()
        .with_base_url(format!("{}/", server.uri()))
        .with_json_mode(false);
    let backend = OpenAIBackend::new(config).unwrap();
    backend.generate("", "hi").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("response_format").is_none());
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unauthorized_halts() {
    let (_server, backend) = respond_with(
        ResponseTemplate::new(401).set_body_json(error_body(
            "Incorrect API key provided",
            "invalid_request_error",
            Some("invalid_api_key"),
        )),
    )
    .await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)), "got {err:?}");
    assert!(err.halts_pipeline());
    assert!(err.to_string().contains("Incorrect API key provided"));
}

#[tokio::test]
async fn test_forbidden() {
    let (_server, backend) = respond_with(
        ResponseTemplate::new(403).set_body_json(error_body("no access", "permission_error", None)),
    )
    .await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)), "got {err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_rate_limited_is_retryable() {
    let (_server, backend) = respond_with(
        ResponseTemplate::new(429).set_body_json(error_body(
            "Rate limit reached",
            "requests",
            Some("rate_limit_exceeded"),
        )),
    )
    .await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::RateLimitExceeded(_)), "got {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_server_error_with_plain_body() {
    let (_server, backend) =
        respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable")).await;

    let err = backend.generate("s", "p").await.unwrap_err();
    match err {
        Error::ServerError(msg) => assert!(msg.contains("upstream unavailable")),
        other => panic!("Expected ServerError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_context_length_exceeded() {
    let (_server, backend) = respond_with(
        ResponseTemplate::new(400).set_body_json(error_body(
            "This model's maximum context length is 128000 tokens",
            "invalid_request_error",
            Some("context_length_exceeded"),
        )),
    )
    .await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::ContextTooLong(_)), "got {err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_payload_too_large() {
    let (_server, backend) = respond_with(ResponseTemplate::new(413)).await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::ContextTooLong(_)), "got {err:?}");
}

#[tokio::test]
async fn test_bad_request() {
    let (_server, backend) = respond_with(
        ResponseTemplate::new(400).set_body_json(error_body(
            "Invalid value for 'temperature'",
            "invalid_request_error",
            None,
        )),
    )
    .await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)), "got {err:?}");
}

#[tokio::test]
async fn test_content_filter_finish_reason() {
    let (_server, backend) = respond_with(
        ResponseTemplate::new(200).set_body_json(chat_reply(json!(""), "content_filter")),
    )
    .await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::SafetyBlocked(_)), "got {err:?}");
}

#[tokio::test]
async fn test_refusal_is_safety_blocked() {
    let reply = json!({
        "choices": [{
            "message": {"role": "assistant", "content": null, "refusal": "I can't help with that."},
            "finish_reason": "stop"
        }]
    });
    let (_server, backend) = respond_with(ResponseTemplate::new(200).set_body_json(reply)).await;

    let err = backend.generate("s", "p").await.unwrap_err();
    match err {
        Error::SafetyBlocked(msg) => assert_eq!(msg, "I can't help with that."),
        other => panic!("Expected SafetyBlocked, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_content_is_empty_response() {
    let (_server, backend) =
        respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(json!("  \n"), "stop")))
            .await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::EmptyResponse), "got {err:?}");
}

#[tokio::test]
async fn test_no_choices_is_empty_response() {
    let (_server, backend) =
        respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []}))).await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::EmptyResponse), "got {err:?}");
}

#[tokio::test]
async fn test_non_json_success_body_is_malformed() {
    let (_server, backend) =
        respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>")).await;

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_timeout_is_retryable_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply(json!("{}"), "stop"))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = OpenAIConfig::default()
        .with_base_url(server.uri())
        .with_timeout_seconds(1);
    let backend = OpenAIBackend::new(config).unwrap();

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::Request(_)), "got {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_server_is_request_error() {
    let config = OpenAIConfig::default()
        .with_base_url("http://127.0.0.1:9")
        .with_timeout_seconds(2);
    let backend = OpenAIBackend::new(config).unwrap();

    let err = backend.generate("s", "p").await.unwrap_err();
    assert!(matches!(err, Error::Request(_)), "got {err:?}");
}
