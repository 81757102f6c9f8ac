use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tonegate::TransportError;
use tonegate::llm::{AiBackend, AudioClip, BackendSettings, OpenAiBackend, RetryPolicy, RetryingTransport};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer, temperature: f64, max_tokens: u32) -> OpenAiBackend {
    OpenAiBackend::new(BackendSettings {
        api_key: Some("sk-test".into()),
        base_url: server.uri(),
        model: "gpt-4-turbo".into(),
        transcription_model: "whisper-1".into(),
        temperature,
        max_tokens,
        timeout_secs: 10,
        transcription_language: "en".into(),
    })
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn instant_retries() -> RetryPolicy {
    RetryPolicy {
        throttle_base_delay: Duration::ZERO,
        network_base_delay: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn chat_request_carries_clamped_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4-turbo",
            "temperature": 0.7,
            "max_tokens": 1000
        })))
        .respond_with(chat_reply("**1. Overall Sentiment:** Neutral"))
        .expect(1)
        .mount(&server)
        .await;

    let text = backend(&server, 3.0, 5000)
        .complete("system", "Analyze this text: \"hi\"")
        .await
        .unwrap();
    assert_eq!(text, "**1. Overall Sentiment:** Neutral");
}

#[tokio::test]
async fn throttle_response_exposes_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = backend(&server, 0.5, 500)
        .complete("system", "hello")
        .await
        .unwrap_err();
    match err {
        TransportError::Throttled {
            retry_after_secs, ..
        } => assert_eq!(retry_after_secs, Some(7)),
        other => panic!("expected throttle, got {other:?}"),
    }
}

#[tokio::test]
async fn retrying_transport_recovers_after_throttle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(chat_reply("recovered"))
        .with_priority(2)
        .mount(&server)
        .await;

    let transport = RetryingTransport::new(Arc::new(backend(&server, 0.5, 500)), instant_retries());
    assert_eq!(transport.complete("system", "hello").await.unwrap(), "recovered");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unauthorized_is_not_retried_and_body_is_scrubbed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"error":"invalid key sk-abcdef1234567890"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = RetryingTransport::new(Arc::new(backend(&server, 0.5, 500)), instant_retries());
    let err = transport.complete("system", "hello").await.unwrap_err();
    match err {
        TransportError::Http {
            status, message, ..
        } => {
            assert_eq!(status, 401);
            assert!(!message.contains("abcdef1234567890"));
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_exhaust_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let transport = RetryingTransport::new(Arc::new(backend(&server, 0.5, 500)), instant_retries());
    let err = transport.complete("system", "hello").await.unwrap_err();
    assert!(matches!(err, TransportError::Exhausted { attempts: 3, .. }));
}

#[tokio::test]
async fn transcription_uploads_multipart_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "hello there" })))
        .expect(1)
        .mount(&server)
        .await;

    let clip = AudioClip::new("memo.webm", "audio/webm", vec![0x1a, 0x45, 0xdf, 0xa3]);
    let text = backend(&server, 0.5, 500).transcribe(&clip).await.unwrap();
    assert_eq!(text, "hello there");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("whisper-1"));
    assert!(body.contains("memo.webm"));
}
