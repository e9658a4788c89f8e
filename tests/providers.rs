mod common;

use common::{generate_path, test_settings};
use recap::narration::NarrationClient;
use recap::transcript::TranscriptClient;
use recap::Error;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

#[tokio::test]
async fn test_transcript_fetch_parses_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transcript"))
        .and(query_param("url", VIDEO_URL))
        .and(query_param("text", "false"))
        .and(header("x-api-key", "transcript-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "credits_remaining": 41,
            "transcript": [
                {"text": "hello", "startTimeText": "0:00", "startMs": 0, "endMs": 1200},
                {"text": "world", "startTimeText": "0:01", "startMs": 1200, "endMs": 2400}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = TranscriptClient::new(&test_settings(&server.uri()));
    let response = client.fetch(VIDEO_URL).await.unwrap();

    assert_eq!(response.credits_remaining, Some(41));
    assert_eq!(response.transcript.len(), 2);
    assert_eq!(response.transcript[0].text, "hello");
    assert_eq!(response.transcript[1].end_ms, 2400);
}

#[tokio::test]
async fn test_transcript_http_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transcript"))
        .respond_with(ResponseTemplate::new(403).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = TranscriptClient::new(&test_settings(&server.uri()));
    let err = client.fetch(VIDEO_URL).await.unwrap_err();

    match err {
        Error::Transport(message) => {
            assert!(message.contains("403"), "unexpected message: {}", message);
            assert!(message.contains("bad key"));
        }
        other => panic!("expected Transport, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transcript_provider_failure_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transcript"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .expect(1)
        .mount(&server)
        .await;

    let client = TranscriptClient::new(&test_settings(&server.uri()));
    let err = client.fetch(VIDEO_URL).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_transcript_missing_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = test_settings(&server.uri());
    settings.transcript_api_key = String::new();

    let err = TranscriptClient::new(&settings).fetch(VIDEO_URL).await.unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_narration_sends_bearer_and_returns_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .and(header("authorization", "Bearer narration-key"))
        .and(body_json(json!({"text": "read this aloud", "voice": "alloy"})))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"riff-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = test_settings(&server.uri());
    settings.voice = "alloy".to_string();

    let payload = NarrationClient::new(&settings)
        .synthesize("read this aloud")
        .await
        .unwrap();
    assert_eq!(payload, b"riff-bytes");
}

#[tokio::test]
async fn test_narration_empty_payload_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let err = NarrationClient::new(&test_settings(&server.uri()))
        .synthesize("read this aloud")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_generation_block_reason_surfaces() {
    let server = MockServer::start().await;
    let settings = test_settings(&server.uri());

    Mock::given(method("POST"))
        .and(path(generate_path(&settings)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = recap::gemini::GeminiClient::new(&settings)
        .generate("summarize this")
        .await
        .unwrap_err();

    match err {
        Error::MalformedResponse(message) => assert!(message.contains("SAFETY")),
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
}
