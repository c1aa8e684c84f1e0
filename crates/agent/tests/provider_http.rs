//! HTTP contract tests for the provider adapters against wiremock servers.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use triad_agent::providers::{http_client, AnthropicProvider, OpenAiProvider, VertexProvider};
use triad_agent::PlanProvider;
use triad_core::errors::ProviderError;

const PLAN: &str = r#"{"meta":{"summary":"panel"}}"#;

fn openai(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(
        http_client(5).expect("client"),
        "sk-test".to_string().into(),
        "gpt-4.1-mini",
        format!("{}/v1", server.uri()),
    )
}

fn anthropic(server: &MockServer) -> AnthropicProvider {
    AnthropicProvider::new(
        http_client(5).expect("client"),
        "sk-ant-test".to_string().into(),
        "claude-3-5-sonnet-20240620",
        format!("{}/v1", server.uri()),
        4096,
    )
}

fn vertex(server: &MockServer) -> VertexProvider {
    VertexProvider::new(
        http_client(5).expect("client"),
        "ya29.test".to_string().into(),
        "boots-pos",
        "asia-southeast1",
        "gemini-1.5-pro",
    )
    .with_base_url(server.uri())
}

#[tokio::test]
async fn openai_posts_responses_request_and_reads_output_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4.1-mini", "temperature": 0.2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output_text": PLAN })))
        .expect(1)
        .mount(&server)
        .await;

    let text = openai(&server).complete("Intent: panel").await.expect("completion");

    assert_eq!(text, PLAN);
}

#[tokio::test]
async fn openai_unauthorized_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let error = openai(&server).complete("p").await.expect_err("auth");

    assert!(matches!(error, ProviderError::Auth(ref m) if m.starts_with("OpenAI 401")));
}

#[tokio::test]
async fn anthropic_sends_version_header_and_joins_text_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({ "max_tokens": 4096 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                { "type": "text", "text": "{\"meta\":" },
                { "type": "text", "text": "{}}" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = anthropic(&server).complete("p").await.expect("completion");

    assert_eq!(text, "{\"meta\":\n{}}");
}

#[tokio::test]
async fn anthropic_server_error_is_redacted_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(529).set_body_string("overloaded; contact oncall@anthropic.example"),
        )
        .mount(&server)
        .await;

    let error = anthropic(&server).complete("p").await.expect_err("transport");

    let ProviderError::Transport(message) = error else {
        panic!("expected transport error");
    };
    assert!(message.contains("Anthropic 529"));
    assert!(message.contains("[REDACTED_EMAIL]"));
    assert!(!message.contains("oncall@anthropic.example"));
}

#[tokio::test]
async fn vertex_calls_generate_content_for_configured_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/v1/projects/boots-pos/locations/asia-southeast1/publishers/google/models/gemini-1.5-pro:generateContent",
        ))
        .and(header("Authorization", "Bearer ya29.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": PLAN }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = vertex(&server).complete("p").await.expect("completion");

    assert_eq!(text, PLAN);
}

#[tokio::test]
async fn vertex_forbidden_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&server)
        .await;

    let error = vertex(&server).complete("p").await.expect_err("auth");

    assert!(matches!(error, ProviderError::Auth(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_error() {
    let provider = OpenAiProvider::new(
        http_client(2).expect("client"),
        "sk-test".to_string().into(),
        "gpt-4.1-mini",
        "http://127.0.0.1:1/v1",
    );

    let error = provider.complete("p").await.expect_err("transport");

    assert!(matches!(error, ProviderError::Transport(ref m) if m.contains("OpenAI request failed")));
}
