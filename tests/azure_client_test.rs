//! End-to-end client tests against a mock Azure OpenAI endpoint

#[path = "support/stream_fixture.rs"]
mod support;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use siumai_azure_stream::prelude::*;
use support::{sse_body, text_of};
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_VERSION: &str = "2024-12-01-preview";

fn chat_path(deployment: &str) -> String {
    format!("/openai/deployments/{deployment}/chat/completions")
}

fn sse(name: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(sse_body(name))
}

fn key_config(server: &MockServer, deployment: &str) -> AzureConfig {
    AzureConfig::new(server.uri(), deployment)
        .with_api_key("test-key")
        .with_retry_policy(RetryPolicy::none())
}

async fn drain(stream: ChatStream) -> Vec<Result<StreamEvent, ClassifiedError>> {
    stream.collect().await
}

#[tokio::test]
async fn streams_text_reasoning_and_usage_with_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(chat_path("o3-mini")))
        .and(query_param("api-version", API_VERSION))
        .and(header("api-key", "test-key"))
        .and(header("accept", "text/event-stream"))
        .respond_with(sse("text_reasoning_usage.sse"))
        .expect(1)
        .mount(&server)
        .await;

    let client = AzureChatClient::new(key_config(&server, "o3-mini"));
    let items = drain(client.create_message("Be brief.", vec![Message::user("Hi")], None)).await;
    let events: Vec<StreamEvent> = items.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(text_of(&events), "Hello there!");
    match events.last() {
        Some(StreamEvent::Usage(usage)) => {
            assert_eq!(usage.input_tokens, 2000);
            assert!(usage.total_cost.is_some());
        }
        other => panic!("expected usage last, got {other:?}"),
    }
}

#[tokio::test]
async fn identity_auth_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(chat_path("gpt-4o")))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(sse("tool_call_split.sse"))
        .expect(1)
        .mount(&server)
        .await;

    let config = AzureConfig::new(server.uri(), "gpt-4o")
        .with_identity(Arc::new(StaticTokenProvider::new("token-123")));
    let client = AzureChatClient::new(config);
    let items = drain(client.create_message("", vec![Message::user("Weather?")], None)).await;

    let completed: Vec<CompletedToolCall> = items
        .into_iter()
        .filter_map(|r| match r.unwrap() {
            StreamEvent::ToolCallComplete(call) => Some(call),
            _ => None,
        })
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].name, "get_weather");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("api-key").is_none());
}

#[tokio::test]
async fn deployment_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(chat_path("missing-dep")))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"error":{"code":"DeploymentNotFound","message":"The API deployment for this resource does not exist."}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    // Default policy would retry transient failures; a 404 must not be.
    let config = AzureConfig::new(server.uri(), "missing-dep").with_api_key("k");
    let client = AzureChatClient::new(config);
    let items = drain(client.create_message("", vec![Message::user("Hi")], None)).await;

    assert_eq!(items.len(), 1);
    let err = items[0].as_ref().unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.status, Some(404));
    assert!(!err.retryable);
    assert!(err.message.contains("missing-dep"));
}

#[tokio::test]
async fn identity_unauthorized_suggests_reauthentication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"error":{"code":"401","message":"Unauthorized. Access token is missing, invalid, audience is incorrect, or have expired."}}"#,
        ))
        .mount(&server)
        .await;

    let config = AzureConfig::new(server.uri(), "gpt-4o")
        .with_identity(Arc::new(StaticTokenProvider::new("stale")));
    let client = AzureChatClient::new(config);
    let items = drain(client.create_message("", vec![Message::user("Hi")], None)).await;

    let err = items[0].as_ref().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Auth);
    assert!(err.message.contains("az login"));
}

#[tokio::test]
async fn configuration_errors_surface_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // API-key mode without a key.
    let client = AzureChatClient::new(AzureConfig::new(server.uri(), "gpt-4o"));
    let items = drain(client.create_message("", vec![Message::user("Hi")], None)).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap_err().kind, ErrorKind::Configuration);

    // Invalid tool schema is rejected while shaping.
    let client = AzureChatClient::new(key_config(&server, "gpt-4o"));
    let tools = vec![ToolSchema::new("bad", "", serde_json::json!("not a schema"))];
    let items = drain(client.create_message("", vec![Message::user("Hi")], Some(tools))).await;
    assert_eq!(items[0].as_ref().unwrap_err().kind, ErrorKind::Configuration);
}

#[tokio::test]
async fn reasoning_deployment_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(chat_path("o1-mini")))
        .respond_with(sse("malformed_chunk.sse"))
        .mount(&server)
        .await;

    let config = key_config(&server, "o1-mini").with_reasoning_effort(ReasoningEffort::Low);
    let client = AzureChatClient::new(config);
    let tools = vec![ToolSchema::without_parameters("now", "Current time")];
    let items = drain(client.create_message(
        "Be terse.",
        vec![Message::user("What time is it?")],
        Some(tools),
    ))
    .await;
    assert!(items.iter().all(Result::is_ok));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["stream"], true);
    assert_eq!(body["stream_options"]["include_usage"], true);
    assert_eq!(body["reasoning_effort"], "low");
    assert!(body.get("temperature").is_none());
    assert!(body.get("model").is_none());
    assert_eq!(body["messages"][0]["role"], "developer");
    assert_eq!(body["messages"][0]["content"], "Be terse.");
    assert_eq!(body["tools"][0]["function"]["name"], "now");
}

#[tokio::test]
async fn regular_deployment_sends_zero_temperature_and_system_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse("malformed_chunk.sse"))
        .mount(&server)
        .await;

    let client = AzureChatClient::new(key_config(&server, "gpt-4o"));
    drain(client.create_message("Be terse.", vec![Message::user("Hi")], None)).await;

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["temperature"], 0.0);
    assert!(body.get("reasoning_effort").is_none());
    assert!(body.get("tools").is_none());
    assert_eq!(body["messages"][0]["role"], "system");
}

#[tokio::test]
async fn in_stream_error_ends_stream_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse("error_chunk.sse"))
        .expect(1)
        .mount(&server)
        .await;

    let config = AzureConfig::new(server.uri(), "gpt-4o")
        .with_api_key("k")
        .with_retry_policy(RetryPolicy::default().with_initial_delay(Duration::from_millis(1)));
    let client = AzureChatClient::new(config);
    let items = drain(client.create_message("", vec![Message::user("Hi")], None)).await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &StreamEvent::text("Partial"));
    let err = items[1].as_ref().unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
}

#[tokio::test]
async fn cancel_interrupts_a_pending_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_exists("api-key"))
        .respond_with(sse("text_reasoning_usage.sse").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let client = AzureChatClient::new(key_config(&server, "gpt-4o"));
    let mut handle = client.create_message_with_cancel("", vec![Message::user("Hi")], None);

    let cancel = handle.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let next = tokio::time::timeout(Duration::from_secs(5), handle.stream.next())
        .await
        .expect("cancellation should end the stream promptly");
    assert!(next.is_none());
    assert!(handle.cancel.is_cancelled());
}
