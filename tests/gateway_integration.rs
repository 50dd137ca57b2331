//! Integration tests for the multimodal gateway client
//!
//! Exercises `MultimodalClient` against a wiremock server: auth header,
//! payload shape, response parsing, and error mapping. The final test runs
//! the whole submit pipeline (orchestrator + real client + store) against
//! the mock.

use inspectra::config::GatewayConfig;
use inspectra::gateway::{ChatMessage, Gateway, MultimodalClient};
use inspectra::orchestrator::{Orchestrator, SubmitOutcome};
use inspectra::storage::SqliteStore;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn client_for(server_uri: &str) -> MultimodalClient {
    let config = GatewayConfig {
        api_key: Some("sk-test".to_string()),
        endpoint: format!("{}/v1/chat", server_uri),
        ..Default::default()
    };
    MultimodalClient::new(config).expect("client creation failed")
}

#[tokio::test]
async fn test_sends_bearer_auth_and_parses_flat_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": "OK",
            "usage": {"total_tokens": 10}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let reply = client
        .send("q", None, &[], "sys")
        .await
        .expect("send failed");

    assert_eq!(reply.content, "OK");
    assert_eq!(reply.usage.total_tokens, 10);
    assert_eq!(reply.usage.prompt_tokens, 0);
    assert_eq!(reply.usage.completion_tokens, 0);
}

#[tokio::test]
async fn test_parses_choices_nested_content_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "A cracked housing."}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let reply = client
        .send("Assess the damage", None, &[], "sys")
        .await
        .expect("send failed");

    assert_eq!(reply.content, "A cracked housing.");
    assert_eq!(reply.usage.prompt_tokens, 100);
    assert_eq!(reply.usage.completion_tokens, 50);
    assert_eq!(reply.usage.total_tokens, 150);
    assert!(reply.usage.latency >= 0.0);
}

#[tokio::test]
async fn test_payload_shape_and_history_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "ok"})))
        .mount(&server)
        .await;

    let history = vec![
        ChatMessage::user("first question"),
        ChatMessage::assistant("first answer"),
    ];
    let client = client_for(&server.uri());
    client
        .send("second question", Some(PNG_MAGIC), &history, "system text")
        .await
        .expect("send failed");

    let requests = server.received_requests().await.expect("no requests recorded");
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("body not json");

    assert_eq!(body["stream"], false);
    assert_eq!(body["max_tokens"], 2048);

    let messages = body["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], "system text");
    assert_eq!(messages[1]["content"], "first question");
    assert_eq!(messages[2]["content"], "first answer");

    // Final user entry: text part plus the inline image part
    let parts = messages[3]["content"].as_array().expect("parts array");
    assert_eq!(parts[0]["type"], "text");
    assert_eq!(parts[0]["text"], "second question");
    assert_eq!(parts[1]["type"], "image_url");
    assert!(parts[1]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_no_image_omits_image_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "ok"})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    client
        .send("question", None, &[], "sys")
        .await
        .expect("send failed");

    let requests = server.received_requests().await.expect("no requests recorded");
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("body not json");
    let parts = body["messages"][1]["content"].as_array().expect("parts");
    assert_eq!(parts.len(), 1);
}

#[tokio::test]
async fn test_missing_content_yields_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "resp-1"})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let reply = client.send("q", None, &[], "sys").await.expect("send failed");
    assert_eq!(reply.content, "no content");
    assert_eq!(reply.usage.total_tokens, 0);
}

#[tokio::test]
async fn test_non_success_status_surfaces_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string(r#"{"error": "model overloaded"}"#),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client
        .send("q", None, &[], "sys")
        .await
        .expect_err("expected upstream error");

    let message = format!("{}", err);
    assert!(message.contains("Upstream error"));
    assert!(message.contains("model overloaded"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connection_failure() {
    let config = GatewayConfig {
        api_key: Some("sk-test".to_string()),
        endpoint: "http://127.0.0.1:1/chat".to_string(),
        ..Default::default()
    };
    let client = MultimodalClient::new(config).expect("client creation failed");

    let err = client
        .send("q", None, &[], "sys")
        .await
        .expect_err("expected connection failure");
    assert!(format!("{}", err).contains("Connection failed"));
}

#[tokio::test]
async fn test_malformed_body_is_connection_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client
        .send("q", None, &[], "sys")
        .await
        .expect_err("expected parse failure");
    assert!(format!("{}", err).contains("Connection failed"));
}

#[tokio::test]
async fn test_full_submit_pipeline_against_mock() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Bearing shows spalling on the outer race."}}],
            "usage": {"prompt_tokens": 200, "completion_tokens": 40, "total_tokens": 240}
        })))
        .mount(&server)
        .await;

    let dir = tempdir().expect("tempdir failed");
    let store = SqliteStore::new_with_path(dir.path().join("test.db")).expect("store failed");
    let client = client_for(&server.uri());
    let orchestrator =
        Orchestrator::new(store, Box::new(client), dir.path().join("assets"))
            .expect("orchestrator failed");

    let ctx = orchestrator.new_session().expect("session failed");
    orchestrator
        .upload_image(&ctx, PNG_MAGIC)
        .expect("upload failed");

    let outcome = orchestrator
        .submit(&ctx, "Assess bearing wear", None)
        .await
        .expect("submit failed");

    match outcome {
        SubmitOutcome::Answered { content, usage } => {
            assert_eq!(content, "Bearing shows spalling on the outer race.");
            assert_eq!(usage.total_tokens, 240);
        }
        other => panic!("Expected answer, got {:?}", other),
    }

    let history = orchestrator
        .store()
        .get_history(&ctx.session_id)
        .expect("history failed");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].usage.expect("usage missing").total_tokens, 240);

    // The stored user question reached the wire inside the final message
    let requests = server.received_requests().await.expect("no requests");
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("body not json");
    let parts = body["messages"].as_array().unwrap().last().unwrap()["content"]
        .as_array()
        .expect("parts");
    assert_eq!(parts[0]["text"], "Assess bearing wear");
}
