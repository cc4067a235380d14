//! Integration tests for PistonClient.
//!
//! Uses wiremock for HTTP mocking. Covers the request body, success and
//! failure outcomes, non-2xx statuses, malformed bodies and transport errors.

use arena_common::languages::LanguageConfigManager;
use arena_common::types::Language;
use arena_judge::{ClientError, ExecutionClient, PistonClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn languages() -> LanguageConfigManager {
    LanguageConfigManager::from_json_str(
        r#"{
            "languages": [
                {
                    "name": "javascript",
                    "piston_language": "javascript",
                    "piston_version": "18.15.0",
                    "file_extension": "js",
                    "image": "node:18-alpine",
                    "command": "node",
                    "args": ["/tmp/main.js"],
                    "memory_limit_mb": 256,
                    "cpu_limit": 0.5
                }
            ]
        }"#,
    )
    .expect("valid language config")
}

fn create_client(mock_server: &MockServer) -> PistonClient {
    PistonClient::new(mock_server.uri(), languages()).expect("failed to create client")
}

#[tokio::test]
async fn test_execute_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute"))
        .and(body_partial_json(json!({
            "language": "javascript",
            "version": "18.15.0",
            "files": [{"name": "main.js", "content": "console.log([0, 1])"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "language": "javascript",
            "version": "18.15.0",
            "run": {"stdout": "[ 0, 1 ]\n", "stderr": "", "output": "[ 0, 1 ]\n", "code": 0, "signal": null}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server);
    let outcome = client
        .execute(Language::JavaScript, "console.log([0, 1])")
        .await
        .expect("execute failed");

    assert!(outcome.success);
    assert_eq!(outcome.output, "[ 0, 1 ]\n");
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_execute_runtime_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run": {
                "stdout": "",
                "stderr": "ReferenceError: nums is not defined",
                "output": "ReferenceError: nums is not defined",
                "code": 1,
                "signal": null
            }
        })))
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server);
    let outcome = client
        .execute(Language::JavaScript, "nums")
        .await
        .expect("execute failed");

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("ReferenceError: nums is not defined"));
}

#[tokio::test]
async fn test_execute_http_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server);
    let outcome = client
        .execute(Language::JavaScript, "console.log(1)")
        .await
        .expect("status errors are outcomes, not client errors");

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("HTTP error! status: 429"));
}

#[tokio::test]
async fn test_execute_unsupported_language_skips_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server);
    let outcome = client
        .execute(Language::Java, "class Main {}")
        .await
        .expect("execute failed");

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Unsupported language: java"));
}

#[tokio::test]
async fn test_execute_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&mock_server)
        .await;

    let client = create_client(&mock_server);
    let result = client.execute(Language::JavaScript, "console.log(1)").await;

    assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_execute_connection_refused() {
    // nothing listens on port 1
    let client =
        PistonClient::new("http://127.0.0.1:1", languages()).expect("failed to create client");
    let result = client.execute(Language::JavaScript, "console.log(1)").await;

    assert!(matches!(result, Err(ClientError::Transport(_))));
}
