//! Chat completion requests against a mock provider.

mod common;

use common::{outcome, USERS_V1, USERS_V2};
use serde_json::json;
use sql_diff_cli::ai::AiClient;
use sql_diff_cli::config::AiConfig;
use sql_diff_core::Dialect;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> AiConfig {
    AiConfig {
        enabled: true,
        provider: "openai".to_string(),
        api_key: "sk-test".to_string(),
        api_endpoint: format!("{}/v1/", server.uri()),
        model: "test-model".to_string(),
        timeout: 5,
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

#[tokio::test]
async fn test_analyze_posts_chat_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "test-model", "stream": false})))
        .and(body_string_contains("ADD COLUMN email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "## Summary\nAdds email.\n\n## Risks\n- Table lock\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = outcome(USERS_V1, USERS_V2, &Dialect::mysql());
    let client = AiClient::new(&config(&server)).unwrap();
    let analysis = client
        .analyze(USERS_V1, USERS_V2, &outcome.report, &outcome.plan)
        .await
        .unwrap();

    assert_eq!(analysis.summary, "Adds email.");
    assert_eq!(analysis.risks, vec!["Table lock"]);
}

#[tokio::test]
async fn test_generate_create_table_strips_fences() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("blog posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "Here you go:\n```sql\nCREATE TABLE posts (id INT PRIMARY KEY);\n```",
        )))
        .mount(&server)
        .await;

    let client = AiClient::new(&config(&server)).unwrap();
    let sql = client.generate_create_table("blog posts").await.unwrap();
    assert_eq!(sql, "CREATE TABLE posts (id INT PRIMARY KEY)");
}

#[tokio::test]
async fn test_generate_alter_table_sends_current_ddl() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("CREATE TABLE users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("ALTER TABLE users ADD COLUMN age INT;")),
        )
        .mount(&server)
        .await;

    let client = AiClient::new(&config(&server)).unwrap();
    let sql = client
        .generate_alter_table(USERS_V1, "add an age column")
        .await
        .unwrap();
    assert_eq!(sql, "ALTER TABLE users ADD COLUMN age INT");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = AiClient::new(&config(&server)).unwrap();
    let err = client.generate_create_table("users").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("openai API error"), "{message}");
    assert!(message.contains("401"), "{message}");
    assert!(message.contains("invalid api key"), "{message}");
}

#[tokio::test]
async fn test_missing_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "chatcmpl-1"})))
        .mount(&server)
        .await;

    let client = AiClient::new(&config(&server)).unwrap();
    let err = client.generate_create_table("users").await.unwrap_err();
    assert_eq!(err.to_string(), "API returned an empty response");
}

#[tokio::test]
async fn test_malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = AiClient::new(&config(&server)).unwrap();
    assert!(client.generate_create_table("users").await.is_err());
}
