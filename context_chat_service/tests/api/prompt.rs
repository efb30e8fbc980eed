use reqwest::multipart::Form;
use serde_json::{json, Value};

use crate::helpers::{spawn_app, TestApp, FAKE_CHAT_ANSWER};

async fn ingest_messages(app: &TestApp, user_id: &str, messages: &[&str]) {
    let mut form = Form::new().text("userId", user_id.to_string());
    for message in messages {
        form = form.text("messages", message.to_string());
    }

    let response = app.embed_context(form).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn prompt_returns_the_answer_of_the_chat_model() {
    let app = spawn_app().await;
    ingest_messages(&app, "alice", &["I own a cat named Tom"]).await;

    let response = app
        .prompt(&json!({ "userId": "alice", "message": "What is my pet?" }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "response": FAKE_CHAT_ANSWER }));

    let chat_requests = app.ollama_requests.requests_to("/api/chat");
    assert_eq!(chat_requests.len(), 1);
    assert_eq!(chat_requests[0].body["stream"], false);

    let messages = app.last_chat_messages();
    let roles: Vec<&str> = messages
        .iter()
        .map(|message| message["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "assistant"]);
    assert!(messages[0]["content"]
        .as_str()
        .unwrap()
        .contains("# Role and Purpose:"));
    assert_eq!(messages[1]["content"], "# User question:\nWhat is my pet?");
    assert_eq!(
        messages[2]["content"],
        "# Retrieved information:\nI own a cat named Tom"
    );
    assert_eq!(messages[3]["content"], "");
}

#[tokio::test]
async fn prompt_forwards_at_most_three_retrieved_items() {
    let app = spawn_app().await;
    ingest_messages(
        &app,
        "alice",
        &[
            "I live in Lyon",
            "I work as a baker",
            "My sister is called Anna",
            "I play the violin",
            "My favorite color is green",
        ],
    )
    .await;

    let response = app
        .prompt(&json!({ "userId": "alice", "message": "Tell me about myself" }))
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let messages = app.last_chat_messages();
    let context_block = messages[2]["content"]
        .as_str()
        .unwrap()
        .strip_prefix("# Retrieved information:\n")
        .unwrap();
    assert_eq!(context_block.lines().count(), 3);
}

#[tokio::test]
async fn prompt_on_an_empty_collection_forwards_an_empty_context() {
    let app = spawn_app().await;

    let response = app
        .prompt(&json!({ "userId": "newcomer", "message": "Who am I?" }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let messages = app.last_chat_messages();
    assert_eq!(messages[2]["content"], "# Retrieved information:\n");
}

#[tokio::test]
async fn prompt_only_retrieves_the_context_of_the_user() {
    let app = spawn_app().await;
    ingest_messages(&app, "alice", &["My password hint is blue"]).await;

    app.prompt(&json!({ "userId": "bob", "message": "What is my password hint?" }))
        .await;

    let messages = app.last_chat_messages();
    assert_eq!(messages[2]["content"], "# Retrieved information:\n");
}

#[tokio::test]
async fn prompt_returns_400_when_data_is_missing() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({ "message": "What is my pet?" }), "missing user id"),
        (json!({ "userId": "alice" }), "missing message"),
        (json!({ "userId": "alice", "message": "  " }), "blank message"),
        (json!({ "userId": "", "message": "What is my pet?" }), "empty user id"),
    ];

    for (body, description) in test_cases {
        let response = app.prompt(&body).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload had a {}.",
            description
        );
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    assert!(app.ollama_requests.requests_to("/api/chat").is_empty());
}

#[tokio::test]
async fn prompt_with_a_malformed_body_returns_a_json_400() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(&format!("{}/prompt", &app.address))
        .header("Content-Type", "application/json")
        .body("{ not json")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}
