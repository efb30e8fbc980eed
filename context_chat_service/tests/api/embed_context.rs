use reqwest::multipart::Form;
use serde_json::Value;

use crate::helpers::{image_part, spawn_app, FAKE_CAPTION, UNDECODABLE_IMAGE_MARKER};

#[tokio::test]
async fn embed_context_stores_messages_and_image() {
    let app = spawn_app().await;

    let form = Form::new()
        .text("userId", "alice")
        .text("messages", "I own a cat")
        .text("messages", "Its name is Tom")
        .part("image", image_part("cat.png", b"fake png content"));

    let response = app.embed_context(form).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["caption"], FAKE_CAPTION);
    assert_eq!(body["stored"], 3);

    // The caption and both messages were embedded
    let embedded: Vec<String> = app
        .ollama_requests
        .requests_to("/api/embeddings")
        .iter()
        .map(|request| request.body["prompt"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        embedded,
        vec![FAKE_CAPTION, "I own a cat", "Its name is Tom"]
    );

    let images: Value = app.get_images("alice").await.json().await.unwrap();
    assert_eq!(
        images["images"],
        serde_json::json!([{ "filename": "cat.png", "caption": FAKE_CAPTION }])
    );
}

#[tokio::test]
async fn same_image_filename_is_stored_only_once() {
    let app = spawn_app().await;

    for content in [b"first version".as_slice(), b"second version".as_slice()] {
        let form = Form::new()
            .text("userId", "alice")
            .part("image", image_part("holidays.png", content));

        let response = app.embed_context(form).await;
        assert_eq!(response.status().as_u16(), 200);
    }

    let images: Value = app.get_images("alice").await.json().await.unwrap();
    assert_eq!(images["images"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn embed_context_without_user_id_returns_400_and_stores_nothing() {
    let app = spawn_app().await;

    let test_cases = vec![
        (
            Form::new().text("messages", "I own a cat"),
            "missing user id",
        ),
        (
            Form::new()
                .text("userId", "   ")
                .text("messages", "I own a cat"),
            "blank user id",
        ),
        (
            Form::new()
                .text("userId", "alice/../bob")
                .text("messages", "I own a cat"),
            "user id with a path separator",
        ),
    ];

    for (form, description) in test_cases {
        let response = app.embed_context(form).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload had a {}.",
            description
        );
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    assert!(app.ollama_requests.requests_to("/api/embeddings").is_empty());
    assert!(app.ollama_requests.requests_to("/api/generate").is_empty());
}

#[tokio::test]
async fn image_failing_to_be_captioned_is_skipped() {
    let app = spawn_app().await;

    let mut content = UNDECODABLE_IMAGE_MARKER.to_vec();
    content.extend_from_slice(b" garbage");

    let form = Form::new()
        .text("userId", "alice")
        .text("messages", "I own a cat")
        .part("image", image_part("broken.png", &content));

    let response = app.embed_context(form).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["caption"].is_null());
    assert_eq!(body["stored"], 1);

    let images: Value = app.get_images("alice").await.json().await.unwrap();
    assert!(images["images"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn two_identical_messages_are_stored_as_two_items() {
    let app = spawn_app().await;

    let form = Form::new()
        .text("userId", "alice")
        .text("messages", "I like trains")
        .text("messages", "I like trains");

    let response = app.embed_context(form).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["stored"], 2);

    app.prompt(&serde_json::json!({ "userId": "alice", "message": "What do I like?" }))
        .await;

    let messages = app.last_chat_messages();
    assert_eq!(
        messages[2]["content"],
        "# Retrieved information:\nI like trains\nI like trains"
    );
}

#[tokio::test]
async fn embed_context_with_a_non_multipart_body_returns_400() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(&format!("{}/embed_context", &app.address))
        .json(&serde_json::json!({ "userId": "alice", "messages": ["Hello"] }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}
