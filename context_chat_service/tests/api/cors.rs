use reqwest::Method;

use crate::helpers::{spawn_app, spawn_app_with};

const FRONTEND_ORIGIN: &str = "http://localhost:3000";

fn allowed_origin(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get("access-control-allow-origin")
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn preflight_requests_from_any_origin_are_allowed_by_default() {
    let app = spawn_app().await;

    for path in ["/embed_context", "/prompt", "/get_images"] {
        let response = app
            .api_client
            .request(Method::OPTIONS, &format!("{}{}", &app.address, path))
            .header("Origin", FRONTEND_ORIGIN)
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .expect("Failed to execute request.");

        assert!(
            response.status().is_success(),
            "The preflight request to {} failed with {}.",
            path,
            response.status()
        );
        assert_eq!(allowed_origin(&response), Some(FRONTEND_ORIGIN));
    }
}

#[tokio::test]
async fn responses_to_cross_origin_requests_allow_the_origin() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .get(&format!("{}/get_images", &app.address))
        .query(&[("userId", "alice")])
        .header("Origin", FRONTEND_ORIGIN)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(allowed_origin(&response), Some(FRONTEND_ORIGIN));
}

#[tokio::test]
async fn only_the_configured_origins_are_allowed() {
    let app = spawn_app_with(|c| {
        c.application.cors_allowed_origins = vec![FRONTEND_ORIGIN.to_string()];
    })
    .await;

    let preflight = |origin: &'static str| {
        app.api_client
            .request(Method::OPTIONS, &format!("{}/prompt", &app.address))
            .header("Origin", origin)
            .header("Access-Control-Request-Method", "POST")
            .send()
    };

    let allowed_response = preflight(FRONTEND_ORIGIN)
        .await
        .expect("Failed to execute request.");
    assert!(allowed_response.status().is_success());
    assert_eq!(allowed_origin(&allowed_response), Some(FRONTEND_ORIGIN));

    let rejected_response = preflight("http://evil.example.com")
        .await
        .expect("Failed to execute request.");
    assert_eq!(allowed_origin(&rejected_response), None);
}
