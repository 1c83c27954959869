//! Authentication Tests
//!
//! Tokens come from an external issuer; the relay only verifies them.

use axum::http::StatusCode;

use crate::common::{json_body, token_for, token_with_secret, TestApp};

#[tokio::test]
async fn test_history_without_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, json) = json_body(app.get("/api/chat/history?target_id=2").await).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], 401);
    assert_eq!(json["msg"], "Missing token");
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = TestApp::new().await;
    let token = token_with_secret(1, "alice", "some-other-secret-that-is-long-enough");

    let response = app.get_auth("/api/chat/history?target_id=2", &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = TestApp::new().await;

    let response = app.get_auth("/api/chat/history?target_id=2", "not.a.jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = TestApp::new().await;

    let response = app
        .get_auth("/api/chat/history?target_id=2", &token_for(1, "alice"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_query_token_is_accepted() {
    let app = TestApp::new().await;
    let uri = format!(
        "/api/chat/history?target_id=2&token={}",
        token_for(1, "alice")
    );

    let response = app.get(&uri).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_websocket_route_requires_token() {
    let app = TestApp::new().await;

    let response = app.get("/api/ws").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
