//! Conversation History Tests

use axum::http::StatusCode;
use chat_relay::domain::{EventKind, MediaKind, MessageStore, NewMessage};
use chat_relay::infrastructure::cache::ConversationCache;

use crate::common::{json_body, token_for, TestApp};

async fn seed(app: &TestApp, from: u64, to: u64, content: &str) {
    app.state
        .store
        .insert(&NewMessage {
            from_user_id: from,
            to_user_id: to,
            content: content.to_string(),
            kind: EventKind::SingleChat,
            media: MediaKind::Text,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_history_is_newest_first_in_envelope() {
    let app = TestApp::new().await;
    seed(&app, 1, 2, "first").await;
    seed(&app, 2, 1, "second").await;
    seed(&app, 1, 3, "other conversation").await;
    seed(&app, 1, 2, "third").await;

    let (status, json) = json_body(
        app.get_auth("/api/chat/history?target_id=2", &token_for(1, "alice"))
            .await,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], 0);
    assert_eq!(json["msg"], "success");
    assert!(json.get("message").is_none());
    let items = json["data"].as_array().unwrap();
    let contents: Vec<&str> = items.iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["third", "second", "first"]);
    assert_eq!(items[0]["type"], 2);
    assert_eq!(items[0]["media"], 1);
}

#[tokio::test]
async fn test_history_populates_cache() {
    let app = TestApp::new().await;
    seed(&app, 1, 2, "hello").await;

    let response = app
        .get_auth("/api/chat/history?target_id=1", &token_for(2, "bob"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.cache.contains(&ConversationCache::key(1, 2)));
}

#[tokio::test]
async fn test_empty_history_is_not_cached() {
    let app = TestApp::new().await;

    let (status, json) = json_body(
        app.get_auth("/api/chat/history?target_id=9", &token_for(1, "alice"))
            .await,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
    assert!(!app.cache.contains(&ConversationCache::key(1, 9)));
}

#[tokio::test]
async fn test_history_served_from_store_when_cache_down() {
    let app = TestApp::new().await;
    seed(&app, 1, 2, "still here").await;
    app.cache.set_available(false);

    let (status, json) = json_body(
        app.get_auth("/api/chat/history?target_id=2", &token_for(1, "alice"))
            .await,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["content"], "still here");
}

#[tokio::test]
async fn test_history_store_failure_is_internal_error() {
    let app = TestApp::new().await;
    app.store.set_available(false);

    let (status, json) = json_body(
        app.get_auth("/api/chat/history?target_id=2", &token_for(1, "alice"))
            .await,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], 500);
}

#[tokio::test]
async fn test_bad_target_id_is_bad_request() {
    let app = TestApp::new().await;
    let token = token_for(1, "alice");

    for uri in [
        "/api/chat/history",
        "/api/chat/history?target_id=abc",
        "/api/chat/history?target_id=-4",
    ] {
        let (status, json) = json_body(app.get_auth(uri, &token).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json["code"], 400);
    }
}
