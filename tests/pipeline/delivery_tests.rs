//! Delivery pipeline tests
//!
//! Ingest publishes to the in-memory broker; the real partition consumers
//! drive the cascade into the in-memory store.

use std::time::Duration;

use chat_relay::config::OverflowPolicy;
use chat_relay::domain::{EventKind, NewMessage};
use chat_relay::infrastructure::broker::Broker;
use chat_relay::infrastructure::cache::ConversationCache;
use chat_relay::presentation::websocket::{InboundEvent, SessionHandle};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::common::{eventually, test_settings, token_for, TestApp};

fn chat(target_id: u64, content: &str) -> InboundEvent {
    InboundEvent {
        kind: EventKind::SingleChat,
        target_id,
        content: content.to_string(),
    }
}

async fn next_frame(rx: &mut mpsc::Receiver<String>) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no frame pushed in time")
        .expect("session queue closed");
    serde_json::from_str(&frame).unwrap()
}

#[tokio::test]
async fn test_online_recipient_receives_persisted_message() {
    let mut app = TestApp::new().await;
    let (session, mut rx) = SessionHandle::new(2, 8);
    app.state.registry.register(session);
    app.start_delivery();

    app.state.ingest.publish(&chat(2, "hello bob"), 1).await.unwrap();

    let frame = next_frame(&mut rx).await;
    assert_eq!(frame["from_id"], 1);
    assert_eq!(frame["type"], 2);
    assert_eq!(frame["content"], "hello bob");

    let rows = app.store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].from_user_id, rows[0].to_user_id), (1, 2));
    assert!(eventually(|| async { app.broker.unacked("chat.primary") == 0 }).await);
    assert!(app.broker.published("chat.retry").is_empty());

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_offline_recipient_message_is_still_stored() {
    let mut app = TestApp::new().await;
    app.start_delivery();

    app.state.ingest.publish(&chat(7, "later"), 3).await.unwrap();

    assert!(eventually(|| async { app.store.rows().len() == 1 }).await);
    assert_eq!(app.store.rows()[0].content, "later");

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_conversation_order_is_preserved() {
    let mut app = TestApp::new().await;
    let (session, mut rx) = SessionHandle::new(2, 16);
    app.state.registry.register(session);
    app.start_delivery();

    for i in 0..5 {
        app.state
            .ingest
            .publish(&chat(2, &format!("m{}", i)), 1)
            .await
            .unwrap();
    }

    for i in 0..5 {
        assert_eq!(next_frame(&mut rx).await["content"], format!("m{}", i));
    }
    let stored: Vec<String> = app.store.rows().into_iter().map(|m| m.content).collect();
    assert_eq!(stored, vec!["m0", "m1", "m2", "m3", "m4"]);

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_persist_invalidates_cached_history() {
    let mut app = TestApp::new().await;
    app.start_delivery();
    let key = ConversationCache::key(1, 2);

    app.state.ingest.publish(&chat(2, "one"), 1).await.unwrap();
    assert!(eventually(|| async { app.store.rows().len() == 1 }).await);

    app.get_auth("/api/chat/history?target_id=2", &token_for(1, "alice"))
        .await;
    assert!(app.cache.contains(&key));

    app.state.ingest.publish(&chat(1, "two"), 2).await.unwrap();
    assert!(eventually(|| async { !app.cache.contains(&key) }).await);
    assert_eq!(app.store.rows().len(), 2);

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_cache_outage_does_not_block_delivery() {
    let mut app = TestApp::new().await;
    app.cache.set_available(false);
    let (session, mut rx) = SessionHandle::new(2, 8);
    app.state.registry.register(session);
    app.start_delivery();

    app.state.ingest.publish(&chat(2, "through"), 1).await.unwrap();

    assert_eq!(next_frame(&mut rx).await["content"], "through");
    assert_eq!(app.store.rows().len(), 1);

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_transient_store_failure_recovers_on_retry_topic() {
    let mut app = TestApp::new().await;
    app.store.fail_next(3);
    app.start_delivery();

    app.state.ingest.publish(&chat(2, "persistent"), 1).await.unwrap();

    assert!(eventually(|| async { app.store.rows().len() == 1 }).await);
    assert_eq!(app.store.attempts().len(), 4);
    assert_eq!(app.broker.published("chat.retry").len(), 1);
    assert!(app.broker.published("chat.dead").is_empty());

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_store_outage_ends_on_dead_topic() {
    let mut app = TestApp::new().await;
    app.store.set_available(false);
    app.start_delivery();

    app.state.ingest.publish(&chat(2, "doomed"), 1).await.unwrap();

    assert!(eventually(|| async {
        app.broker.published("chat.dead").len() == 1 && app.broker.unacked("chat.dead") == 0
    })
    .await);
    assert!(app.store.rows().is_empty());
    assert_eq!(app.store.attempts().len(), 4);

    // The payload travels through the cascade unchanged.
    let primary = app.broker.published("chat.primary");
    let dead = app.broker.published("chat.dead");
    assert_eq!(dead[0].payload, primary[0].payload);
    assert_eq!(dead[0].partition, primary[0].partition);

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_malformed_record_goes_straight_to_dead() {
    let mut app = TestApp::new().await;
    app.start_delivery();

    app.broker
        .publish("chat.primary", 0, b"{not json")
        .await
        .unwrap();

    assert!(eventually(|| async { app.broker.published("chat.dead").len() == 1 }).await);
    assert_eq!(app.broker.published("chat.dead")[0].payload, b"{not json".to_vec());
    assert!(app.broker.published("chat.retry").is_empty());
    assert!(app.store.attempts().is_empty());

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_failed_forward_is_redelivered_after_restart() {
    let mut app = TestApp::new().await;
    app.state.ingest.publish(&chat(2, "survivor"), 1).await.unwrap();

    app.store.set_available(false);
    app.broker.set_available(false);
    app.start_delivery();

    assert!(eventually(|| async { app.store.attempts().len() >= 3 }).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    app.stop_delivery().await;

    assert_eq!(app.broker.unacked("chat.primary"), 1);
    assert!(app.broker.published("chat.retry").is_empty());

    app.store.set_available(true);
    app.broker.set_available(true);
    app.broker.redeliver_unacked();
    app.start_delivery();

    assert!(eventually(|| async { app.store.rows().len() == 1 }).await);
    assert!(eventually(|| async { app.broker.unacked("chat.primary") == 0 }).await);

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_slow_session_is_disconnected_under_disconnect_policy() {
    let mut settings = test_settings();
    settings.websocket.overflow_policy = OverflowPolicy::Disconnect;
    let mut app = TestApp::with_settings(settings).await;

    let (session, _rx) = SessionHandle::new(2, 1);
    app.state.registry.register(session.clone());
    app.start_delivery();

    app.state.ingest.publish(&chat(2, "fits"), 1).await.unwrap();
    app.state.ingest.publish(&chat(2, "overflows"), 1).await.unwrap();

    assert!(eventually(|| async { app.store.rows().len() == 2 }).await);
    assert!(eventually(|| async { !app.state.registry.is_online(2) }).await);
    assert!(session.is_closed());

    app.stop_delivery().await;
}

#[tokio::test]
async fn test_write_request_wire_format() {
    let app = TestApp::new().await;

    app.state.ingest.publish(&chat(2, "wire"), 1).await.unwrap();

    let record = &app.broker.published("chat.primary")[0];
    let message: NewMessage = serde_json::from_slice(&record.payload).unwrap();
    assert_eq!(message.from_user_id, 1);
    assert_eq!(message.to_user_id, 2);
    assert_eq!(message.kind, EventKind::SingleChat);

    let raw: Value = serde_json::from_slice(&record.payload).unwrap();
    assert_eq!(raw["type"], 2);
    assert_eq!(raw["media"], 1);
}
