//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chat_relay::config::Settings;
use chat_relay::infrastructure::broker::MemoryBroker;
use chat_relay::infrastructure::cache::MemoryCache;
use chat_relay::infrastructure::repositories::MemoryMessageStore;
use chat_relay::presentation::http::create_router;
use chat_relay::presentation::middleware::Claims;
use chat_relay::startup::AppState;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Settings with short delivery pauses so the cascade settles quickly.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.jwt.secret = TEST_SECRET.into();
    settings.broker.partitions = 2;
    settings.broker.poll_interval_ms = 5;
    settings.delivery.local_attempts = 3;
    settings.delivery.local_backoff_ms = 10;
    settings.delivery.retry_delay_ms = 50;
    settings.websocket.outbound_queue_capacity = 8;
    settings
}

/// Test application wired to in-memory backends
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryMessageStore>,
    pub cache: Arc<MemoryCache>,
    pub broker: Arc<MemoryBroker>,
    shutdown: Option<watch::Sender<bool>>,
    consumers: Vec<JoinHandle<()>>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(MemoryMessageStore::new());
        let cache = Arc::new(MemoryCache::new());
        let broker = Arc::new(MemoryBroker::new(settings.broker.partitions));

        let state = AppState::new(settings, store.clone(), cache.clone(), broker.clone());

        Self {
            router: create_router(state.clone()),
            state,
            store,
            cache,
            broker,
            shutdown: None,
            consumers: Vec::new(),
        }
    }

    /// Start the partition consumers.
    pub fn start_delivery(&mut self) {
        let (tx, rx) = watch::channel(false);
        self.consumers = self.state.spawn_delivery(rx);
        self.shutdown = Some(tx);
    }

    /// Signal the consumers and wait for every one of them to exit.
    pub async fn stop_delivery(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(true).unwrap();
        }
        for handle in self.consumers.drain(..) {
            handle.await.unwrap();
        }
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Make an authenticated GET request
    pub async fn get_auth(&self, uri: &str, token: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

/// Sign a token the way the external issuer does.
pub fn token_for(user_id: u64, username: &str) -> String {
    token_with_secret(user_id, username, TEST_SECRET)
}

pub fn token_with_secret(user_id: u64, username: &str, secret: &str) -> String {
    let claims = Claims {
        user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Status and JSON body of a response.
pub async fn json_body(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..400 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
