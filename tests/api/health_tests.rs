//! Health Check API Tests

use axum::http::StatusCode;

use crate::common::{json_body, TestApp};

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let (status, json) = json_body(app.get("/health").await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("version").is_some());
}

#[tokio::test]
async fn test_liveness_endpoint() {
    let app = TestApp::new().await;

    let (status, json) = json_body(app.get("/health/live").await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "alive");
}

#[tokio::test]
async fn test_readiness_with_all_backends_up() {
    let app = TestApp::new().await;

    let (status, json) = json_body(app.get("/health/ready").await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["checks"]["database"]["status"], "healthy");
    assert_eq!(json["checks"]["broker"]["status"], "healthy");
    assert_eq!(json["checks"]["websocket"]["active_sessions"], 0);
}

#[tokio::test]
async fn test_readiness_degraded_without_cache() {
    let app = TestApp::new().await;
    app.cache.set_available(false);

    let (status, json) = json_body(app.get("/health/ready").await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["redis"]["status"], "unhealthy");
    assert!(json["checks"]["redis"]["error"]
        .as_str()
        .unwrap()
        .starts_with("Redis connection failed"));
}

#[tokio::test]
async fn test_readiness_unavailable_without_broker() {
    let app = TestApp::new().await;
    app.broker.set_available(false);

    let (status, json) = json_body(app.get("/health/ready").await).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_prometheus_text() {
    let app = TestApp::new().await;
    app.get("/health").await;

    let response = app.get("/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("chat_relay_http_requests_total"));
}
