//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{middleware, response::IntoResponse, routing::get, Router};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, create_trace_layer, track_metrics};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(track_metrics))
        .layer(create_trace_layer())
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API routes (all protected)
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // WebSocket endpoint; the token may come from the query string
        .route("/ws", get(ws_handler))
        .route("/chat/history", get(handlers::chat::get_history))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
