//! WebSocket Connection Handler
//!
//! Upgrades an authenticated request and hands the socket to the session
//! pumps.

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use futures::StreamExt;

use super::session::{run_session, SessionContext};
use crate::presentation::middleware::AuthUser;
use crate::startup::AppState;

impl From<&AppState> for SessionContext {
    fn from(state: &AppState) -> Self {
        Self {
            registry: state.registry.clone(),
            ingest: state.ingest.clone(),
            presence: state.presence.clone(),
            queue_capacity: state.settings.websocket.outbound_queue_capacity,
        }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>, user: AuthUser) -> Response {
    let ctx = SessionContext::from(&state);

    ws.max_message_size(state.settings.websocket.max_message_size)
        .on_failed_upgrade(|e| tracing::debug!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            let (sink, stream) = socket.split();
            run_session(stream, sink, user, ctx).await;
        })
}
