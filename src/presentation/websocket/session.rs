//! WebSocket Session
//!
//! Each connection runs two pumps:
//!
//! - inbound: reads client frames and dispatches them until a close frame, a
//!   transport error or the end of the stream
//! - outbound: writes queued frames to the socket; once the queue is closed it
//!   sends a close frame and exits
//!
//! The session is torn down as soon as either pump returns.
//!
//! Both pumps are generic over the socket halves so they can be driven by
//! in-memory channels.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn, Instrument};

use super::messages::InboundEvent;
use super::registry::{SessionHandle, SessionRegistry};
use crate::application::services::IngestService;
use crate::domain::EventKind;
use crate::infrastructure::cache::PresenceCache;
use crate::infrastructure::metrics;
use crate::presentation::middleware::AuthUser;
use crate::shared::time::now_unix_secs;

/// Collaborators of a live session.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<SessionRegistry>,
    pub ingest: IngestService,
    pub presence: PresenceCache,
    pub queue_capacity: usize,
}

/// Register a session for `user`, run both pumps and tear down.
pub async fn run_session<S, E, K>(stream: S, sink: K, user: AuthUser, ctx: SessionContext)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
    K: Sink<Message> + Unpin + Send + 'static,
    K::Error: Display + Send,
{
    let (session, rx) = SessionHandle::new(user.user_id, ctx.queue_capacity);
    let span = tracing::info_span!(
        "session",
        user_id = user.user_id,
        session_id = %session.session_id()
    );

    async {
        ctx.registry.register(session.clone());
        info!(username = %user.username, "User connected");

        let mut outbound = tokio::spawn(
            outbound_pump(sink, rx, session.clone(), ctx.registry.clone()).in_current_span(),
        );

        // Whichever pump ends first ends the session.
        let outbound_done = tokio::select! {
            _ = inbound_pump(stream, &session, &ctx) => None,
            joined = &mut outbound => Some(joined),
        };
        ctx.registry.unregister(&session);

        let joined = match outbound_done {
            Some(joined) => joined,
            None => outbound.await,
        };
        if let Err(e) = joined {
            warn!(error = %e, "Outbound pump panicked");
        }

        ctx.presence.spawn_record_last_seen(user.user_id, now_unix_secs());
        info!("User disconnected");
    }
    .instrument(span)
    .await
}

/// Read frames until the peer goes away or the session is closed.
pub async fn inbound_pump<S, E>(mut stream: S, session: &SessionHandle, ctx: &SessionContext)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(frame) = stream.next().await {
        if session.is_closed() {
            debug!("Session closed; ignoring further input");
            break;
        }

        match frame {
            Ok(Message::Text(text)) => dispatch(text.as_str(), session, ctx).await,
            Ok(Message::Binary(_)) => warn!("Binary frame ignored"),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!("Close frame received");
                break;
            }
            Err(e) => {
                debug!(error = %e, "Transport error");
                break;
            }
        }
    }
}

async fn dispatch(text: &str, session: &SessionHandle, ctx: &SessionContext) {
    let event: InboundEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Malformed frame ignored");
            return;
        }
    };

    metrics::record_inbound_event(event.kind.as_str());
    match event.kind {
        EventKind::Heartbeat => trace!("Heartbeat"),
        EventKind::Login => debug!("Login notify"),
        EventKind::SingleChat => {
            // Failures are logged by the ingest service.
            let _ = ctx.ingest.publish(&event, session.user_id()).await;
        }
        EventKind::GroupChat => info!(target_id = event.target_id, "Group chat is not supported; dropped"),
        EventKind::Unknown(kind) => warn!(kind, "Unknown event kind; dropped"),
    }
}

/// Write queued frames in order; send a close frame once the queue closes.
pub async fn outbound_pump<K>(
    mut sink: K,
    mut rx: mpsc::Receiver<String>,
    session: Arc<SessionHandle>,
    registry: Arc<SessionRegistry>,
) where
    K: Sink<Message> + Unpin,
    K::Error: Display + Send,
{
    while let Some(frame) = rx.recv().await {
        if let Err(e) = sink.send(Message::Text(frame.into())).await {
            debug!(error = %e, "Write failed; tearing session down");
            registry.unregister(&session);
            return;
        }
    }

    if let Err(e) = sink.send(Message::Close(None)).await {
        trace!(error = %e, "Close frame not delivered");
    }
}
