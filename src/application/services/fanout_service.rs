//! Fan-out Service
//!
//! Pushes a persisted message to the recipient's live session, if any.
//! Nothing here is ever an error for the caller: the message is already
//! durable and the recipient will see it in history.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::OverflowPolicy;
use crate::domain::PersistedMessage;
use crate::infrastructure::metrics;
use crate::presentation::websocket::{OutboundEvent, PushError, SessionRegistry};

/// What happened to one push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Queued on the recipient's session
    Delivered,
    /// No live session for the recipient
    Offline,
    /// Session was full or closing; frame discarded
    Dropped,
    /// Session was full and has been disconnected
    Disconnected,
}

impl PushOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Offline => "offline",
            Self::Dropped => "dropped",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Clone)]
pub struct FanoutService {
    registry: Arc<SessionRegistry>,
    overflow: OverflowPolicy,
}

impl FanoutService {
    pub fn new(registry: Arc<SessionRegistry>, overflow: OverflowPolicy) -> Self {
        Self { registry, overflow }
    }

    pub fn push(&self, message: &PersistedMessage) -> PushOutcome {
        let recipient = message.to_user_id;
        let outcome = self.try_push(message);

        match outcome {
            PushOutcome::Delivered => debug!(recipient, message_id = message.id, "Message pushed"),
            PushOutcome::Offline => debug!(recipient, message_id = message.id, "Recipient offline"),
            PushOutcome::Dropped => debug!(recipient, message_id = message.id, "Push dropped"),
            PushOutcome::Disconnected => {
                warn!(recipient, message_id = message.id, "Slow session disconnected")
            }
        }
        metrics::record_fanout(outcome.as_str());
        outcome
    }

    fn try_push(&self, message: &PersistedMessage) -> PushOutcome {
        let Some(session) = self.registry.lookup(message.to_user_id) else {
            return PushOutcome::Offline;
        };

        let frame = match serde_json::to_string(&OutboundEvent::from(message)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to encode outbound frame");
                return PushOutcome::Dropped;
            }
        };

        match session.try_push(frame) {
            Ok(()) => PushOutcome::Delivered,
            Err(PushError::Closed) => PushOutcome::Dropped,
            Err(PushError::Full) => match self.overflow {
                OverflowPolicy::Drop => PushOutcome::Dropped,
                OverflowPolicy::Disconnect => {
                    self.registry.unregister(&session);
                    PushOutcome::Disconnected
                }
            },
        }
    }
}
