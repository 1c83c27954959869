//! Session Registry
//!
//! Tracks which users have a live connection and the outbound queue reaching
//! each of them. At most one session is registered per user; a newer
//! connection replaces the older one, which is closed.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::infrastructure::metrics;

/// Why a frame could not be queued for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    #[error("outbound queue is full")]
    Full,

    #[error("session is closed")]
    Closed,
}

/// One live connection as seen by the rest of the server.
///
/// Holds the sending half of the session's bounded outbound queue. Closing the
/// handle drops that sender, so the outbound pump drains what is queued, sees
/// the end of the queue and closes the socket.
#[derive(Debug)]
pub struct SessionHandle {
    user_id: u64,
    session_id: Uuid,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
}

impl SessionHandle {
    /// Create a handle and the receiving end of its outbound queue.
    pub fn new(user_id: u64, capacity: usize) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Arc::new(Self {
            user_id,
            session_id: Uuid::new_v4(),
            outbound: Mutex::new(Some(tx)),
        });
        (handle, rx)
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Queue a serialized frame without waiting.
    pub fn try_push(&self, frame: String) -> Result<(), PushError> {
        let guard = self.outbound.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(PushError::Closed);
        };
        tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => PushError::Full,
            TrySendError::Closed(_) => PushError::Closed,
        })
    }

    /// Close the outbound queue. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.outbound.lock().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.lock().is_none()
    }
}

/// User id → live session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<u64, Arc<SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` for its user, replacing and closing any previous one.
    ///
    /// Returns the superseded session, if there was one.
    pub fn register(&self, session: Arc<SessionHandle>) -> Option<Arc<SessionHandle>> {
        let user_id = session.user_id();
        let session_id = session.session_id();

        let previous = self
            .sessions
            .insert(user_id, session)
            .filter(|previous| previous.session_id() != session_id);

        if let Some(previous) = &previous {
            previous.close();
            tracing::info!(
                user_id = user_id,
                session_id = %session_id,
                superseded = %previous.session_id(),
                "Session replaced"
            );
        } else {
            tracing::info!(user_id = user_id, session_id = %session_id, "Session registered");
        }

        metrics::set_active_sessions(self.sessions.len());
        previous
    }

    /// Remove `session` if it is still the one registered for its user, and
    /// close its queue either way. Safe to call any number of times.
    ///
    /// Returns whether the registry entry was removed by this call.
    pub fn unregister(&self, session: &SessionHandle) -> bool {
        let removed = self
            .sessions
            .remove_if(&session.user_id(), |_, current| {
                current.session_id() == session.session_id()
            })
            .is_some();
        let closed = session.close();

        if removed {
            metrics::set_active_sessions(self.sessions.len());
        }
        if removed || closed {
            tracing::info!(
                user_id = session.user_id(),
                session_id = %session.session_id(),
                "Session unregistered"
            );
        }
        removed
    }

    pub fn lookup(&self, user_id: u64) -> Option<Arc<SessionHandle>> {
        self.sessions.get(&user_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_online(&self, user_id: u64) -> bool {
        self.sessions.contains_key(&user_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Close every live session and empty the registry.
    pub fn shutdown(&self) {
        let user_ids: Vec<u64> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let mut closed = 0usize;
        for user_id in user_ids {
            if let Some((_, session)) = self.sessions.remove(&user_id) {
                session.close();
                closed += 1;
            }
        }
        metrics::set_active_sessions(0);
        tracing::info!(closed, "All sessions closed");
    }
}
