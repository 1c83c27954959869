//! Message entity and store contract.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ConversationId, EventKind, MediaKind};
use crate::shared::error::StoreError;

/// A write request for a one-to-one message.
///
/// This is the payload carried on every broker topic. It has no id and no
/// timestamp; both are assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub from_user_id: u64,
    pub to_user_id: u64,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub media: MediaKind,
}

impl NewMessage {
    pub fn conversation(&self) -> ConversationId {
        ConversationId::new(self.from_user_id, self.to_user_id)
    }
}

/// A message row as stored.
///
/// Maps to the `messages` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - from_user_id: BIGINT NOT NULL
/// - to_user_id: BIGINT NOT NULL
/// - content: TEXT NOT NULL
/// - type: INTEGER NOT NULL
/// - media: INTEGER NOT NULL DEFAULT 1
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedMessage {
    pub id: i64,
    pub from_user_id: u64,
    pub to_user_id: u64,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub media: MediaKind,
    pub created_at: DateTime<Utc>,
}

impl PersistedMessage {
    /// Build the stored form of a write request.
    pub fn from_new(id: i64, message: NewMessage, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            from_user_id: message.from_user_id,
            to_user_id: message.to_user_id,
            content: message.content,
            kind: message.kind,
            media: message.media,
            created_at,
        }
    }

    pub fn conversation(&self) -> ConversationId {
        ConversationId::new(self.from_user_id, self.to_user_id)
    }
}

/// Durable message store.
///
/// Implementations must be safe to call from many partition tasks at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a message; the store assigns `id` and `created_at`.
    async fn insert(&self, message: &NewMessage) -> Result<PersistedMessage, StoreError>;

    /// Most recent messages exchanged between two users, newest first.
    async fn recent_between(
        &self,
        a: u64,
        b: u64,
        limit: i64,
    ) -> Result<Vec<PersistedMessage>, StoreError>;

    /// Cheap connectivity check for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
