//! Response DTOs
//!
//! Data structures for API response bodies.

use serde::{Deserialize, Serialize};

use crate::domain::{EventKind, MediaKind, PersistedMessage};

/// One history item.
///
/// Also the element type of the cached history entries, hence `Deserialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: i64,
    pub from_user_id: u64,
    pub to_user_id: u64,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub media: MediaKind,
    /// Unix milliseconds
    pub created_at: i64,
}

impl From<&PersistedMessage> for MessageDto {
    fn from(message: &PersistedMessage) -> Self {
        Self {
            id: message.id,
            from_user_id: message.from_user_id,
            to_user_id: message.to_user_id,
            content: message.content.clone(),
            kind: message.kind,
            media: message.media,
            created_at: message.created_at.timestamp_millis(),
        }
    }
}
