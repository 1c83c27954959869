//! Event and media kinds.
//!
//! Both travel as plain integers on the wire and in the `messages` table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a chat event, shared by inbound frames, outbound frames and
/// persisted rows.
///
/// ```text
/// 0 heartbeat   1 login notify   2 single chat   3 group chat (reserved)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum EventKind {
    Heartbeat,
    Login,
    SingleChat,
    GroupChat,
    /// Any value this server does not understand; kept so it can be logged.
    Unknown(i32),
}

impl From<i32> for EventKind {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Heartbeat,
            1 => Self::Login,
            2 => Self::SingleChat,
            3 => Self::GroupChat,
            other => Self::Unknown(other),
        }
    }
}

impl From<EventKind> for i32 {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Heartbeat => 0,
            EventKind::Login => 1,
            EventKind::SingleChat => 2,
            EventKind::GroupChat => 3,
            EventKind::Unknown(other) => other,
        }
    }
}

impl EventKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::Login => "login",
            Self::SingleChat => "single_chat",
            Self::GroupChat => "group_chat",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Media type of a message body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum MediaKind {
    #[default]
    Text,
    Image,
    Audio,
}

impl TryFrom<i32> for MediaKind {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Text),
            2 => Ok(Self::Image),
            3 => Ok(Self::Audio),
            other => Err(format!("unknown media kind {}", other)),
        }
    }
}

impl From<MediaKind> for i32 {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Text => 1,
            MediaKind::Image => 2,
            MediaKind::Audio => 3,
        }
    }
}
