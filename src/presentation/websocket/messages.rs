//! WebSocket Message Types
//!
//! Frames exchanged with clients. Both directions are JSON text frames.

use serde::{Deserialize, Serialize};

use crate::domain::{EventKind, PersistedMessage};

/// Client → server frame
///
/// ```json
/// {"type": 2, "target_id": 42, "content": "hello"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub target_id: u64,
    #[serde(default)]
    pub content: String,
}

/// Server → client frame
///
/// ```json
/// {"from_id": 7, "type": 2, "content": "hello", "send_time": 1700000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub from_id: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub content: String,
    /// Unix seconds
    pub send_time: i64,
}

impl From<&PersistedMessage> for OutboundEvent {
    fn from(message: &PersistedMessage) -> Self {
        Self {
            from_id: message.from_user_id,
            kind: message.kind,
            content: message.content.clone(),
            send_time: message.created_at.timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaKind;
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    #[test_case(r#"{"type":0}"#, EventKind::Heartbeat ; "heartbeat without body")]
    #[test_case(r#"{"type":1,"target_id":0,"content":""}"#, EventKind::Login ; "login notify")]
    #[test_case(r#"{"type":2,"target_id":9,"content":"hi"}"#, EventKind::SingleChat ; "single chat")]
    #[test_case(r#"{"type":3,"target_id":9,"content":"hi"}"#, EventKind::GroupChat ; "group chat")]
    #[test_case(r#"{"type":77,"target_id":9,"content":"hi"}"#, EventKind::Unknown(77) ; "unknown kind")]
    fn test_inbound_kind_decoding(frame: &str, expected: EventKind) {
        let event: InboundEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(event.kind, expected);
    }

    #[test_case("not json" ; "garbage")]
    #[test_case(r#"{"target_id":1}"# ; "missing type")]
    #[test_case(r#"{"type":"two"}"# ; "type not an integer")]
    #[test_case(r#"{"type":2,"target_id":-1}"# ; "negative target")]
    fn test_inbound_rejects_malformed(frame: &str) {
        assert!(serde_json::from_str::<InboundEvent>(frame).is_err());
    }

    #[test]
    fn test_outbound_from_persisted() {
        let message = PersistedMessage {
            id: 11,
            from_user_id: 7,
            to_user_id: 8,
            content: "hello".into(),
            kind: EventKind::SingleChat,
            media: MediaKind::Text,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };

        let frame = serde_json::to_value(OutboundEvent::from(&message)).unwrap();
        assert_eq!(
            frame,
            serde_json::json!({
                "from_id": 7,
                "type": 2,
                "content": "hello",
                "send_time": 1_700_000_000
            })
        );
    }
}
