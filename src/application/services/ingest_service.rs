//! Ingest Service
//!
//! Turns an inbound single-chat event into a write request on the primary
//! topic. Never touches the store or the cache.

use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::config::TopicSettings;
use crate::domain::{EventKind, MediaKind, NewMessage};
use crate::infrastructure::broker::Broker;
use crate::presentation::websocket::InboundEvent;
use crate::shared::error::BrokerError;

/// Ingest errors
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to encode write request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

#[derive(Clone)]
pub struct IngestService {
    broker: Arc<dyn Broker>,
    topic: String,
}

impl IngestService {
    pub fn new(broker: Arc<dyn Broker>, topics: &TopicSettings) -> Self {
        Self {
            broker,
            topic: topics.primary.clone(),
        }
    }

    /// Build the write request for `event` sent by `sender_id`.
    pub fn write_request(event: &InboundEvent, sender_id: u64) -> NewMessage {
        NewMessage {
            from_user_id: sender_id,
            to_user_id: event.target_id,
            content: event.content.clone(),
            kind: EventKind::SingleChat,
            media: MediaKind::Text,
        }
    }

    /// Append the write request to the primary topic on the conversation's
    /// partition. Failures are logged here; the message is then lost.
    #[instrument(skip(self, event), fields(target_id = event.target_id))]
    pub async fn publish(&self, event: &InboundEvent, sender_id: u64) -> Result<String, IngestError> {
        let message = Self::write_request(event, sender_id);
        let partition = message.conversation().partition(self.broker.partitions());

        let result = async {
            let payload = serde_json::to_vec(&message)?;
            let id = self.broker.publish(&self.topic, partition, &payload).await?;
            Ok::<_, IngestError>(id)
        }
        .await;

        match &result {
            Ok(id) => debug!(topic = %self.topic, partition, record_id = %id, "Write request published"),
            Err(e) => error!(
                topic = %self.topic,
                partition,
                error = %e,
                "Failed to publish write request; message dropped"
            ),
        }
        result
    }
}
