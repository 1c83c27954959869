//! Delivery cascade handlers.
//!
//! ```text
//! primary ──insert ×N──▶ ok ──▶ invalidate cache ──▶ fan-out
//!    │ malformed     │ all failed
//!    ▼               ▼
//!  dead ◀──fail── retry ──delay, insert ×1──▶ ok ──▶ ...
//!    │
//!    ▼
//!  error log (terminal)
//! ```
//!
//! Records are forwarded between topics byte for byte, on the partition they
//! were read from.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::DeliveryPolicy;
use crate::application::services::{FanoutService, PushOutcome};
use crate::config::TopicSettings;
use crate::domain::{MessageStore, NewMessage, PersistedMessage};
use crate::infrastructure::broker::{Broker, BrokerRecord};
use crate::infrastructure::cache::ConversationCache;
use crate::infrastructure::metrics;
use crate::shared::error::BrokerError;
use crate::shared::time::now_unix_secs;

/// Which cascade topic a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Primary,
    Retry,
    Dead,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Retry => "retry",
            Self::Dead => "dead",
        }
    }
}

/// Result of handling one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stored; the cache was invalidated and a push attempted
    Persisted { message_id: i64, push: PushOutcome },
    /// Forwarded to the retry topic
    Escalated,
    /// Forwarded to the dead topic
    DeadLettered,
    /// Logged by the dead stage and discarded
    Dropped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Persisted { .. } => "persisted",
            Self::Escalated => "escalated",
            Self::DeadLettered => "dead_lettered",
            Self::Dropped => "dropped",
        }
    }
}

pub struct DeliveryCascade {
    store: Arc<dyn MessageStore>,
    broker: Arc<dyn Broker>,
    cache: ConversationCache,
    fanout: FanoutService,
    topics: TopicSettings,
    policy: DeliveryPolicy,
}

impl DeliveryCascade {
    pub fn new(
        store: Arc<dyn MessageStore>,
        broker: Arc<dyn Broker>,
        cache: ConversationCache,
        fanout: FanoutService,
        topics: TopicSettings,
        policy: DeliveryPolicy,
    ) -> Self {
        Self {
            store,
            broker,
            cache,
            fanout,
            topics,
            policy,
        }
    }

    pub fn stage_of(&self, topic: &str) -> Option<Stage> {
        if topic == self.topics.primary {
            Some(Stage::Primary)
        } else if topic == self.topics.retry {
            Some(Stage::Retry)
        } else if topic == self.topics.dead {
            Some(Stage::Dead)
        } else {
            None
        }
    }

    /// Handle one record according to the topic it was read from.
    ///
    /// An `Err` means the record could not be forwarded to the next topic and
    /// must not be acknowledged.
    #[instrument(
        skip(self, record),
        fields(topic = %record.topic, partition = record.partition, record_id = %record.id)
    )]
    pub async fn handle(&self, record: &BrokerRecord) -> Result<Outcome, BrokerError> {
        let stage = self
            .stage_of(&record.topic)
            .ok_or_else(|| BrokerError::UnknownTopic(record.topic.clone()))?;

        let outcome = match stage {
            Stage::Primary => self.handle_primary(record).await?,
            Stage::Retry => self.handle_retry(record).await?,
            Stage::Dead => self.handle_dead(record),
        };

        metrics::record_cascade_outcome(stage.as_str(), outcome.as_str());
        Ok(outcome)
    }

    async fn handle_primary(&self, record: &BrokerRecord) -> Result<Outcome, BrokerError> {
        let Some(message) = self.decode(record) else {
            return self.dead_letter(record).await;
        };

        let attempts = self.policy.local_attempts;
        for attempt in 1..=attempts {
            match self.store.insert(&message).await {
                Ok(persisted) => return Ok(self.after_write(persisted).await),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Insert failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.local_backoff).await;
                    }
                }
            }
        }

        warn!(attempts, "Local attempts exhausted; escalating to retry topic");
        self.forward(&self.topics.retry, record).await?;
        Ok(Outcome::Escalated)
    }

    async fn handle_retry(&self, record: &BrokerRecord) -> Result<Outcome, BrokerError> {
        let Some(message) = self.decode(record) else {
            return self.dead_letter(record).await;
        };

        tokio::time::sleep(self.policy.retry_delay).await;

        match self.store.insert(&message).await {
            Ok(persisted) => Ok(self.after_write(persisted).await),
            Err(e) => {
                error!(error = %e, "Insert failed on retry; moving to dead topic");
                self.dead_letter(record).await
            }
        }
    }

    fn handle_dead(&self, record: &BrokerRecord) -> Outcome {
        error!(
            payload = %String::from_utf8_lossy(&record.payload),
            dropped_at = now_unix_secs(),
            "Message dropped"
        );
        Outcome::Dropped
    }

    fn decode(&self, record: &BrokerRecord) -> Option<NewMessage> {
        match serde_json::from_slice::<NewMessage>(&record.payload) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(error = %e, "Malformed write request");
                None
            }
        }
    }

    async fn dead_letter(&self, record: &BrokerRecord) -> Result<Outcome, BrokerError> {
        self.forward(&self.topics.dead, record).await?;
        Ok(Outcome::DeadLettered)
    }

    async fn forward(&self, topic: &str, record: &BrokerRecord) -> Result<(), BrokerError> {
        self.broker
            .publish(topic, record.partition, &record.payload)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!(to = topic, error = %e, "Failed to forward record");
                e
            })
    }

    /// Post-write steps. Neither can fail the record: the row is durable.
    async fn after_write(&self, persisted: PersistedMessage) -> Outcome {
        if let Err(e) = self
            .cache
            .invalidate(persisted.from_user_id, persisted.to_user_id)
            .await
        {
            warn!(message_id = persisted.id, error = %e, "Failed to invalidate history cache");
        }

        let push = self.fanout.push(&persisted);
        info!(message_id = persisted.id, push = push.as_str(), "Message persisted");
        Outcome::Persisted {
            message_id: persisted.id,
            push,
        }
    }
}
