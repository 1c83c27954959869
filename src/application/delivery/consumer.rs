//! Partition consumers.
//!
//! One task per (topic, partition). A task handles its records strictly one
//! after another and acknowledges each only after its handler returned, so a
//! slow retry pause holds up its own partition and nothing else.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::DeliveryCascade;
use crate::config::BrokerSettings;
use crate::infrastructure::broker::Broker;

/// Spawn a consumer for every partition of the three cascade topics.
///
/// The tasks stop once `shutdown` flips to `true` (or its sender is dropped).
pub fn spawn_consumers(
    cascade: Arc<DeliveryCascade>,
    broker: Arc<dyn Broker>,
    settings: &BrokerSettings,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let topics = [
        settings.topics.primary.clone(),
        settings.topics.retry.clone(),
        settings.topics.dead.clone(),
    ];

    let mut handles = Vec::new();
    for topic in topics {
        for partition in 0..broker.partitions() {
            let consumer = PartitionConsumer {
                cascade: cascade.clone(),
                broker: broker.clone(),
                topic: topic.clone(),
                partition,
                batch_size: settings.batch_size.max(1),
                poll_interval: settings.poll_interval(),
            };
            handles.push(tokio::spawn(consumer.run(shutdown.clone())));
        }
    }

    info!(consumers = handles.len(), "Delivery consumers started");
    handles
}

struct PartitionConsumer {
    cascade: Arc<DeliveryCascade>,
    broker: Arc<dyn Broker>,
    topic: String,
    partition: u32,
    batch_size: usize,
    poll_interval: Duration,
}

impl PartitionConsumer {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        debug!(topic = %self.topic, partition = self.partition, "Consumer running");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                _ = shutdown.changed() => break,
                polled = self.broker.poll(&self.topic, self.partition, self.batch_size) => polled,
            };

            let records = match polled {
                Ok(records) => records,
                Err(e) => {
                    warn!(topic = %self.topic, partition = self.partition, error = %e, "Poll failed");
                    Vec::new()
                }
            };

            if records.is_empty() {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
                continue;
            }

            for record in records {
                match self.cascade.handle(&record).await {
                    Ok(_) => {
                        if let Err(e) = self.broker.ack(&record).await {
                            warn!(record_id = %record.id, error = %e, "Ack failed; record may be redelivered");
                        }
                    }
                    Err(e) => error!(
                        topic = %self.topic,
                        partition = self.partition,
                        record_id = %record.id,
                        error = %e,
                        "Record left unacknowledged"
                    ),
                }
            }
        }

        debug!(topic = %self.topic, partition = self.partition, "Consumer stopped");
    }
}
