//! Redis Streams broker.
//!
//! Each topic partition is the stream `<topic>:<partition>`, consumed through
//! one consumer group. Entries stay in the group's pending list until `XACK`,
//! which is what gives at-least-once delivery across restarts: the first poll
//! of every partition replays this consumer's pending entries before asking
//! for new ones.

use async_trait::async_trait;
use dashmap::DashSet;
use redis::aio::ConnectionManager;
use redis::streams::StreamReadReply;
use tracing::{debug, info, instrument, warn};

use super::{Broker, BrokerRecord};
use crate::config::BrokerSettings;
use crate::shared::error::BrokerError;

/// Field name holding the record body inside a stream entry.
const PAYLOAD_FIELD: &str = "payload";

/// `XREADGROUP` id that replays this consumer's pending entries.
const PENDING: &str = "0";

/// `XREADGROUP` id that asks for entries never delivered to the group.
const NEW_ENTRIES: &str = ">";

/// Read position per stream: pending entries first, then new ones.
#[derive(Debug, Default)]
struct ReplayCursor {
    caught_up: DashSet<String>,
}

impl ReplayCursor {
    fn read_id(&self, key: &str) -> &'static str {
        if self.caught_up.contains(key) {
            NEW_ENTRIES
        } else {
            PENDING
        }
    }

    /// Note how many entries a read returned. An empty replay means the
    /// backlog is drained; returns `true` on that switch.
    fn observe(&self, key: &str, read_id: &str, returned: usize) -> bool {
        if read_id == PENDING && returned == 0 {
            return self.caught_up.insert(key.to_string());
        }
        false
    }

    /// Give up on the backlog of `key` and move on to new entries.
    fn skip_pending(&self, key: &str) {
        self.caught_up.insert(key.to_string());
    }
}

#[derive(Clone)]
pub struct RedisStreamBroker {
    conn: ConnectionManager,
    group: String,
    consumer: String,
    partitions: u32,
    max_len: usize,
    cursor: std::sync::Arc<ReplayCursor>,
}

impl RedisStreamBroker {
    pub fn new(conn: ConnectionManager, settings: &BrokerSettings) -> Self {
        Self {
            conn,
            group: settings.consumer_group.clone(),
            consumer: settings.consumer_name.clone(),
            partitions: settings.partitions.max(1),
            max_len: settings.max_len,
            cursor: Default::default(),
        }
    }

    fn stream_key(topic: &str, partition: u32) -> String {
        format!("{}:{}", topic, partition)
    }

    fn check_partition(&self, topic: &str, partition: u32) -> Result<(), BrokerError> {
        if partition >= self.partitions {
            return Err(BrokerError::UnknownTopic(Self::stream_key(topic, partition)));
        }
        Ok(())
    }

    /// Create every partition stream and the consumer group on it.
    ///
    /// Safe to call on every boot; an existing group is left untouched.
    #[instrument(skip(self))]
    pub async fn ensure_topics(&self, topics: &[&str]) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();

        for topic in topics {
            for partition in 0..self.partitions {
                let key = Self::stream_key(topic, partition);
                let created: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                    .arg("CREATE")
                    .arg(&key)
                    .arg(&self.group)
                    .arg("0")
                    .arg("MKSTREAM")
                    .query_async(&mut conn)
                    .await;

                match created {
                    Ok(()) => info!(stream = %key, group = %self.group, "Consumer group created"),
                    Err(e) if e.code() == Some("BUSYGROUP") => {
                        debug!(stream = %key, "Consumer group already exists")
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }

    fn into_records(&self, topic: &str, partition: u32, reply: Option<StreamReadReply>) -> Vec<BrokerRecord> {
        reply
            .map(|reply| reply.keys)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|stream| stream.ids)
            .map(|entry| {
                let payload = entry.get::<Vec<u8>>(PAYLOAD_FIELD).unwrap_or_default();
                BrokerRecord {
                    topic: topic.to_string(),
                    partition,
                    id: entry.id,
                    payload,
                }
            })
            .collect()
    }
}

#[async_trait]
impl Broker for RedisStreamBroker {
    fn partitions(&self) -> u32 {
        self.partitions
    }

    #[instrument(skip(self, payload), fields(bytes = payload.len()), level = "debug")]
    async fn publish(&self, topic: &str, partition: u32, payload: &[u8]) -> Result<String, BrokerError> {
        self.check_partition(topic, partition)?;
        let mut conn = self.conn.clone();

        let id: String = redis::cmd("XADD")
            .arg(Self::stream_key(topic, partition))
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        Ok(id)
    }

    async fn poll(&self, topic: &str, partition: u32, max: usize) -> Result<Vec<BrokerRecord>, BrokerError> {
        self.check_partition(topic, partition)?;
        let key = Self::stream_key(topic, partition);
        let read_id = self.cursor.read_id(&key);
        let mut conn = self.conn.clone();

        let reply: Result<Option<StreamReadReply>, redis::RedisError> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(max.max(1))
            .arg("STREAMS")
            .arg(&key)
            .arg(read_id)
            .query_async(&mut conn)
            .await;

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) if read_id == PENDING => {
                // Pending entries trimmed by MAXLEN come back without fields.
                warn!(stream = %key, error = %e, "Could not replay pending entries; skipping to new ones");
                self.cursor.skip_pending(&key);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let records = self.into_records(topic, partition, reply);
        if self.cursor.observe(&key, read_id, records.len()) {
            debug!(stream = %key, "Pending entries replayed");
        }
        Ok(records)
    }

    async fn ack(&self, record: &BrokerRecord) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("XACK")
            .arg(Self::stream_key(&record.topic, record.partition))
            .arg(&self.group)
            .arg(&record.id)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisStreamBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamBroker")
            .field("group", &self.group)
            .field("consumer", &self.consumer)
            .field("partitions", &self.partitions)
            .finish_non_exhaustive()
    }
}
