//! Broker Module
//!
//! Partitioned, acknowledged topics carrying delivery records.
//!
//! A topic is split into `partitions()` independent logs. Records published to
//! one partition are polled back in publish order, and a record stays pending
//! until it is acknowledged, so a crash between poll and ack redelivers it.
//!
//! Implementations:
//! - `RedisStreamBroker`: one Redis stream per partition (`<topic>:<n>`), read
//!   through a consumer group
//! - `MemoryBroker`: in-process logs for tests and local runs

mod memory;
mod redis_streams;

pub use memory::MemoryBroker;
pub use redis_streams::RedisStreamBroker;

use async_trait::async_trait;

use crate::shared::error::BrokerError;

/// One record read from a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRecord {
    pub topic: String,
    pub partition: u32,
    /// Broker-assigned id, unique within the partition
    pub id: String,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Number of partitions of every topic.
    fn partitions(&self) -> u32;

    /// Append `payload` to a partition; returns the record id.
    async fn publish(&self, topic: &str, partition: u32, payload: &[u8]) -> Result<String, BrokerError>;

    /// Up to `max` records from a partition, oldest first. An empty result means
    /// there is nothing to read right now.
    async fn poll(&self, topic: &str, partition: u32, max: usize) -> Result<Vec<BrokerRecord>, BrokerError>;

    /// Mark a polled record as processed.
    async fn ack(&self, record: &BrokerRecord) -> Result<(), BrokerError>;

    /// Connectivity check for readiness checks.
    async fn ping(&self) -> Result<(), BrokerError>;
}
