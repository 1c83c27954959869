//! In-process broker.
//!
//! Mirrors the stream semantics the pipeline relies on: per-partition FIFO,
//! records stay in flight until acked, and unacked records can be handed out
//! again with [`MemoryBroker::redeliver_unacked`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Broker, BrokerRecord};
use crate::shared::error::BrokerError;

#[derive(Default)]
struct PartitionLog {
    ready: VecDeque<BrokerRecord>,
    in_flight: Vec<BrokerRecord>,
}

pub struct MemoryBroker {
    partitions: u32,
    logs: Mutex<HashMap<(String, u32), PartitionLog>>,
    published: Mutex<Vec<BrokerRecord>>,
    next_id: AtomicU64,
    available: AtomicBool,
}

impl MemoryBroker {
    pub fn new(partitions: u32) -> Self {
        Self {
            partitions: partitions.max(1),
            logs: Mutex::new(HashMap::new()),
            published: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle simulated connectivity; publishes fail while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Every record ever published to `topic`, in publish order.
    pub fn published(&self, topic: &str) -> Vec<BrokerRecord> {
        self.published
            .lock()
            .iter()
            .filter(|r| r.topic == topic)
            .cloned()
            .collect()
    }

    /// Records of `topic` not yet acknowledged (ready or in flight).
    pub fn unacked(&self, topic: &str) -> usize {
        self.logs
            .lock()
            .iter()
            .filter(|((t, _), _)| t == topic)
            .map(|(_, log)| log.ready.len() + log.in_flight.len())
            .sum()
    }

    /// Put every in-flight record back at the head of its partition.
    pub fn redeliver_unacked(&self) {
        for log in self.logs.lock().values_mut() {
            for record in log.in_flight.drain(..).rev() {
                log.ready.push_front(record);
            }
        }
    }

    fn check_partition(&self, topic: &str, partition: u32) -> Result<(), BrokerError> {
        if partition >= self.partitions {
            return Err(BrokerError::UnknownTopic(format!("{}:{}", topic, partition)));
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    fn partitions(&self) -> u32 {
        self.partitions
    }

    async fn publish(&self, topic: &str, partition: u32, payload: &[u8]) -> Result<String, BrokerError> {
        self.check_partition(topic, partition)?;
        if !self.available.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable("memory broker offline".to_string()));
        }

        let id = format!("{}-0", self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = BrokerRecord {
            topic: topic.to_string(),
            partition,
            id: id.clone(),
            payload: payload.to_vec(),
        };

        self.published.lock().push(record.clone());
        self.logs
            .lock()
            .entry((topic.to_string(), partition))
            .or_default()
            .ready
            .push_back(record);
        Ok(id)
    }

    async fn poll(&self, topic: &str, partition: u32, max: usize) -> Result<Vec<BrokerRecord>, BrokerError> {
        self.check_partition(topic, partition)?;
        let mut logs = self.logs.lock();
        let Some(log) = logs.get_mut(&(topic.to_string(), partition)) else {
            return Ok(Vec::new());
        };

        let take = max.max(1).min(log.ready.len());
        let batch: Vec<BrokerRecord> = log.ready.drain(..take).collect();
        log.in_flight.extend(batch.iter().cloned());
        Ok(batch)
    }

    async fn ack(&self, record: &BrokerRecord) -> Result<(), BrokerError> {
        if let Some(log) = self
            .logs
            .lock()
            .get_mut(&(record.topic.clone(), record.partition))
        {
            log.in_flight.retain(|r| r.id != record.id);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::Unavailable("memory broker offline".to_string()))
        }
    }
}
