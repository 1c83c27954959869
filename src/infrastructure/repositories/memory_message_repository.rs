//! In-memory message store.
//!
//! Used by the integration tests and for running the pipeline without
//! PostgreSQL. Failures can be injected to exercise the retry cascade.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::domain::{MessageStore, NewMessage, PersistedMessage};
use crate::shared::error::StoreError;

#[derive(Default)]
pub struct MemoryMessageStore {
    rows: Mutex<Vec<PersistedMessage>>,
    next_id: AtomicI64,
    unavailable: AtomicBool,
    failures_left: AtomicU32,
    attempts: Mutex<Vec<Instant>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert fail (`false`) or succeed (`true`).
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Fail exactly the next `count` inserts, then recover.
    pub fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Every stored row, in insertion order.
    pub fn rows(&self) -> Vec<PersistedMessage> {
        self.rows.lock().clone()
    }

    /// Instants of every insert attempt, successful or not.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    fn should_fail(&self) -> bool {
        if self.unavailable.load(Ordering::SeqCst) {
            return true;
        }
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, message: &NewMessage) -> Result<PersistedMessage, StoreError> {
        self.attempts.lock().push(Instant::now());

        if self.should_fail() {
            return Err(StoreError::Unavailable("injected failure".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = PersistedMessage::from_new(id, message.clone(), Utc::now());
        self.rows.lock().push(stored.clone());
        Ok(stored)
    }

    async fn recent_between(
        &self,
        a: u64,
        b: u64,
        limit: i64,
    ) -> Result<Vec<PersistedMessage>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }

        let limit = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
        let rows = self.rows.lock();
        Ok(rows
            .iter()
            .rev()
            .filter(|m| {
                (m.from_user_id == a && m.to_user_id == b)
                    || (m.from_user_id == b && m.to_user_id == a)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked unavailable".into()));
        }
        Ok(())
    }
}
