//! In-process cache with expiry, for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::Cache;
use crate::shared::error::CacheError;

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    unavailable: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail, as if the cache server were down.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Whether a live (unexpired) entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|(_, expires)| *expires > Instant::now())
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("cache marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check()?;
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), CacheError> {
        self.check()?;
        let expires = Instant::now() + Duration::from_secs(seconds);
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.check()?;
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }
}
