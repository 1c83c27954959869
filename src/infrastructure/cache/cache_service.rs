//! Cache Service
//!
//! Cache trait and its Redis implementation.
//!
//! Values cross this seam as strings; typed (JSON) access lives one level up in
//! `ConversationCache`, which keeps this trait object-safe so the pipeline can
//! hold an `Arc<dyn Cache>`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, instrument};

use crate::shared::error::CacheError;

/// Key/value cache with expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Retrieves a raw value by key.
    ///
    /// # Returns
    /// * `Ok(Some(value))` - If the key exists
    /// * `Ok(None)` - If the key does not exist
    /// * `Err(CacheError)` - If the backend fails
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores a value with an expiration time in seconds.
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), CacheError>;

    /// Deletes a key.
    ///
    /// # Returns
    /// * `Ok(true)` - If the key existed and was deleted
    /// * `Ok(false)` - If the key did not exist
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Connectivity check for readiness checks.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Redis-backed cache implementation.
///
/// Uses a Redis ConnectionManager for multiplexing and automatic reconnection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Cache for RedisCache {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let result: Option<String> = conn.get(key).await?;

        match &result {
            Some(_) => debug!(key = %key, "Cache hit"),
            None => debug!(key = %key, "Cache miss"),
        }
        Ok(result)
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, seconds).await?;
        debug!(key = %key, ttl = seconds, "Cache set with expiry");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let deleted: u64 = conn.del(key).await?;
        debug!(key = %key, deleted = deleted > 0, "Cache delete");
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}
