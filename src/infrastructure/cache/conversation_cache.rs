//! Conversation history cache.
//!
//! One entry per unordered participant pair holds the JSON-encoded recent
//! history. Writers never patch an entry: a successful persist deletes the key
//! and the next reader repopulates it from the store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};

use super::{keys, Cache};
use crate::domain::ConversationId;
use crate::infrastructure::metrics;
use crate::shared::error::CacheError;

#[derive(Clone)]
pub struct ConversationCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
    op_timeout: Duration,
}

impl ConversationCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration, op_timeout: Duration) -> Self {
        Self {
            cache,
            ttl,
            op_timeout,
        }
    }

    /// `history:<min>:<max>` for the pair `(a, b)` in either order.
    pub fn key(a: u64, b: u64) -> String {
        keys::history(ConversationId::new(a, b))
    }

    /// Cached history for the pair, `Ok(None)` on a miss.
    ///
    /// A value that no longer decodes is reported as `CacheError::Corrupt` so
    /// the caller can fall back to the store.
    #[instrument(skip(self), level = "debug")]
    pub async fn get<T: DeserializeOwned>(&self, a: u64, b: u64) -> Result<Option<Vec<T>>, CacheError> {
        let key = Self::key(a, b);
        let raw = self.bounded(self.cache.get(&key)).await?;

        match raw {
            Some(data) => {
                let items = serde_json::from_str(&data)?;
                metrics::record_cache_lookup(true);
                Ok(Some(items))
            }
            None => {
                metrics::record_cache_lookup(false);
                Ok(None)
            }
        }
    }

    /// Store the history for the pair with the configured TTL.
    #[instrument(skip(self, items), fields(count = items.len()), level = "debug")]
    pub async fn put<T: Serialize + Sync>(&self, a: u64, b: u64, items: &[T]) -> Result<(), CacheError> {
        let key = Self::key(a, b);
        let data = serde_json::to_string(items)?;
        self.bounded(self.cache.set_ex(&key, &data, self.ttl.as_secs().max(1)))
            .await
    }

    /// Drop the entry for the pair. Returns whether an entry existed.
    #[instrument(skip(self), level = "debug")]
    pub async fn invalidate(&self, a: u64, b: u64) -> Result<bool, CacheError> {
        let key = Self::key(a, b);
        let existed = self.bounded(self.cache.delete(&key)).await?;
        debug!(key = %key, existed, "Conversation cache invalidated");
        Ok(existed)
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| CacheError::Timeout)?
    }
}
