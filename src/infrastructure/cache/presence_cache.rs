//! Presence Cache
//!
//! Out-of-band "last seen" timestamps. Written fire-and-forget on disconnect;
//! never on the message path.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::{keys, Cache};
use crate::shared::error::CacheError;

/// Last-seen entries outlive any reasonable absence.
const LAST_SEEN_TTL_SECS: u64 = 30 * 24 * 3600;

#[derive(Clone)]
pub struct PresenceCache {
    cache: Arc<dyn Cache>,
    op_timeout: Duration,
}

impl PresenceCache {
    pub fn new(cache: Arc<dyn Cache>, op_timeout: Duration) -> Self {
        Self { cache, op_timeout }
    }

    /// Record `at` (Unix seconds) as the user's last-seen time.
    pub async fn record_last_seen(&self, user_id: u64, at: i64) -> Result<(), CacheError> {
        let key = keys::last_seen(user_id);
        let value = at.to_string();
        tokio::time::timeout(
            self.op_timeout,
            self.cache.set_ex(&key, &value, LAST_SEEN_TTL_SECS),
        )
            .await
            .map_err(|_| CacheError::Timeout)?
    }

    /// Last-seen time in Unix seconds, if known.
    pub async fn last_seen(&self, user_id: u64) -> Result<Option<i64>, CacheError> {
        let key = keys::last_seen(user_id);
        let raw = tokio::time::timeout(self.op_timeout, self.cache.get(&key))
            .await
            .map_err(|_| CacheError::Timeout)??;
        Ok(raw.and_then(|v| v.parse().ok()))
    }

    /// Spawn the write and return immediately; failures are only logged.
    pub fn spawn_record_last_seen(&self, user_id: u64, at: i64) {
        let presence = self.clone();
        tokio::spawn(async move {
            if let Err(e) = presence.record_last_seen(user_id, at).await {
                warn!(user_id, error = %e, "Failed to record last-seen");
            }
        });
    }
}
