//! History Service
//!
//! Read path for recent conversation history: cache first, store on a miss,
//! and repopulate the cache from what the store returned.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::dto::MessageDto;
use crate::domain::MessageStore;
use crate::infrastructure::cache::ConversationCache;
use crate::shared::error::StoreError;

#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn MessageStore>,
    cache: ConversationCache,
    limit: i64,
}

impl HistoryService {
    pub fn new(store: Arc<dyn MessageStore>, cache: ConversationCache, limit: i64) -> Self {
        Self {
            store,
            cache,
            limit: limit.max(1),
        }
    }

    /// Up to `limit` most recent messages between the two users, newest first.
    ///
    /// Cache trouble of any kind falls back to the store. Only a store failure
    /// is an error.
    #[instrument(skip(self))]
    pub async fn get_history(&self, user_id: u64, target_id: u64) -> Result<Vec<MessageDto>, StoreError> {
        match self.cache.get::<MessageDto>(user_id, target_id).await {
            Ok(Some(items)) => {
                debug!(count = items.len(), "History served from cache");
                return Ok(items);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "History cache unavailable; reading store"),
        }

        let rows = self
            .store
            .recent_between(user_id, target_id, self.limit)
            .await?;
        let items: Vec<MessageDto> = rows.iter().map(MessageDto::from).collect();

        if !items.is_empty() {
            if let Err(e) = self.cache.put(user_id, target_id, &items).await {
                warn!(error = %e, "Failed to repopulate history cache");
            }
        }
        Ok(items)
    }
}
