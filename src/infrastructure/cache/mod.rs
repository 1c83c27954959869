//! Cache Module
//!
//! Redis connection management and caching utilities.
//!
//! This module provides:
//! - Redis connection management with automatic reconnection
//! - A `Cache` trait abstracting the key/value backend
//! - `RedisCache` and `MemoryCache` implementations
//! - `ConversationCache`, the read-through history cache
//! - `PresenceCache`, fire-and-forget last-seen timestamps
//!
//! # Architecture
//!
//! ```text
//! +--------------------+   +----------------+
//! | ConversationCache  |   | PresenceCache  |
//! +--------------------+   +----------------+
//!           |                      |
//!           v                      v
//! +-------------------------------------------+
//! |          Cache trait (Arc<dyn Cache>)     |
//! +-------------------------------------------+
//!           |                      |
//!           v                      v
//! +-------------------+   +-------------------+
//! |    RedisCache     |   |    MemoryCache    |
//! +-------------------+   +-------------------+
//! ```

mod cache_service;
mod conversation_cache;
mod memory_cache;
mod presence_cache;

pub use cache_service::{Cache, RedisCache};
pub use conversation_cache::ConversationCache;
pub use memory_cache::MemoryCache;
pub use presence_cache::PresenceCache;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// The connection manager multiplexes commands over one connection and
/// reconnects when the connection is lost. Clones share the connection.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key prefixes for different data types.
///
/// Use these helpers to ensure consistent key naming across the application.
pub mod keys {
    use crate::domain::ConversationId;

    /// Prefix for conversation history (e.g., "history:1:2")
    pub const HISTORY: &str = "history:";

    /// Prefix for last-seen timestamps (e.g., "presence:last_seen:42")
    pub const LAST_SEEN: &str = "presence:last_seen:";

    /// Generates the history key of a conversation
    #[inline]
    pub fn history(conversation: ConversationId) -> String {
        format!("{}{}", HISTORY, conversation)
    }

    /// Generates the last-seen key of a user
    #[inline]
    pub fn last_seen(user_id: impl std::fmt::Display) -> String {
        format!("{}{}", LAST_SEEN, user_id)
    }
}
