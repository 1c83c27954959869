//! Request DTOs
//!
//! Data structures for API query strings and bodies.

use serde::Deserialize;

/// Query string of `GET /api/chat/history`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HistoryQuery {
    pub target_id: u64,
}
