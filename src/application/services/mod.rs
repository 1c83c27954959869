//! Application Services
//!
//! Services that coordinate the store, cache, broker and live sessions.
//!
//! ## Available Services
//!
//! - **IngestService**: inbound chat event → write request on the primary topic
//! - **HistoryService**: read-through conversation history
//! - **FanoutService**: persisted message → recipient's live session

pub mod fanout_service;
pub mod history_service;
pub mod ingest_service;

pub use fanout_service::{FanoutService, PushOutcome};
pub use history_service::HistoryService;
pub use ingest_service::{IngestError, IngestService};
