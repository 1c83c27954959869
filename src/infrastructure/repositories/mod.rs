//! Repository Implementations
//!
//! Implementations of the domain `MessageStore` contract.
//!
//! - **PgMessageRepository** - PostgreSQL, used in production
//! - **MemoryMessageStore** - in-process, used by tests and local runs

pub mod memory_message_repository;
pub mod message_repository;

pub use memory_message_repository::MemoryMessageStore;
pub use message_repository::PgMessageRepository;
