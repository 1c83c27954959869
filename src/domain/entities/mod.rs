//! # Domain Entities
//!
//! The only entity this service owns is the one-to-one chat message. Its store
//! contract is defined here and implemented in the infrastructure layer,
//! following the dependency inversion principle.

mod message;

pub use message::{MessageStore, NewMessage, PersistedMessage};

#[cfg(test)]
pub use message::MockMessageStore;
