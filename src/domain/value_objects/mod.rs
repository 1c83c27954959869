//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **EventKind / MediaKind**: integer-coded kinds used on the wire and in storage
//! - **ConversationId**: order-independent participant pair

mod conversation;
mod kinds;

pub use conversation::*;
pub use kinds::*;
