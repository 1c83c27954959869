//! # Domain Layer
//!
//! Core types of the delivery backbone, independent of transport and storage.
//!
//! ## Structure
//!
//! - **entities**: the chat message and the `MessageStore` contract
//! - **value_objects**: event/media kinds and the conversation identifier

pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
