//! Delivery Pipeline
//!
//! Consumes write requests from the broker and makes them durable:
//!
//! - **cascade**: per-record handling for the primary, retry and dead topics
//! - **consumer**: one polling task per topic partition
//! - **policy**: attempt counts and pauses

mod cascade;
mod consumer;
mod policy;

pub use cascade::{DeliveryCascade, Outcome, Stage};
pub use consumer::spawn_consumers;
pub use policy::DeliveryPolicy;
