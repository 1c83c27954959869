//! Application Layer
//!
//! Contains the services and the delivery pipeline, plus the data transfer
//! objects (DTOs) they hand to the presentation layer.

pub mod delivery;
pub mod dto;
pub mod services;
