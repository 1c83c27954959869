//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL)
//! - Cache implementations (Redis)
//! - Delivery broker (Redis Streams)
//! - Prometheus metrics

pub mod broker;
pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
