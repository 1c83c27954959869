//! # Chat Relay Library
//!
//! Real-time delivery backbone for one-to-one chat:
//! - WebSocket hub tracking one live session per user
//! - Broker-backed delivery cascade (primary → retry → dead)
//! - PostgreSQL for the durable message log
//! - Redis for the history cache, presence and the broker streams
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: the message entity, its store contract and value objects
//! - **Application Layer**: ingest, history and fan-out services; the delivery cascade
//! - **Infrastructure Layer**: database, cache, broker and metrics implementations
//! - **Presentation Layer**: HTTP handlers, middleware and the WebSocket hub
//!
//! ## Module Structure
//!
//! ```text
//! chat_relay/
//! +-- config/         Configuration management
//! +-- domain/         Message entity, store trait, kinds, conversation ids
//! +-- application/    Services, delivery cascade and DTOs
//! +-- infrastructure/ Postgres, Redis cache, Redis Streams broker, metrics
//! +-- presentation/   HTTP routes, auth middleware, WebSocket sessions
//! +-- shared/         Common utilities (errors, clock)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
