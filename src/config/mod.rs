//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Built-in defaults
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - Environment variables (prefixed with APP__)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_relay::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Consuming {} partitions per topic", settings.broker.partitions);
//! ```

mod settings;

pub use settings::*;
