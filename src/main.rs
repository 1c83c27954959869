//! # Chat Relay
//!
//! Application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and migrations
//! - Redis cache and broker streams
//! - Delivery consumers
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use chat_relay::config::Settings;
use chat_relay::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for structured logging
    chat_relay::telemetry::init_tracing();

    info!("Starting Chat Relay...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        partitions = settings.broker.partitions,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
