//! Database Module
//!
//! PostgreSQL pool backing the durable message log. `run_migrations` creates
//! the `messages` table and its participant-pair index on boot.

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::DatabaseSettings;

/// Open the pool the message store draws from.
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect(&settings.url)
        .await
}

/// The messages schema, embedded at build time.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply the embedded migrations; already applied ones are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
