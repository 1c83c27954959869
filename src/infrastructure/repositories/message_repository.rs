//! Message Repository Implementation
//!
//! PostgreSQL implementation of the `MessageStore` contract used by the
//! delivery cascade (inserts) and the history read path (range queries).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::domain::{EventKind, MediaKind, MessageStore, NewMessage, PersistedMessage};
use crate::infrastructure::metrics;
use crate::shared::error::StoreError;

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for message queries.
/// Maps to the messages table schema defined in the migration.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    from_user_id: i64,
    to_user_id: i64,
    content: String,
    kind: i32,
    media: i32,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    /// Converts database row to domain message.
    fn into_message(self) -> Result<PersistedMessage, StoreError> {
        let from_user_id = u64::try_from(self.from_user_id)
            .map_err(|_| StoreError::InvalidRow(format!("negative from_user_id in row {}", self.id)))?;
        let to_user_id = u64::try_from(self.to_user_id)
            .map_err(|_| StoreError::InvalidRow(format!("negative to_user_id in row {}", self.id)))?;
        let media = MediaKind::try_from(self.media).map_err(StoreError::InvalidRow)?;

        Ok(PersistedMessage {
            id: self.id,
            from_user_id,
            to_user_id,
            content: self.content,
            kind: EventKind::from(self.kind),
            media,
            created_at: self.created_at,
        })
    }
}

fn to_column(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::IdOutOfRange(id))
}

#[async_trait]
impl MessageStore for PgMessageRepository {
    #[instrument(skip(self, message), fields(from = message.from_user_id, to = message.to_user_id))]
    async fn insert(&self, message: &NewMessage) -> Result<PersistedMessage, StoreError> {
        let started = std::time::Instant::now();

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (from_user_id, to_user_id, content, "type", media)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, from_user_id, to_user_id, content,
                      "type" AS kind, media, created_at
            "#,
        )
        .bind(to_column(message.from_user_id)?)
        .bind(to_column(message.to_user_id)?)
        .bind(&message.content)
        .bind(i32::from(message.kind))
        .bind(i32::from(message.media))
        .fetch_one(&self.pool)
        .await;

        metrics::record_db_query("insert", "messages", started.elapsed().as_secs_f64());
        row?.into_message()
    }

    /// Messages in either direction between `a` and `b`, newest first.
    #[instrument(skip(self))]
    async fn recent_between(
        &self,
        a: u64,
        b: u64,
        limit: i64,
    ) -> Result<Vec<PersistedMessage>, StoreError> {
        let started = std::time::Instant::now();

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, from_user_id, to_user_id, content,
                   "type" AS kind, media, created_at
            FROM messages
            WHERE (from_user_id = $1 AND to_user_id = $2)
               OR (from_user_id = $2 AND to_user_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(to_column(a)?)
        .bind(to_column(b)?)
        .bind(limit.max(1))
        .fetch_all(&self.pool)
        .await;

        metrics::record_db_query("select", "messages", started.elapsed().as_secs_f64());
        rows?.into_iter().map(MessageRow::into_message).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
