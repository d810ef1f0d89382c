//! PostgreSQL history backend.
//!
//! Same layout as the SQLite store, for deployments where several gateway
//! replicas share one history database.
//!
//! # Feature gate
//!
//! ```toml
//! documentor-history = { workspace = true, features = ["postgres"] }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use documentor_core::error::HistoryError;
use documentor_core::history::{HistoryStore, MessageLog};
use documentor_core::message::Message;

use crate::clock::MonotonicClock;

/// PostgreSQL history store.
pub struct PostgresHistory {
    pool: PgPool,
    clock: MonotonicClock,
}

impl PostgresHistory {
    /// Connect and migrate.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, HistoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .map_err(|e| HistoryError::Storage(format!("PostgreSQL connection failed: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("Connected to PostgreSQL for history");
        Ok(store)
    }

    /// Wrap an existing pool and migrate it.
    pub async fn from_pool(pool: PgPool) -> Result<Self, HistoryError> {
        let store = Self {
            pool,
            clock: MonotonicClock::new(),
        };
        store.migrate().await?;

        let latest: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM messages")
                .fetch_one(&store.pool)
                .await
                .map_err(|e| HistoryError::QueryFailed(format!("Failed to read latest stamp: {e}")))?;
        if let Some(stamp) = latest {
            store.clock.observe(stamp);
        }
        Ok(store)
    }

    /// Create the schema if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid         BIGSERIAL PRIMARY KEY,
                session_id  TEXT NOT NULL,
                payload     JSONB NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_session_created \
             ON messages(session_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("session index: {e}")))?;

        debug!("PostgreSQL history migrations applied");
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PostgresHistory {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn get(&self, session_id: &str) -> Result<MessageLog, HistoryError> {
        let rows = sqlx::query(
            "SELECT payload::text AS payload FROM messages \
             WHERE session_id = $1 ORDER BY created_at ASC, iid ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::QueryFailed(format!("Failed to load history: {e}")))?;

        rows.iter()
            .map(|row| {
                let payload: String = row.get("payload");
                serde_json::from_str::<Message>(&payload)
                    .map(Message::normalized)
                    .map_err(|e| HistoryError::Serialization(format!("Corrupt message record: {e}")))
            })
            .collect()
    }

    async fn append(&self, session_id: &str, message: Message) -> Result<(), HistoryError> {
        let mut message = message.normalized();
        message.created_at = self.clock.now();
        let payload = serde_json::to_string(&message)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;

        sqlx::query(
            "INSERT INTO messages (session_id, payload, created_at) VALUES ($1, $2::jsonb, $3)",
        )
        .bind(session_id)
        .bind(&payload)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(session_id, error = %e, "History append failed");
            HistoryError::Storage(format!("Failed to append message: {e}"))
        })?;
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), HistoryError> {
        sqlx::query("DELETE FROM messages WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to clear session: {e}")))?;
        Ok(())
    }

    async fn len(&self, session_id: &str) -> Result<usize, HistoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HistoryError::QueryFailed(format!("Failed to count messages: {e}")))?;
        Ok(count as usize)
    }
}
