//! SQLite history backend.
//!
//! One table, `messages`, holds every session's log. Each row carries the
//! session id, the message serialized as JSON, and an insertion timestamp
//! from a [`MonotonicClock`]. Logs are read back ordered by that timestamp,
//! with the autoincrement row id breaking ties.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use documentor_core::error::HistoryError;
use documentor_core::history::{HistoryStore, MessageLog};
use documentor_core::message::Message;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::clock::{MonotonicClock, to_sortable};

/// A persistent SQLite history store.
pub struct SqliteHistory {
    pool: SqlitePool,
    clock: MonotonicClock,
}

impl SqliteHistory {
    /// Open (or create) the database at `url` and migrate it.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| HistoryError::Storage(format!("Invalid SQLite url: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite history store opened at {url}");
        Ok(store)
    }

    /// Wrap an existing pool and migrate it.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, HistoryError> {
        let store = Self {
            pool,
            clock: MonotonicClock::new(),
        };
        store.migrate().await?;
        store.seed_clock().await?;
        Ok(store)
    }

    /// Create the schema if it does not exist yet. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid         INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id  TEXT NOT NULL,
                payload     TEXT NOT NULL,
                created_at  TEXT NOT NULL
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

        debug!("SQLite history migrations applied");
        Ok(())
    }

    /// Start the clock at the newest stored stamp so a reopened store keeps
    /// appending after existing rows.
    async fn seed_clock(&self) -> Result<(), HistoryError> {
        let latest: Option<String> = sqlx::query_scalar("SELECT MAX(created_at) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HistoryError::QueryFailed(format!("Failed to read latest stamp: {e}")))?;

        if let Some(stamp) = latest.as_deref().and_then(parse_stamp) {
            self.clock.observe(stamp);
        }
        Ok(())
    }

    /// Total number of stored messages across every session.
    pub async fn total_messages(&self) -> Result<usize, HistoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HistoryError::QueryFailed(format!("Failed to count messages: {e}")))?;
        Ok(count as usize)
    }
}

fn parse_stamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn decode(payload: &str) -> Result<Message, HistoryError> {
    serde_json::from_str::<Message>(payload)
        .map(Message::normalized)
        .map_err(|e| HistoryError::Serialization(format!("Corrupt message record: {e}")))
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, session_id: &str) -> Result<MessageLog, HistoryError> {
        let rows = sqlx::query(
            "SELECT payload FROM messages WHERE session_id = ? ORDER BY created_at ASC, iid ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::QueryFailed(format!("Failed to load history: {e}")))?;

        rows.iter()
            .map(|row| decode(row.get::<&str, _>("payload")))
            .collect()
    }

    async fn append(&self, session_id: &str, message: Message) -> Result<(), HistoryError> {
        // The stored timestamp is the ordering key, not the construction time
        let mut message = message.normalized();
        message.created_at = self.clock.now();
        let created_at = to_sortable(message.created_at);
        let payload = serde_json::to_string(&message)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;

        sqlx::query("INSERT INTO messages (session_id, payload, created_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(&payload)
            .bind(&created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(session_id, error = %e, "History append failed");
                HistoryError::Storage(format!("Failed to append message: {e}"))
            })?;
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), HistoryError> {
        let result = sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to clear session: {e}")))?;
        debug!(session_id, removed = result.rows_affected(), "Session cleared");
        Ok(())
    }

    async fn len(&self, session_id: &str) -> Result<usize, HistoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HistoryError::QueryFailed(format!("Failed to count messages: {e}")))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use documentor_core::message::{MessageContent, Role};

    async fn test_store() -> SqliteHistory {
        SqliteHistory::connect("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let store = test_store().await;
        assert!(store.get("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stored_timestamp_is_the_ordering_key() {
        let store = test_store().await;
        let mut early = Message::human("built long ago");
        early.created_at = DateTime::parse_from_rfc3339("2001-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        store.append("s1", early).await.unwrap();
        store.append("s1", Message::ai("reply")).await.unwrap();

        let log = store.get("s1").await.unwrap();
        let keys: Vec<String> =
            sqlx::query_scalar("SELECT created_at FROM messages WHERE session_id = ? ORDER BY iid")
                .bind("s1")
                .fetch_all(&store.pool)
                .await
                .unwrap();

        assert!(log[0].created_at.year() > 2001);
        assert!(log[0].created_at <= log[1].created_at);
        let shown: Vec<String> = log.iter().map(|m| to_sortable(m.created_at)).collect();
        assert_eq!(shown, keys);
    }

    #[tokio::test]
    async fn append_then_get_preserves_order() {
        let store = test_store().await;
        for i in 0..10 {
            store
                .append("s1", Message::human(format!("q{i}")))
                .await
                .unwrap();
        }
        let log = store.get("s1").await.unwrap();
        let texts: Vec<String> = log.iter().map(|m| m.text().into_owned()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("q{i}")).collect();
        assert_eq!(texts, expected);
    }

    #[tokio::test]
    async fn roles_and_tool_calls_survive_storage() {
        let store = test_store().await;
        let mut ai = Message::ai("");
        ai.tool_calls.push(documentor_core::MessageToolCall {
            id: "call_1".into(),
            name: "knowledge_search".into(),
            arguments: r#"{"query":"auth"}"#.into(),
        });
        store.append("s", Message::human("How?")).await.unwrap();
        store.append("s", ai).await.unwrap();
        store
            .append("s", Message::tool_result("call_1", "Bearer tokens"))
            .await
            .unwrap();

        let log = store.get("s").await.unwrap();
        assert_eq!(log[0].role, Role::Human);
        assert_eq!(log[1].tool_calls[0].name, "knowledge_search");
        assert_eq!(log[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn sessions_are_isolated_and_clear_is_idempotent() {
        let store = test_store().await;
        store.append("a", Message::human("one")).await.unwrap();
        store.append("b", Message::human("two")).await.unwrap();

        store.clear("a").await.unwrap();
        store.clear("a").await.unwrap();
        store.clear("never").await.unwrap();

        assert_eq!(store.len("a").await.unwrap(), 0);
        assert_eq!(store.len("b").await.unwrap(), 1);
        assert_eq!(store.total_messages().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn multi_part_records_are_repaired_on_read() {
        let store = test_store().await;
        let legacy = Message::ai(vec!["alpha", "beta"]);
        let payload = serde_json::to_string(&legacy).unwrap();
        sqlx::query("INSERT INTO messages (session_id, payload, created_at) VALUES (?, ?, ?)")
            .bind("legacy")
            .bind(&payload)
            .bind(to_sortable(Utc::now()))
            .execute(&store.pool)
            .await
            .unwrap();

        let log = store.get("legacy").await.unwrap();
        assert!(matches!(&log[0].content, MessageContent::Text(t) if t == "alpha\nbeta"));
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error() {
        let store = test_store().await;
        sqlx::query("INSERT INTO messages (session_id, payload, created_at) VALUES (?, ?, ?)")
            .bind("bad")
            .bind("not json")
            .bind(to_sortable(Utc::now()))
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.get("bad").await.unwrap_err();
        assert!(matches!(err, HistoryError::Serialization(_)));
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("history.db").display());

        {
            let store = SqliteHistory::connect(&url, 2).await.unwrap();
            store.append("s", Message::human("before")).await.unwrap();
            store.append("s", Message::ai("restart")).await.unwrap();
        }

        let store = SqliteHistory::connect(&url, 2).await.unwrap();
        store.append("s", Message::human("after")).await.unwrap();

        let log = store.get("s").await.unwrap();
        let texts: Vec<String> = log.iter().map(|m| m.text().into_owned()).collect();
        assert_eq!(texts, vec!["before", "restart", "after"]);
    }

    #[tokio::test]
    async fn migrate_is_repeatable() {
        let store = test_store().await;
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
    }
}
