//! In-memory history, lost when the process exits.

use async_trait::async_trait;
use documentor_core::error::HistoryError;
use documentor_core::history::{HistoryStore, MessageLog};
use documentor_core::message::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Volatile history keyed by session id.
///
/// A single write lock covers each append, so appends are atomic and
/// readers always see a prefix of the final log.
pub struct InMemoryHistory {
    sessions: Arc<RwLock<HashMap<String, MessageLog>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of sessions with at least one message.
    pub async fn session_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|log| !log.is_empty())
            .count()
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, session_id: &str) -> Result<MessageLog, HistoryError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, session_id: &str, message: Message) -> Result<(), HistoryError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(message.normalized());
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), HistoryError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn len(&self, session_id: &str) -> Result<usize, HistoryError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .map_or(0, Vec::len))
    }
}
