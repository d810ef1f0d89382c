//! Per-session turn serialization.
//!
//! Every turn holds its session's lock from the moment it reads history
//! until its last append, so two turns on one session never interleave
//! their messages. Turns on different sessions never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::info;

use documentor_core::error::HistoryError;
use documentor_core::history::HistoryStore;

/// Held for the duration of one turn.
pub type SessionGuard = OwnedMutexGuard<()>;

/// One async mutex per session id, created on demand.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `session_id`.
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody holds or waits on can go
            locks.retain(|id, lock| id == session_id || Arc::strong_count(lock) > 1);
            locks
                .entry(session_id.to_string())
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Empty `session_id` once no turn is running on it.
    ///
    /// Waits behind an in-flight turn so that turn's messages land before
    /// the log is emptied, never after. Returns how many messages went.
    pub async fn clear(
        &self,
        history: &dyn HistoryStore,
        session_id: &str,
    ) -> Result<usize, HistoryError> {
        let _guard = self.acquire(session_id).await;
        let removed = history.len(session_id).await?;
        history.clear(session_id).await?;
        info!(session_id, removed, "Session cleared");
        Ok(removed)
    }

    /// Sessions with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
