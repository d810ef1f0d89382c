//! History store trait: the per-session ordered message log.
//!
//! A session has no storage of its own: its id is the partition key of its
//! message log. Logs come into existence on first read or write and are
//! emptied only on explicit request.
//!
//! Every backend upholds the same contract:
//! - `get` of an unknown session returns an empty log, never an error
//! - `append` is atomic per call and assigns the next ordering position
//! - `clear` is idempotent
//! - content is flattened to a single string on write, and any multi-part
//!   record found on read is repaired before it is returned

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::message::Message;

/// Session shared by every caller that does not name one.
///
/// This is a convenience default, not an isolation boundary: all
/// unidentified callers read and write the same log.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Ordered messages belonging to one session.
pub type MessageLog = Vec<Message>;

/// Opaque session key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Use the supplied id, or `fallback` when it is missing or blank.
    pub fn resolve(id: Option<&str>, fallback: &str) -> Self {
        match id.map(str::trim) {
            Some(s) if !s.is_empty() => Self(s.to_string()),
            _ => Self(fallback.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(DEFAULT_SESSION_ID.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The core HistoryStore trait.
///
/// Implementations: in-memory (volatile), SQLite and PostgreSQL (persistent).
/// Exactly one is active per process; callers only see this trait.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The backend name (e.g., "memory", "sqlite", "postgres").
    fn name(&self) -> &str;

    /// Return the ordered log for `session_id`, empty if never written.
    async fn get(&self, session_id: &str) -> Result<MessageLog, HistoryError>;

    /// Append one message at the end of the session's log.
    async fn append(&self, session_id: &str, message: Message) -> Result<(), HistoryError>;

    /// Remove every message of the session. Clearing an absent session is a no-op.
    async fn clear(&self, session_id: &str) -> Result<(), HistoryError>;

    /// Append several messages in order, stopping at the first failure.
    async fn append_all(
        &self,
        session_id: &str,
        messages: Vec<Message>,
    ) -> Result<(), HistoryError> {
        for message in messages {
            self.append(session_id, message).await?;
        }
        Ok(())
    }

    /// Number of messages currently stored for the session.
    async fn len(&self, session_id: &str) -> Result<usize, HistoryError> {
        Ok(self.get(session_id).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_on_missing_or_blank() {
        assert_eq!(SessionId::resolve(None, "default").as_str(), "default");
        assert_eq!(SessionId::resolve(Some("   "), "default").as_str(), "default");
        assert_eq!(SessionId::resolve(Some(" s1 "), "default").as_str(), "s1");
    }

    #[test]
    fn session_id_serializes_transparently() {
        let json = serde_json::to_string(&SessionId::new("abc")).unwrap();
        assert_eq!(json, r#""abc""#);
    }
}
