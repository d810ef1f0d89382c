//! What a turn hands back to its caller.

use documentor_core::error::HistoryError;
use documentor_core::retriever::Passage;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Answer for blank questions. Nothing is retrieved, generated or stored.
pub const EMPTY_QUESTION_ANSWER: &str = "Question must not be empty.";

/// Answer when retrieval or generation fails in a Q&A turn.
pub const QA_FAILURE_ANSWER: &str = "Sorry, an error occurred while processing your question.";

/// Answer when the agent loop fails or runs out of iterations.
pub const AGENT_FAILURE_ANSWER: &str = "Error executing agent";

/// A whole answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    /// Retrieved passage texts; `None` for agent turns and when nothing was found.
    pub sources: Option<Vec<String>>,
}

impl ChatResponse {
    pub fn answer_only(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: None,
        }
    }

    pub fn with_passages(answer: impl Into<String>, passages: &[Passage]) -> Self {
        let sources = (!passages.is_empty())
            .then(|| passages.iter().map(|p| p.text.clone()).collect());
        Self {
            answer: answer.into(),
            sources,
        }
    }
}

/// The only failure a turn reports instead of a fallback answer.
///
/// History could not be read, or an answer was produced but could not be
/// recorded. Gateway and tool failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Conversation history unavailable: {0}")]
    History(#[from] HistoryError),
}

/// Lazily produced answer fragments.
///
/// An `Err` item is always last and means the turn was not recorded.
pub type FragmentStream = BoxStream<'static, Result<String, TurnError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_absent_when_nothing_retrieved() {
        assert_eq!(ChatResponse::with_passages("a", &[]).sources, None);
        let r = ChatResponse::with_passages("a", &[Passage::new("p").with_source("x.md")]);
        assert_eq!(r.sources, Some(vec!["p".to_string()]));
    }

    #[test]
    fn serializes_null_sources() {
        let json = serde_json::to_value(ChatResponse::answer_only("x")).unwrap();
        assert_eq!(json, serde_json::json!({"answer": "x", "sources": null}));
    }
}
