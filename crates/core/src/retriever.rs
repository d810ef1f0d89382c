//! Retriever trait: the retrieval gateway.
//!
//! Given a query string, a retriever returns a ranked list of context
//! passages. Passages are attached to answers as `sources` but are never
//! written into a session's message log.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// One retrieved context passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// The passage text
    pub text: String,

    /// Where the passage came from (file name, URL, endpoint path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Relevance score assigned by the retriever (higher is better)
    #[serde(default)]
    pub score: f32,
}

impl Passage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
            score: 0.0,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// The core Retriever trait.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// The retriever name (e.g., "keyword", "chroma").
    fn name(&self) -> &str;

    /// Return at most `k` passages for `query`, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError>;
}
