//! Keyword retriever over an in-process passage corpus.

use async_trait::async_trait;
use documentor_core::error::RetrievalError;
use documentor_core::retriever::{Passage, Retriever};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One line of a corpus file.
#[derive(Debug, Deserialize)]
struct CorpusLine {
    text: String,
    #[serde(default)]
    source: Option<String>,
}

/// Ranks passages by how many query terms they contain.
///
/// Ties keep corpus order. Passages sharing no term with the query are
/// never returned.
#[derive(Debug, Default)]
pub struct KeywordRetriever {
    passages: Vec<Passage>,
}

impl KeywordRetriever {
    pub fn from_passages(passages: Vec<Passage>) -> Self {
        Self { passages }
    }

    /// Load a JSONL corpus: one `{"text": ..., "source": ...}` object per line.
    pub fn load(path: &Path) -> Result<Self, RetrievalError> {
        let corpus_err = |reason: String| RetrievalError::CorpusLoad {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| corpus_err(e.to_string()))?;

        let mut passages = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: CorpusLine = serde_json::from_str(line)
                .map_err(|e| corpus_err(format!("line {}: {e}", n + 1)))?;
            passages.push(Passage {
                text: parsed.text,
                source: parsed.source,
                score: 0.0,
            });
        }

        debug!(count = passages.len(), path = %path.display(), "Corpus loaded");
        Ok(Self { passages })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        let query_terms = terms(query);
        if query_terms.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Passage> = self
            .passages
            .iter()
            .filter_map(|p| {
                let hits = terms(&p.text).intersection(&query_terms).count();
                (hits > 0).then(|| Passage {
                    score: hits as f32 / query_terms.len() as f32,
                    ..p.clone()
                })
            })
            .collect();

        // Stable sort keeps corpus order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }
}
