//! Retrieval gateway implementations for Documentor.
//!
//! - [`KeywordRetriever`] ranks an in-process JSONL corpus by term overlap
//! - [`ChromaRetriever`] embeds the query and asks a Chroma collection

pub mod chroma;
pub mod keyword;

pub use chroma::ChromaRetriever;
pub use keyword::KeywordRetriever;

use std::sync::Arc;

use documentor_config::{AppConfig, RetrieverKind};
use documentor_core::{Provider, RetrievalError, Retriever};
use tracing::{info, warn};

/// Build the retriever selected by `config.retrieval.kind`.
///
/// `provider` supplies query embeddings for the Chroma retriever.
pub fn build_from_config(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
) -> Result<Arc<dyn Retriever>, RetrievalError> {
    let retrieval = &config.retrieval;
    let retriever: Arc<dyn Retriever> = match retrieval.kind {
        RetrieverKind::Keyword => match &retrieval.corpus_path {
            Some(path) => Arc::new(KeywordRetriever::load(path)?),
            None => {
                warn!("No retrieval.corpus_path set; keyword retriever starts empty");
                Arc::new(KeywordRetriever::default())
            }
        },
        RetrieverKind::Chroma => Arc::new(
            ChromaRetriever::new(
                &retrieval.chroma_url,
                &retrieval.chroma_tenant,
                &retrieval.chroma_database,
                &retrieval.collection,
                provider,
                &config.generation.embedding_model,
            )
            .with_api_key(retrieval.chroma_api_key.clone()),
        ),
    };
    info!(retriever = retriever.name(), "Retriever ready");
    Ok(retriever)
}
