//! Chroma retriever over the v2 HTTP API.
//!
//! The query is embedded through the generation provider, then sent to
//! `.../collections/{id}/query`. The collection id is looked up by name
//! once and cached.

use async_trait::async_trait;
use documentor_core::error::RetrievalError;
use documentor_core::provider::{EmbeddingRequest, Provider};
use documentor_core::retriever::{Passage, Retriever};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

pub struct ChromaRetriever {
    base_url: String,
    tenant: String,
    database: String,
    collection: String,
    api_key: Option<String>,
    embedder: Arc<dyn Provider>,
    embedding_model: String,
    collection_id: OnceCell<String>,
    client: reqwest::Client,
}

impl ChromaRetriever {
    pub fn new(
        base_url: &str,
        tenant: &str,
        database: &str,
        collection: &str,
        embedder: Arc<dyn Provider>,
        embedding_model: &str,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tenant: tenant.to_string(),
            database: database.to_string(),
            collection: collection.to_string(),
            api_key: None,
            embedder,
            embedding_model: embedding_model.to_string(),
            collection_id: OnceCell::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Token sent as `x-chroma-token` (Chroma Cloud).
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.base_url, self.tenant, self.database
        )
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("x-chroma-token", key),
            None => builder,
        }
    }

    async fn collection_id(&self) -> Result<&str, RetrievalError> {
        self.collection_id
            .get_or_try_init(|| async {
                let url = format!("{}/{}", self.collections_url(), self.collection);
                let response = self
                    .authorized(self.client.get(&url))
                    .send()
                    .await
                    .map_err(|e| RetrievalError::SearchFailed(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(RetrievalError::NotConfigured(format!(
                        "Chroma collection '{}' not found (status {})",
                        self.collection,
                        response.status()
                    )));
                }

                let info: CollectionInfo = response
                    .json()
                    .await
                    .map_err(|e| RetrievalError::SearchFailed(e.to_string()))?;
                debug!(collection = %self.collection, id = %info.id, "Resolved Chroma collection");
                Ok(info.id)
            })
            .await
            .map(String::as_str)
    }

    async fn embed(&self, query: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .embedder
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![query.to_string()],
            })
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("empty embedding response".into()))
    }
}

#[async_trait]
impl Retriever for ChromaRetriever {
    fn name(&self) -> &str {
        "chroma"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embed(query).await?;
        let id = self.collection_id().await?;

        let body = serde_json::json!({
            "query_embeddings": [embedding],
            "n_results": k,
            "include": ["documents", "metadatas", "distances"],
        });

        let response = self
            .authorized(self.client.post(format!("{}/{id}/query", self.collections_url())))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::SearchFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::SearchFailed(format!("status {status}: {text}")));
        }

        let result: QueryResult = response
            .json()
            .await
            .map_err(|e| RetrievalError::SearchFailed(format!("Bad query response: {e}")))?;

        Ok(result.into_passages())
    }
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

/// Chroma answers one row per query embedding; we always send exactly one.
#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<serde_json::Value>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

impl QueryResult {
    fn into_passages(self) -> Vec<Passage> {
        let documents = self.documents.into_iter().next().unwrap_or_default();
        let metadatas = self
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();
        let distances = self
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();

        documents
            .into_iter()
            .enumerate()
            .filter_map(|(i, doc)| {
                let text = doc?;
                let source = metadatas
                    .get(i)
                    .and_then(Option::as_ref)
                    .and_then(|m| m.get("source"))
                    .and_then(|s| s.as_str())
                    .map(String::from);
                let distance = distances.get(i).copied().flatten().unwrap_or(0.0);
                Some(Passage {
                    text,
                    source,
                    score: 1.0 / (1.0 + distance),
                })
            })
            .collect()
    }
}
