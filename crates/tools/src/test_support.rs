//! Fakes shared by tool tests.

use async_trait::async_trait;
use documentor_core::error::{ProviderError, RetrievalError};
use documentor_core::message::Message;
use documentor_core::provider::{Provider, ProviderRequest, ProviderResponse};
use documentor_core::retriever::{Passage, Retriever};
use std::sync::Mutex;

/// Replies with a fixed answer (or echoes the human prompt) and records requests.
#[derive(Default)]
pub struct EchoProvider {
    pub reply: Option<String>,
    pub requests: Mutex<Vec<ProviderRequest>>,
}

impl EchoProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let last = requests.last().unwrap();
        last.messages
            .iter()
            .map(|m| m.text().into_owned())
            .collect::<Vec<_>>()
            .join("\n---\n")
    }
}

#[async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let human = request
            .messages
            .last()
            .map(|m| m.text().into_owned())
            .unwrap_or_default();
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        Ok(ProviderResponse {
            message: Message::ai(self.reply.clone().unwrap_or(human)),
            usage: None,
            model,
        })
    }
}

pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

pub struct StaticRetriever {
    passages: Vec<Passage>,
}

impl StaticRetriever {
    pub fn empty() -> Self {
        Self { passages: Vec::new() }
    }

    pub fn with(passages: Vec<Passage>) -> Self {
        Self { passages }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, _query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        Ok(self.passages.iter().take(k).cloned().collect())
    }
}
