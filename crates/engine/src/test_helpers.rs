//! Scripted collaborators shared by engine tests.

use async_trait::async_trait;
use documentor_core::error::{HistoryError, ProviderError, RetrievalError, ToolError};
use documentor_core::history::{HistoryStore, MessageLog};
use documentor_core::message::{Message, MessageToolCall};
use documentor_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk,
};
use documentor_core::retriever::{Passage, Retriever};
use documentor_core::tool::{Tool, ToolResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replies with scripted messages in order, whole or streamed word by word.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<Message, ProviderError>>>,
    stream_fail_after: Option<usize>,
    stream_truncated: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<Message, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            stream_fail_after: None,
            stream_truncated: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Plain text answers, one per call.
    pub fn answers(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(Message::ai(*t))).collect())
    }

    pub fn failing() -> Self {
        Self::new(vec![Err(ProviderError::Network("connection refused".into()))])
    }

    /// Streams break with an error after `n` fragments.
    pub fn failing_stream_after(mut self, n: usize) -> Self {
        self.stream_fail_after = Some(n);
        self
    }

    /// Streams close after the last fragment without a final chunk.
    pub fn truncated_stream(mut self) -> Self {
        self.stream_truncated = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    fn next(&self, request: ProviderRequest) -> Result<Message, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::NotConfigured("script exhausted".into())))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        Ok(ProviderResponse {
            message: self.next(request)?,
            usage: None,
            model,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let message = self.next(request)?;
        let text = message.text().into_owned();
        let pieces: Vec<String> = text.split_inclusive(' ').map(String::from).collect();

        let (tx, rx) = tokio::sync::mpsc::channel(pieces.len() + 2);
        for (i, piece) in pieces.into_iter().enumerate() {
            if self.stream_fail_after == Some(i) {
                let _ = tx.try_send(Err(ProviderError::StreamInterrupted("reset".into())));
                return Ok(rx);
            }
            let _ = tx.try_send(Ok(StreamChunk {
                content: Some(piece),
                ..StreamChunk::default()
            }));
        }
        if self.stream_fail_after.is_some() {
            let _ = tx.try_send(Err(ProviderError::StreamInterrupted("reset".into())));
            return Ok(rx);
        }
        if self.stream_truncated {
            return Ok(rx);
        }
        let _ = tx.try_send(Ok(StreamChunk {
            done: true,
            tool_calls: message.tool_calls,
            ..StreamChunk::default()
        }));
        Ok(rx)
    }
}

/// Holds every whole-answer call until the test releases it.
pub struct GatedProvider {
    inner: ScriptedProvider,
    started: tokio::sync::Notify,
    gate: tokio::sync::Semaphore,
}

impl GatedProvider {
    pub fn new(inner: ScriptedProvider) -> Self {
        Self {
            inner,
            started: tokio::sync::Notify::new(),
            gate: tokio::sync::Semaphore::new(0),
        }
    }

    /// Resolves once a call is waiting at the gate.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Let one call through.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl Provider for GatedProvider {
    fn name(&self) -> &str {
        "gated"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.started.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        permit.forget();
        self.inner.complete(request).await
    }
}

/// An AI message asking for tools.
pub fn tool_call_message(content: &str, calls: &[(&str, &str, serde_json::Value)]) -> Message {
    let mut message = Message::ai(content);
    message.tool_calls = calls
        .iter()
        .map(|(id, name, args)| MessageToolCall {
            id: (*id).into(),
            name: (*name).into(),
            arguments: args.to_string(),
        })
        .collect();
    message
}

/// Returns the same passages for every query, or always fails.
pub struct StaticRetriever {
    passages: Option<Vec<Passage>>,
    searches: AtomicUsize,
}

impl StaticRetriever {
    pub fn with(texts: &[&str]) -> Self {
        Self {
            passages: Some(texts.iter().map(|t| Passage::new(*t)).collect()),
            searches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            passages: None,
            searches: AtomicUsize::new(0),
        }
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, _query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        match &self.passages {
            Some(p) => Ok(p.iter().take(k).cloned().collect()),
            None => Err(RetrievalError::SearchFailed("index offline".into())),
        }
    }
}

/// Reads work; every append fails.
#[derive(Default)]
pub struct ReadOnlyHistory;

#[async_trait]
impl HistoryStore for ReadOnlyHistory {
    fn name(&self) -> &str {
        "read-only"
    }

    async fn get(&self, _session_id: &str) -> Result<MessageLog, HistoryError> {
        Ok(Vec::new())
    }

    async fn append(&self, _session_id: &str, _message: Message) -> Result<(), HistoryError> {
        Err(HistoryError::Storage("disk full".into()))
    }

    async fn clear(&self, _session_id: &str) -> Result<(), HistoryError> {
        Ok(())
    }
}

/// Returns a fixed text for any arguments.
pub struct FixedTool {
    pub name: &'static str,
    pub output: &'static str,
}

#[async_trait]
impl Tool for FixedTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Returns a fixed text"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::ok(self.output))
    }
}

pub struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "broken".into(),
            reason: "upstream 503".into(),
        })
    }
}

/// Counts how often it runs.
#[derive(Default)]
pub struct CountingTool {
    pub runs: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        "counting"
    }

    fn description(&self) -> &str {
        "Counts its calls"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(ToolResult::ok("counted"))
    }
}
