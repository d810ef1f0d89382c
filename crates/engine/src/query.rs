//! Retrieval-grounded question answering.
//!
//! One turn: validate, load history, retrieve context, generate once,
//! then record the question and the answer. Retrieval and generation
//! failures end the turn with a fallback answer and record nothing.

use std::sync::Arc;

use documentor_core::history::HistoryStore;
use documentor_core::message::Message;
use documentor_core::provider::Provider;
use documentor_core::retriever::{Passage, Retriever};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::prompt::{self, GenerationSettings};
use crate::response::{
    ChatResponse, EMPTY_QUESTION_ANSWER, FragmentStream, QA_FAILURE_ANSWER, TurnError,
};
use crate::session::SessionLocks;

/// Passages requested per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// The question-answering engine. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct QueryEngine {
    history: Arc<dyn HistoryStore>,
    retriever: Arc<dyn Retriever>,
    provider: Arc<dyn Provider>,
    locks: Arc<SessionLocks>,
    settings: GenerationSettings,
    top_k: usize,
}

/// What happened before generation, when a turn cannot go further.
enum Prepared {
    Ready {
        passages: Vec<Passage>,
        messages: Vec<Message>,
    },
    Fallback,
}

impl QueryEngine {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        retriever: Arc<dyn Retriever>,
        provider: Arc<dyn Provider>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            history,
            retriever,
            provider,
            locks: Arc::new(SessionLocks::new()),
            settings,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Share session locks with another engine over the same history.
    pub fn with_locks(mut self, locks: Arc<SessionLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Empty a session, after any turn already running on it has recorded.
    pub async fn clear_session(&self, session_id: &str) -> Result<usize, TurnError> {
        Ok(self.locks.clear(self.history.as_ref(), session_id).await?)
    }

    async fn prepare(&self, question: &str, session_id: &str) -> Result<Prepared, TurnError> {
        let history = self.history.get(session_id).await?;

        let passages = match self.retriever.search(question, self.top_k).await {
            Ok(passages) => passages,
            Err(e) => {
                warn!(session_id, retriever = self.retriever.name(), error = %e, "Retrieval failed");
                return Ok(Prepared::Fallback);
            }
        };
        debug!(session_id, passages = passages.len(), prior = history.len(), "Context retrieved");

        let messages = prompt::qa_messages(&passages, history, question);
        Ok(Prepared::Ready { passages, messages })
    }

    /// Answer `question` in `session_id` as one whole response.
    pub async fn answer(&self, question: &str, session_id: &str) -> Result<ChatResponse, TurnError> {
        let question = question.trim();
        if question.is_empty() {
            warn!(session_id, "Rejected empty question");
            return Ok(ChatResponse::answer_only(EMPTY_QUESTION_ANSWER));
        }

        let _guard = self.locks.acquire(session_id).await;

        let (passages, messages) = match self.prepare(question, session_id).await? {
            Prepared::Ready { passages, messages } => (passages, messages),
            Prepared::Fallback => return Ok(ChatResponse::answer_only(QA_FAILURE_ANSWER)),
        };

        let response = match self.provider.complete(self.settings.request(messages)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(session_id, provider = self.provider.name(), error = %e, "Generation failed");
                return Ok(ChatResponse::answer_only(QA_FAILURE_ANSWER));
            }
        };

        let answer = response.message.normalized().text().into_owned();
        self.history
            .append_all(session_id, vec![Message::human(question), Message::ai(answer.as_str())])
            .await?;

        info!(session_id, answer_len = answer.len(), "Query answered");
        Ok(ChatResponse::with_passages(answer, &passages))
    }

    /// Answer `question` as fragments in generation order.
    ///
    /// Nothing runs until the stream is polled. The exchange is recorded
    /// after the last fragment, and only if generation finished. A failure
    /// before any output yields the fallback answer as the only fragment;
    /// a failure after partial output just ends the stream.
    pub fn stream_answer(
        &self,
        question: impl Into<String>,
        session_id: impl Into<String>,
    ) -> FragmentStream {
        let engine = self.clone();
        let question = question.into();
        let session_id = session_id.into();

        let stream = async_stream::stream! {
            let question = question.trim();
            if question.is_empty() {
                yield Ok(EMPTY_QUESTION_ANSWER.to_string());
                return;
            }

            let _guard = engine.locks.acquire(&session_id).await;

            let messages = match engine.prepare(question, &session_id).await {
                Ok(Prepared::Ready { messages, .. }) => messages,
                Ok(Prepared::Fallback) => {
                    yield Ok(QA_FAILURE_ANSWER.to_string());
                    return;
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut request = engine.settings.request(messages);
            request.stream = true;
            let mut chunks = match engine.provider.stream(request).await {
                Ok(rx) => rx,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Generation stream failed to start");
                    yield Ok(QA_FAILURE_ANSWER.to_string());
                    return;
                }
            };

            let mut answer = String::new();
            let mut fragments = 0usize;
            let mut completed = false;
            while let Some(next) = chunks.recv().await {
                match next {
                    Ok(chunk) => {
                        if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
                            answer.push_str(&text);
                            fragments += 1;
                            yield Ok(text);
                        }
                        if chunk.done {
                            completed = true;
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, chunks = fragments, error = %e, "Generation stream broke");
                        break;
                    }
                }
            }

            // A channel that closes without a final chunk is a broken reply too
            if !completed {
                if fragments == 0 {
                    yield Ok(QA_FAILURE_ANSWER.to_string());
                } else {
                    debug!(session_id = %session_id, chunks = fragments, "Partial answer not recorded");
                }
                return;
            }

            let recorded = engine
                .history
                .append_all(&session_id, vec![Message::human(question), Message::ai(answer.as_str())])
                .await;
            match recorded {
                Ok(()) => info!(session_id = %session_id, chunks = fragments, answer_len = answer.len(), "Streamed answer recorded"),
                Err(e) => {
                    yield Err(TurnError::from(e));
                }
            }
        };

        stream.boxed()
    }
}
