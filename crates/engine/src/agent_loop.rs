//! The tool-augmented agent loop.
//!
//! Each iteration sends the running conversation plus the tool definitions
//! to the model. A reply without tool calls is the final answer; otherwise
//! every requested tool runs, its output is appended as a tool message, and
//! the loop goes around again. Tool failures become `Error: ...` tool
//! messages the model can react to. The loop gives up after
//! `max_iterations` model calls.
//!
//! The whole turn (question, intermediate tool steps, final answer) is
//! recorded only once the model has produced its final answer.

use std::sync::Arc;

use documentor_config::MAX_AGENT_ITERATIONS;
use documentor_core::history::HistoryStore;
use documentor_core::message::{Message, MessageToolCall};
use documentor_core::provider::Provider;
use documentor_core::tool::{ToolCall, ToolRegistry};
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, info, warn};

use crate::prompt::{self, GenerationSettings};
use crate::response::{
    AGENT_FAILURE_ANSWER, ChatResponse, EMPTY_QUESTION_ANSWER, FragmentStream, TurnError,
};
use crate::session::SessionLocks;

/// Model calls allowed per turn unless configured otherwise.
pub const DEFAULT_MAX_ITERATIONS: u32 = 8;

/// What one agent turn produces, in order.
#[derive(Debug, Clone, PartialEq)]
enum AgentEvent {
    /// Text the model emitted alongside tool calls.
    Step(String),
    /// The final answer.
    Answer(String),
    /// Generation failed or the iteration cap was hit.
    Failed,
}

type EventStream = BoxStream<'static, Result<AgentEvent, TurnError>>;

/// The agent engine. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct AgentEngine {
    history: Arc<dyn HistoryStore>,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    locks: Arc<SessionLocks>,
    settings: GenerationSettings,
    max_iterations: u32,
}

impl AgentEngine {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            history,
            provider,
            tools,
            locks: Arc::new(SessionLocks::new()),
            settings,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the iteration cap, clamped to `1..=MAX_AGENT_ITERATIONS`.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.clamp(1, MAX_AGENT_ITERATIONS);
        self
    }

    /// Share session locks with another engine over the same history.
    pub fn with_locks(mut self, locks: Arc<SessionLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run a full agent turn and return its final answer.
    pub async fn run_agent_query(
        &self,
        question: &str,
        session_id: &str,
    ) -> Result<ChatResponse, TurnError> {
        let mut events = self.turn(question.to_string(), session_id.to_string());
        let mut answer = String::new();
        while let Some(event) = events.next().await {
            match event? {
                AgentEvent::Step(_) => {}
                AgentEvent::Answer(text) => answer = text,
                AgentEvent::Failed => answer = AGENT_FAILURE_ANSWER.to_string(),
            }
        }
        Ok(ChatResponse::answer_only(answer))
    }

    /// Run an agent turn, yielding one fragment per reasoning step.
    ///
    /// Fragments are whole step texts, not tokens. Nothing runs until the
    /// stream is polled.
    pub fn stream_agent_answer(
        &self,
        question: impl Into<String>,
        session_id: impl Into<String>,
    ) -> FragmentStream {
        self.turn(question.into(), session_id.into())
            .map(|event| {
                event.map(|e| match e {
                    AgentEvent::Step(text) | AgentEvent::Answer(text) => text,
                    AgentEvent::Failed => AGENT_FAILURE_ANSWER.to_string(),
                })
            })
            .boxed()
    }

    fn turn(&self, question: String, session_id: String) -> EventStream {
        let engine = self.clone();

        let stream = async_stream::stream! {
            let question = question.trim();
            if question.is_empty() {
                warn!(session_id = %session_id, "Rejected empty question");
                yield Ok(AgentEvent::Answer(EMPTY_QUESTION_ANSWER.to_string()));
                return;
            }

            let _guard = engine.locks.acquire(&session_id).await;

            let history = match engine.history.get(&session_id).await {
                Ok(history) => history,
                Err(e) => {
                    yield Err(TurnError::from(e));
                    return;
                }
            };

            let question = Message::human(question);
            let mut messages = prompt::agent_messages(history, &question);
            let mut pending = vec![question];
            let definitions = engine.tools.definitions();

            for iteration in 1..=engine.max_iterations {
                debug!(session_id = %session_id, iteration, "Agent loop iteration");

                let request = engine.settings.tool_request(messages.clone(), definitions.clone());
                let reply = match engine.provider.complete(request).await {
                    Ok(response) => response.message.normalized(),
                    Err(e) => {
                        warn!(session_id = %session_id, iteration, error = %e, "Agent generation failed");
                        yield Ok(AgentEvent::Failed);
                        return;
                    }
                };

                if !reply.has_tool_calls() {
                    let answer = reply.text().into_owned();
                    pending.push(reply);
                    let recorded = pending.len();
                    yield Ok(AgentEvent::Answer(answer));

                    match engine.history.append_all(&session_id, pending).await {
                        Ok(()) => info!(session_id = %session_id, iteration, recorded, "Agent turn recorded"),
                        Err(e) => {
                            yield Err(TurnError::from(e));
                        }
                    }
                    return;
                }

                let step = reply.text().into_owned();
                let calls = reply.tool_calls.clone();
                messages.push(reply.clone());
                pending.push(reply);
                if !step.is_empty() {
                    yield Ok(AgentEvent::Step(step));
                }

                // No model call follows the last iteration to read tool output
                if iteration == engine.max_iterations {
                    break;
                }

                for call in &calls {
                    let output = engine.dispatch(call).await;
                    let result = Message::tool_result(call.id.as_str(), output);
                    messages.push(result.clone());
                    pending.push(result);
                }
            }

            warn!(session_id = %session_id, max = engine.max_iterations, "Agent iteration cap reached");
            yield Ok(AgentEvent::Failed);
        };

        stream.boxed()
    }

    /// Run one tool call. Failures come back as text for the model.
    async fn dispatch(&self, call: &MessageToolCall) -> String {
        let arguments = if call.arguments.trim().is_empty() {
            Ok(serde_json::Value::Object(Default::default()))
        } else {
            serde_json::from_str::<serde_json::Value>(&call.arguments)
        };
        let arguments = match arguments {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool arguments are not valid JSON");
                return format!("Error: invalid arguments for {}: {e}", call.name);
            }
        };

        let call = ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        };
        match self.tools.execute(&call).await {
            Ok(result) => {
                debug!(tool = %call.name, output_len = result.output.len(), "Tool executed");
                result.output
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                format!("Error: {e}")
            }
        }
    }
}
