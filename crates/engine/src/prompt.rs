//! Generation request assembly.

use documentor_config::GenerationConfig;
use documentor_core::message::Message;
use documentor_core::provider::{ProviderRequest, ToolDefinition};
use documentor_core::retriever::Passage;

/// Instruction for retrieval-grounded answers; the context block follows it.
pub const QA_INSTRUCTION: &str =
    "You are an API documentation assistant. Use the provided context to answer the question.";

/// Instruction for the tool-using agent.
pub const AGENT_INSTRUCTION: &str = "You are an API documentation assistant. \
Use the available tools to look things up in the uploaded documentation, \
generate code snippets or Postman collections, then answer the developer's question.";

/// Model and sampling settings shared by every request an engine makes.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl GenerationSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub(crate) fn request(&self, messages: Vec<Message>) -> ProviderRequest {
        let mut request = ProviderRequest::new(self.model.clone(), messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }

    pub(crate) fn tool_request(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> ProviderRequest {
        let mut request = self.request(messages);
        request.tools = tools;
        request
    }
}

/// Passage texts joined into one context block.
pub fn format_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Instruction with context, then prior turns, then the new question.
pub fn qa_messages(passages: &[Passage], history: Vec<Message>, question: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(format!(
        "{QA_INSTRUCTION}\n\n{}",
        format_context(passages)
    )));
    messages.extend(history);
    messages.push(Message::human(question));
    messages
}

/// Agent instruction, prior turns (tool steps included), then the question.
pub fn agent_messages(history: Vec<Message>, question: &Message) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(AGENT_INSTRUCTION));
    messages.extend(history);
    messages.push(question.clone());
    messages
}
