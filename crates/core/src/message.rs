//! Message domain types.
//!
//! A [`Message`] is one turn-unit in a session's log: a role, a content
//! value, and the instant it was recorded. Generation backends may hand
//! back content as a list of parts; [`MessageContent`] accepts both shapes
//! so the history store can flatten them into a single string on write and
//! repair older multi-part records on read.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator used when flattening multi-part content.
pub const PART_SEPARATOR: &str = "\n";

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions
    Human,
    /// The model's answer (or a tool-calling step)
    Ai,
    /// Tool execution result
    Tool,
    /// Instructions sent to the generator; never persisted
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Ai => "ai",
            Role::Tool => "tool",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of multi-part content.
///
/// Backends emit either bare strings or typed objects such as
/// `{"type": "text", "text": "..."}`. Parts without text are dropped when
/// flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text(String),
    Typed {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl ContentPart {
    fn text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(s) => Some(s),
            ContentPart::Typed { text, .. } => text.as_deref(),
        }
    }
}

/// Message content: a single string, or a list of parts awaiting
/// normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flatten into a single string, joining parts with [`PART_SEPARATOR`].
    pub fn flatten(self) -> String {
        match self {
            MessageContent::Text(s) => s,
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(ContentPart::text)
                .collect::<Vec<_>>()
                .join(PART_SEPARATOR),
        }
    }

    /// Borrowing view of the content as text.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            MessageContent::Text(s) => Cow::Borrowed(s),
            MessageContent::Parts(_) => Cow::Owned(self.clone().flatten()),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, MessageContent::Text(_))
    }

    pub fn is_empty(&self) -> bool {
        self.as_text().is_empty()
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

impl From<&String> for MessageContent {
    fn from(s: &String) -> Self {
        MessageContent::Text(s.clone())
    }
}

impl From<Vec<String>> for MessageContent {
    fn from(parts: Vec<String>) -> Self {
        MessageContent::Parts(parts.into_iter().map(ContentPart::Text).collect())
    }
}

impl From<Vec<&str>> for MessageContent {
    fn from(parts: Vec<&str>) -> Self {
        MessageContent::Parts(
            parts
                .into_iter()
                .map(|p| ContentPart::Text(p.to_string()))
                .collect(),
        )
    }
}

/// A single message in a session log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who produced this message
    pub role: Role,

    /// The content (single string once stored)
    pub content: MessageContent,

    /// Tool calls requested by the model (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Insertion timestamp; the ordering key in persistent storage
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message with the given role and content.
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create a new human (question) message.
    pub fn human(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Human, content)
    }

    /// Create a new AI (answer) message.
    pub fn ai(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Ai, content)
    }

    /// Create a new system instruction message.
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Content as text, flattening parts if necessary.
    pub fn text(&self) -> Cow<'_, str> {
        self.content.as_text()
    }

    /// Return this message with its content flattened to a single string.
    pub fn normalized(mut self) -> Self {
        if !self.content.is_text() {
            let content = std::mem::take(&mut self.content);
            self.content = MessageContent::Text(content.flatten());
        }
        self
    }

    /// Whether the model asked for tools in this message.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an AI message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}
