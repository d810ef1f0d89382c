//! # Documentor Core
//!
//! Domain types, traits, and error definitions for the Documentor
//! conversation engine. This crate has **no framework dependencies**: it
//! defines the domain model that every other crate implements against.
//!
//! ## Seams
//!
//! Every collaborator is a trait here, with implementations in their own
//! crates:
//! - [`HistoryStore`]: per-session ordered message log (`documentor-history`)
//! - [`Provider`]: the generation gateway (`documentor-providers`)
//! - [`Retriever`]: the retrieval gateway (`documentor-retrieval`)
//! - [`Tool`]: named capabilities for the agent loop (`documentor-tools`)
//!
//! Constructed collaborators are passed into the engines explicitly, so
//! everything can be exercised with fakes.

pub mod error;
pub mod history;
pub mod message;
pub mod provider;
pub mod retriever;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{HistoryError, ProviderError, RetrievalError, ToolError};
pub use history::{HistoryStore, SessionId, DEFAULT_SESSION_ID};
pub use message::{ContentPart, Message, MessageContent, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition};
pub use retriever::{Passage, Retriever};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
