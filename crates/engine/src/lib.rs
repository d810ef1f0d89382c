//! Conversation engines for Documentor.
//!
//! Two ways to answer a question within a session:
//!
//! 1. [`QueryEngine`]: retrieve passages, generate once, record the exchange
//! 2. [`AgentEngine`]: let the model call tools in a bounded loop, then
//!    record the whole turn
//!
//! Both offer a whole-answer call and a lazy fragment stream. Collaborators
//! (history store, retriever, provider, tools) are passed in as trait
//! objects. Turns on the same session id are serialized by [`SessionLocks`].

pub mod agent_loop;
pub mod prompt;
pub mod query;
pub mod response;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use agent_loop::{AgentEngine, DEFAULT_MAX_ITERATIONS};
pub use prompt::GenerationSettings;
pub use query::{DEFAULT_TOP_K, QueryEngine};
pub use response::{
    AGENT_FAILURE_ANSWER, ChatResponse, EMPTY_QUESTION_ANSWER, FragmentStream, QA_FAILURE_ANSWER,
    TurnError,
};
pub use session::{SessionGuard, SessionLocks};
