//! Generation gateway implementations for Documentor.
//!
//! All providers implement `documentor_core::Provider`. The router builds
//! the configured one.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
