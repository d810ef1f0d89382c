//! Shared access to the generation gateway for tools.

use std::sync::Arc;

use documentor_core::error::ToolError;
use documentor_core::message::Message;
use documentor_core::provider::{Provider, ProviderRequest};

/// A provider and model pair; cheap to clone.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Generator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// One deterministic system + human exchange, returning the answer text.
    pub async fn ask(&self, tool_name: &str, system: String, human: String) -> Result<String, ToolError> {
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(system), Message::human(human)],
        );
        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(response.message.text().into_owned())
    }
}
