//! Endpoint suggester: picks the single best endpoint for a question.

use async_trait::async_trait;
use documentor_core::error::ToolError;
use documentor_core::retriever::Retriever;
use documentor_core::tool::{Tool, ToolResult};
use std::sync::Arc;

use crate::generator::Generator;

const SYSTEM_PROMPT: &str = "You are an API expert. Given a developer question and list of endpoints, \
return the single most relevant endpoint path. If none match, return 'NONE'.";

const DEFAULT_TOP_K: u64 = 5;

pub struct EndpointSuggesterTool {
    generator: Generator,
    retriever: Arc<dyn Retriever>,
}

impl EndpointSuggesterTool {
    pub fn new(generator: Generator, retriever: Arc<dyn Retriever>) -> Self {
        Self {
            generator,
            retriever,
        }
    }
}

#[async_trait]
impl Tool for EndpointSuggesterTool {
    fn name(&self) -> &str {
        "endpoint_suggester"
    }

    fn description(&self) -> &str {
        "Suggest the best API endpoint for the given developer question."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "top_k": { "type": "integer", "default": DEFAULT_TOP_K }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let question = arguments["question"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'question' argument".into()))?;
        let top_k = arguments["top_k"].as_u64().unwrap_or(DEFAULT_TOP_K).clamp(1, 20) as usize;

        let passages = self
            .retriever
            .search(question, top_k)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        // A passage's source names the endpoint when the corpus records one
        let endpoints: Vec<String> = passages
            .into_iter()
            .map(|p| p.source.unwrap_or(p.text))
            .collect();

        let human = format!(
            "Question: {question}\nEndpoints:\n{}\nAnswer:",
            endpoints.join("\n")
        );
        let answer = self
            .generator
            .ask(self.name(), SYSTEM_PROMPT.to_string(), human)
            .await?;
        Ok(ToolResult::ok(answer.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EchoProvider, StaticRetriever};
    use documentor_core::retriever::Passage;

    #[tokio::test]
    async fn lists_sources_or_text_as_candidates() {
        let provider = Arc::new(EchoProvider::replying("  /users/{id}\n"));
        let retriever = Arc::new(StaticRetriever::with(vec![
            Passage::new("Fetch a user").with_source("/users/{id}"),
            Passage::new("POST /orders"),
        ]));
        let tool = EndpointSuggesterTool::new(Generator::new(provider.clone(), "m"), retriever);

        let result = tool
            .execute(serde_json::json!({"question": "How do I get one user?"}))
            .await
            .unwrap();

        assert_eq!(result.output, "/users/{id}");
        let prompt = provider.last_prompt();
        assert!(prompt.contains("Endpoints:\n/users/{id}\nPOST /orders\nAnswer:"));
        assert!(prompt.contains("If none match, return 'NONE'"));
    }

    #[tokio::test]
    async fn missing_question_is_invalid() {
        let tool = EndpointSuggesterTool::new(
            Generator::new(Arc::new(EchoProvider::default()), "m"),
            Arc::new(StaticRetriever::empty()),
        );
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
