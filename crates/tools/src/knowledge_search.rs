//! Knowledge search: raw passages from the documentation corpus.

use async_trait::async_trait;
use documentor_core::error::ToolError;
use documentor_core::retriever::{Passage, Retriever};
use documentor_core::tool::{Tool, ToolResult};
use std::sync::Arc;

const DEFAULT_TOP_K: u64 = 5;

pub struct KnowledgeSearchTool {
    retriever: Arc<dyn Retriever>,
}

impl KnowledgeSearchTool {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

fn render(passages: &[Passage]) -> String {
    if passages.is_empty() {
        return "No relevant passages found.".into();
    }
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| match &p.source {
            Some(source) => format!("[{}] ({source})\n{}", i + 1, p.text),
            None => format!("[{}]\n{}", i + 1, p.text),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn name(&self) -> &str {
        "knowledge_search"
    }

    fn description(&self) -> &str {
        "Search the uploaded API documentation. Returns the most relevant passages with their sources."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to look for" },
                "top_k": { "type": "integer", "default": DEFAULT_TOP_K }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let top_k = arguments["top_k"].as_u64().unwrap_or(DEFAULT_TOP_K).clamp(1, 20) as usize;

        let passages = self
            .retriever
            .search(query, top_k)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        Ok(ToolResult::ok(render(&passages)))
    }
}
