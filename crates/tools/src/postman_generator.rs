//! Postman collection generator.

use async_trait::async_trait;
use documentor_core::error::ToolError;
use documentor_core::tool::{Tool, ToolResult};
use tracing::warn;

use crate::generator::Generator;

/// Returned when the model's output is not valid JSON.
pub const INVALID_JSON_OUTPUT: &str = r#"{"error": "Invalid JSON returned"}"#;

pub struct PostmanGeneratorTool {
    generator: Generator,
}

impl PostmanGeneratorTool {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for PostmanGeneratorTool {
    fn name(&self) -> &str {
        "postman_generator"
    }

    fn description(&self) -> &str {
        "Generate a Postman collection JSON for the provided endpoints."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Collection name" },
                "endpoints": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Endpoints to include, e.g. 'GET /users'"
                }
            },
            "required": ["name", "endpoints"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let name = arguments["name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'name' argument".into()))?;
        let endpoints: Vec<&str> = arguments["endpoints"]
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("'endpoints' must be an array".into()))?
            .iter()
            .filter_map(|e| e.as_str())
            .collect();

        let system = format!(
            "You are an assistant that creates minimal Postman v2.1 collections in JSON. \
             Return ONLY valid JSON. Include variables for baseUrl. Collection name: {name}."
        );
        let human = format!(
            "Generate a Postman collection containing the following endpoints:\n{}\n\
             Use {{baseUrl}} variable. Ensure output is raw JSON for Postman v2.1.",
            endpoints.join("\n")
        );

        let raw = self.generator.ask(self.name(), system, human).await?;
        if serde_json::from_str::<serde_json::Value>(&raw).is_ok() {
            Ok(ToolResult::ok(raw))
        } else {
            warn!(collection = name, "Model returned invalid Postman JSON");
            Ok(ToolResult::ok(INVALID_JSON_OUTPUT))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::EchoProvider;
    use std::sync::Arc;

    fn tool(reply: &str) -> (PostmanGeneratorTool, Arc<EchoProvider>) {
        let provider = Arc::new(EchoProvider::replying(reply));
        (
            PostmanGeneratorTool::new(Generator::new(provider.clone(), "m")),
            provider,
        )
    }

    #[tokio::test]
    async fn valid_json_passes_through() {
        let (tool, provider) = tool(r#"{"info": {"name": "Users"}, "item": []}"#);
        let result = tool
            .execute(serde_json::json!({"name": "Users", "endpoints": ["GET /users", "POST /users"]}))
            .await
            .unwrap();

        assert!(result.output.contains("\"Users\""));
        let prompt = provider.last_prompt();
        assert!(prompt.contains("Collection name: Users."));
        assert!(prompt.contains("GET /users\nPOST /users"));
        assert!(prompt.contains("Use {baseUrl} variable."));
    }

    #[tokio::test]
    async fn invalid_json_is_replaced() {
        let (tool, _) = tool("```json\nnot json\n```");
        let result = tool
            .execute(serde_json::json!({"name": "X", "endpoints": []}))
            .await
            .unwrap();
        assert_eq!(result.output, INVALID_JSON_OUTPUT);
    }

    #[tokio::test]
    async fn endpoints_must_be_array() {
        let (tool, _) = tool("{}");
        let err = tool
            .execute(serde_json::json!({"name": "X", "endpoints": "GET /users"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
