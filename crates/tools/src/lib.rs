//! Built-in tools for the Documentor agent loop.
//!
//! Every tool takes a JSON object and returns text. Tools that need the
//! model share one [`Generator`]; tools that need documents share the
//! retriever.

pub mod code_snippet;
pub mod endpoint_suggester;
pub mod generator;
pub mod knowledge_search;
pub mod postman_generator;

#[cfg(test)]
pub(crate) mod test_support;

pub use code_snippet::CodeSnippetTool;
pub use endpoint_suggester::EndpointSuggesterTool;
pub use generator::Generator;
pub use knowledge_search::KnowledgeSearchTool;
pub use postman_generator::PostmanGeneratorTool;

use std::sync::Arc;

use documentor_core::{Provider, Retriever, ToolRegistry};

/// Names of every built-in tool.
pub const BUILTIN_TOOLS: [&str; 4] = [
    "code_snippet",
    "endpoint_suggester",
    "knowledge_search",
    "postman_generator",
];

/// Registry with all four built-in tools.
pub fn default_registry(
    provider: Arc<dyn Provider>,
    retriever: Arc<dyn Retriever>,
    model: &str,
) -> ToolRegistry {
    let generator = Generator::new(provider, model);
    ToolRegistry::new()
        .with_tool(Box::new(CodeSnippetTool::new(generator.clone())))
        .with_tool(Box::new(EndpointSuggesterTool::new(
            generator.clone(),
            retriever.clone(),
        )))
        .with_tool(Box::new(PostmanGeneratorTool::new(generator)))
        .with_tool(Box::new(KnowledgeSearchTool::new(retriever)))
}

/// Registry limited to `enabled` names; an empty list keeps every tool.
pub fn registry_with(
    provider: Arc<dyn Provider>,
    retriever: Arc<dyn Retriever>,
    model: &str,
    enabled: &[String],
) -> ToolRegistry {
    if enabled.is_empty() {
        return default_registry(provider, retriever, model);
    }

    let generator = Generator::new(provider, model);
    let mut registry = ToolRegistry::new();
    for name in enabled {
        match name.as_str() {
            "code_snippet" => registry.register(Box::new(CodeSnippetTool::new(generator.clone()))),
            "endpoint_suggester" => registry.register(Box::new(EndpointSuggesterTool::new(
                generator.clone(),
                retriever.clone(),
            ))),
            "postman_generator" => {
                registry.register(Box::new(PostmanGeneratorTool::new(generator.clone())))
            }
            "knowledge_search" => {
                registry.register(Box::new(KnowledgeSearchTool::new(retriever.clone())))
            }
            other => tracing::warn!(tool = other, "Unknown tool in agent.tools, skipping"),
        }
    }
    registry
}
