//! Code snippet tool: a minimal runnable call for one endpoint.
//!
//! Identical requests are served from a small LRU cache so repeated agent
//! steps do not pay for another generation.

use async_trait::async_trait;
use documentor_core::error::ToolError;
use documentor_core::tool::{Tool, ToolResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::debug;

use crate::generator::Generator;

const SYSTEM_PROMPT: &str = "You are an assistant that writes minimal, runnable API code snippets \
from the docs uploaded by the user. Return ONLY the code block (no explanation).";

const CACHE_CAPACITY: usize = 128;
const METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SnippetKey {
    endpoint: String,
    method: String,
    language: String,
    params: Option<String>,
    client_lib: String,
}

/// Least-recently-used map with a fixed capacity.
struct SnippetCache {
    entries: HashMap<SnippetKey, String>,
    order: VecDeque<SnippetKey>,
    capacity: usize,
}

impl SnippetCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&mut self, key: &SnippetKey) -> Option<String> {
        let hit = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(hit)
    }

    fn put(&mut self, key: SnippetKey, value: String) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }

    fn touch(&mut self, key: &SnippetKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct CodeSnippetTool {
    generator: Generator,
    cache: Mutex<SnippetCache>,
}

impl CodeSnippetTool {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            cache: Mutex::new(SnippetCache::new(CACHE_CAPACITY)),
        }
    }

    fn cached(&self, key: &SnippetKey) -> Option<String> {
        self.cache.lock().ok()?.get(key)
    }

    fn remember(&self, key: SnippetKey, snippet: String) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, snippet);
        }
    }
}

fn parse_key(arguments: &serde_json::Value) -> Result<SnippetKey, ToolError> {
    let endpoint = arguments["endpoint"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'endpoint' argument".into()))?;

    let method = arguments["method"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'method' argument".into()))?
        .to_ascii_uppercase();
    if !METHODS.contains(&method.as_str()) {
        return Err(ToolError::InvalidArguments(format!(
            "Unsupported method '{method}'"
        )));
    }

    Ok(SnippetKey {
        endpoint: endpoint.to_string(),
        method,
        language: arguments["language"].as_str().unwrap_or("python").to_string(),
        params: arguments["params"].as_str().map(String::from),
        client_lib: arguments["client_lib"]
            .as_str()
            .unwrap_or("requests")
            .to_string(),
    })
}

#[async_trait]
impl Tool for CodeSnippetTool {
    fn name(&self) -> &str {
        "code_snippet"
    }

    fn description(&self) -> &str {
        "Generate a language-specific code snippet for an API call."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "endpoint": {
                    "type": "string",
                    "description": "The REST path, e.g. /users/{id}"
                },
                "method": {
                    "type": "string",
                    "enum": METHODS,
                    "description": "HTTP verb"
                },
                "language": {
                    "type": "string",
                    "enum": ["python", "javascript"],
                    "default": "python"
                },
                "params": {
                    "type": "string",
                    "description": "Optional query/body parameters description"
                },
                "client_lib": {
                    "type": "string",
                    "description": "Preferred client library",
                    "default": "requests"
                }
            },
            "required": ["endpoint", "method"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let key = parse_key(&arguments)?;

        if let Some(snippet) = self.cached(&key) {
            debug!(endpoint = %key.endpoint, "Snippet cache hit");
            return Ok(ToolResult::ok(snippet));
        }

        let human = format!(
            "Generate a {} example using {} to call:\n  {} {}\nParameters (if any): {}",
            key.language,
            key.client_lib,
            key.method,
            key.endpoint,
            key.params.as_deref().unwrap_or("None"),
        );
        let snippet = self
            .generator
            .ask(self.name(), SYSTEM_PROMPT.to_string(), human)
            .await?;

        self.remember(key, snippet.clone());
        Ok(ToolResult::ok(snippet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EchoProvider, FailingProvider};
    use std::sync::Arc;

    fn key(endpoint: &str) -> SnippetKey {
        SnippetKey {
            endpoint: endpoint.into(),
            method: "GET".into(),
            language: "python".into(),
            params: None,
            client_lib: "requests".into(),
        }
    }

    #[tokio::test]
    async fn builds_prompt_with_defaults() {
        let provider = Arc::new(EchoProvider::replying("requests.get(url)"));
        let tool = CodeSnippetTool::new(Generator::new(provider.clone(), "m"));

        let result = tool
            .execute(serde_json::json!({"endpoint": "/users", "method": "get"}))
            .await
            .unwrap();

        assert_eq!(result.output, "requests.get(url)");
        let prompt = provider.last_prompt();
        assert!(prompt.contains("Generate a python example using requests to call:\n  GET /users"));
        assert!(prompt.contains("Parameters (if any): None"));
    }

    #[tokio::test]
    async fn identical_requests_hit_cache() {
        let provider = Arc::new(EchoProvider::replying("fetch('/users')"));
        let tool = CodeSnippetTool::new(Generator::new(provider.clone(), "m"));
        let args = serde_json::json!({"endpoint": "/users", "method": "GET", "language": "javascript"});

        tool.execute(args.clone()).await.unwrap();
        tool.execute(args).await.unwrap();
        assert_eq!(provider.calls(), 1);

        tool.execute(serde_json::json!({"endpoint": "/orders", "method": "GET"}))
            .await
            .unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn rejects_unknown_method() {
        let tool = CodeSnippetTool::new(Generator::new(Arc::new(EchoProvider::default()), "m"));
        let err = tool
            .execute(serde_json::json!({"endpoint": "/x", "method": "TRACE"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn generation_failure_is_not_cached() {
        let tool = CodeSnippetTool::new(Generator::new(Arc::new(FailingProvider), "m"));
        let args = serde_json::json!({"endpoint": "/x", "method": "GET"});
        assert!(tool.execute(args).await.is_err());
        assert_eq!(tool.cache.lock().unwrap().len(), 0);
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let mut cache = SnippetCache::new(2);
        cache.put(key("/a"), "a".into());
        cache.put(key("/b"), "b".into());
        assert!(cache.get(&key("/a")).is_some());
        cache.put(key("/c"), "c".into());

        assert!(cache.get(&key("/b")).is_none());
        assert!(cache.get(&key("/a")).is_some());
        assert!(cache.get(&key("/c")).is_some());
        assert_eq!(cache.len(), 2);
    }
}
