//! Provider router: builds and selects the generation gateway from config.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use documentor_config::AppConfig;
use documentor_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Named providers plus the one used by default.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// The provider named in `generation.provider`.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Build the router for `config.generation`.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let generation = &config.generation;
    let mut router = ProviderRouter::new(&generation.provider);

    let base_url = generation
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&generation.provider));
    let api_key = generation.api_key.clone().unwrap_or_default();

    let provider = OpenAiCompatProvider::with_timeout(
        &generation.provider,
        base_url,
        api_key,
        Duration::from_secs(generation.timeout_secs),
    );
    router.register(generation.provider.clone(), Arc::new(provider));
    router
}

/// Base URL for well-known OpenAI-compatible services.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "gemini" | "google" => "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}
