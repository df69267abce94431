//! Provider router: selects the LLM backend named in config.
//!
//! Handles provider creation and lookup by name.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chatrelay_config::AppConfig;
use chatrelay_core::error::ProviderError;
use chatrelay_core::provider::Provider;
use tracing::info;

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The default provider, or `NotConfigured` if none was registered.
    pub fn require_default(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        self.default()
            .ok_or_else(|| ProviderError::NotConfigured(self.default_provider.clone()))
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Build the configured provider.
///
/// Hosted backends need an API key; local servers (ollama, vllm,
/// llama.cpp) don't.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ProviderError> {
    let name = config.default_provider.as_str();
    let timeout = Duration::from_secs(config.provider.timeout_secs);

    let api_key = match (&config.api_key, is_local(name)) {
        (Some(key), _) => key.clone(),
        (None, true) => String::new(),
        (None, false) => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{name}' (set api_key or CHATRELAY_API_KEY)"
            )));
        }
    };

    let base_url = config
        .provider
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(name));

    let provider: Arc<dyn Provider> = if name == "anthropic" {
        // Native Messages API rather than an OpenAI-compatible proxy
        let mut p = AnthropicProvider::with_timeout(&api_key, timeout)?;
        if config.provider.api_url.is_some() {
            p = p.with_base_url(&base_url);
        }
        Arc::new(p)
    } else {
        Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key, timeout)?)
    };

    info!(provider = name, base_url = %base_url, "Model backend configured");

    let mut router = ProviderRouter::new(name);
    router.register(name, provider);
    Ok(router)
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "gemini" | "google" => "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "anthropic" => "https://api.anthropic.com".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
