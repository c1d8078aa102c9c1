//! LLM provider factory.
//!
//! Builds an LLM client from a provider name plus the resolved endpoint,
//! API key and default model.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_URL};
use crate::types::ProviderType;
use deepsearch_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai" or an OpenAI-compatible alias)
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by OpenAI-compatible providers
/// * `model` - Model used when a request leaves it empty
///
/// # Errors
/// Returns `AppError::Config` when the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    model: &str,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_base_url(base_url, model, None)))
        }
        ProviderType::OpenAI => {
            let key = api_key.ok_or_else(|| {
                AppError::Config(format!("{} provider requires API key", provider))
            })?;
            let base_url = endpoint.unwrap_or(DEFAULT_OPENAI_URL);
            Ok(Arc::new(OpenAiClient::new(base_url, key, model)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, "llama3.2").unwrap();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.default_model(), "llama3.2");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None, "qwen2.5");
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_openai_client() {
        let client = create_client("openai", None, Some("sk-test"), "gpt-4o-mini").unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None, "gpt-4o-mini") {
            Err(AppError::Config(msg)) => assert!(msg.contains("requires API key")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None, "m") {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
