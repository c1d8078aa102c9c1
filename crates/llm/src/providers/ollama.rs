//! Ollama LLM provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use deepsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

/// Sampling options nested under `options` in the Ollama API.
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// Model used when a request leaves it empty
    model: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client against the default local endpoint.
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL, model, None)
    }

    /// Create a new Ollama client with a custom base URL and optional timeout.
    pub fn with_base_url(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: builder.build().unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        OllamaRequest {
            model,
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            options,
            stream: false,
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response,
            model: response.model,
            usage,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to Ollama ({} chars)", request.prompt.len());

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        let converted = self.convert_response(ollama_response);
        tracing::debug!(
            "Received completion from Ollama ({} tokens)",
            converted.usage.total_tokens
        );

        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new("llama3.2");
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.default_model(), "llama3.2");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new("llama3.2");
        let request = LlmRequest::new("Hello", "qwen2.5")
            .with_temperature(0.7)
            .with_max_tokens(100);

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.model, "qwen2.5");
        assert_eq!(ollama_req.prompt, "Hello");
        assert!(!ollama_req.stream);

        let options = ollama_req.options.unwrap();
        assert_eq!(options.temperature, Some(0.7));
        assert_eq!(options.num_predict, Some(100));
    }

    #[test]
    fn test_empty_model_falls_back_to_default() {
        let client = OllamaClient::with_base_url("http://gpu-box:11434/", "llama3.2", Some(30));
        let ollama_req = client.to_ollama_request(&LlmRequest::new("Hi", ""));
        assert_eq!(ollama_req.model, "llama3.2");
        assert!(ollama_req.options.is_none());
        assert_eq!(client.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_usage_from_eval_counts() {
        let client = OllamaClient::new("llama3.2");
        let raw = r#"{"model":"llama3.2","response":"Paris","done":true,"prompt_eval_count":40,"eval_count":2}"#;
        let parsed: OllamaResponse = serde_json::from_str(raw).unwrap();
        let response = client.convert_response(parsed);

        assert_eq!(response.content, "Paris");
        assert_eq!(response.usage.total_tokens, 42);
    }
}
