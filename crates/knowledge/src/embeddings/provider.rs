//! Embedding provider trait and factory.

use super::providers::{
    gemini::GeminiProvider, ollama::OllamaProvider, openai::OpenAiCompatibleProvider,
    openai::Vendor, trigram::TrigramProvider,
};
use deepsearch_core::{AppError, AppResult, EmbeddingConfig};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Embedding calls are token-free from the searcher's point of view.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
///
/// The API key is taken from `api_key`, then from the config's
/// `apiKeyEnv`, then from the vendor's conventional variable.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let provider = config.provider.to_lowercase();
    let resolve_key = |default_env: &str| -> AppResult<String> {
        api_key
            .map(str::to_string)
            .or_else(|| config.resolve_api_key())
            .or_else(|| std::env::var(default_env).ok())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Embedding provider '{}' requires an API key (set {})",
                    config.provider, default_env
                ))
            })
    };

    match provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(config.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(
            config.endpoint.as_deref(),
            &config.model,
            config.dimensions,
        )?)),

        "gemini" => {
            let key = resolve_key("GEMINI_API_KEY")?;
            Ok(Arc::new(GeminiProvider::new(
                config.endpoint.as_deref(),
                key,
                &config.model,
                Some(config.dimensions),
                config.batch_size,
            )?))
        }

        other => match Vendor::parse(other) {
            Some(vendor) => {
                let key = resolve_key(vendor.api_key_env())?;
                Ok(Arc::new(OpenAiCompatibleProvider::new(
                    vendor,
                    config.endpoint.as_deref(),
                    key,
                    &config.model,
                    config.dimensions,
                    config.batch_size,
                )?))
            }
            None => Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: trigram, ollama, openai, siliconflow, ppio, volcengine, glm, gemini",
                config.provider
            ))),
        },
    }
}
