//! Gemini embedding provider (`batchEmbedContents`).
//!
//! API reference: https://ai.google.dev/api/embeddings

use crate::embeddings::EmbeddingProvider;
use deepsearch_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// The API rejects batches larger than this.
pub const MAX_BATCH: usize = 100;

/// Native output size of known models.
pub fn model_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-004" => Some(768),
        "gemini-embedding-exp-03-07" => Some(3072),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: Content,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<Values>,
}

#[derive(Debug, Deserialize)]
struct Values {
    values: Vec<f32>,
}

/// Gemini embedding provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl GeminiProvider {
    /// Create a provider. Without explicit `dimensions`, the model's
    /// native size is used; unknown models then need it configured.
    pub fn new(
        endpoint: Option<&str>,
        api_key: String,
        model: &str,
        dimensions: Option<usize>,
        batch_size: usize,
    ) -> AppResult<Self> {
        let dimensions = dimensions
            .or_else(|| model_dimensions(model))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Unknown Gemini model '{}': set embedding.dimensions",
                    model
                ))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: endpoint
                .unwrap_or(DEFAULT_GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: model.to_string(),
            dimensions,
            batch_size: batch_size.clamp(1, MAX_BATCH),
        })
    }

    fn build_request(&self, texts: &[String]) -> BatchRequest {
        BatchRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: format!("models/{}", self.model),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                    output_dimensionality: self.dimensions,
                })
                .collect(),
        }
    }

    async fn embed_chunk(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/models/{}:batchEmbedContents", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(texts))
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Gemini: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let body: BatchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Gemini response: {}", e)))?;

        if body.embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Gemini returned {} embeddings for {} inputs",
                body.embeddings.len(),
                texts.len()
            )));
        }

        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_chunk(chunk).await?);
        }
        Ok(embeddings)
    }
}
