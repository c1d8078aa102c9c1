//! OpenAI-compatible `/embeddings` provider.
//!
//! OpenAI, SiliconFlow, PPIO, Volcengine and GLM all expose the same wire
//! format and differ only in base URL and key variable.

use crate::embeddings::EmbeddingProvider;
use deepsearch_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// A vendor speaking the OpenAI embeddings protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    OpenAI,
    SiliconFlow,
    Ppio,
    Volcengine,
    Glm,
}

impl Vendor {
    /// Parse a configured provider name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "siliconflow" => Some(Self::SiliconFlow),
            "ppio" => Some(Self::Ppio),
            "volcengine" => Some(Self::Volcengine),
            "glm" => Some(Self::Glm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::SiliconFlow => "siliconflow",
            Self::Ppio => "ppio",
            Self::Volcengine => "volcengine",
            Self::Glm => "glm",
        }
    }

    /// Default API base URL.
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::SiliconFlow => "https://api.siliconflow.cn/v1",
            Self::Ppio => "https://api.ppinfra.com/v3/openai",
            Self::Volcengine => "https://ark.cn-beijing.volces.com/api/v3",
            Self::Glm => "https://open.bigmodel.cn/api/paas/v4",
        }
    }

    /// Conventional environment variable for the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::SiliconFlow => "SILICONFLOW_API_KEY",
            Self::Ppio => "PPIO_API_KEY",
            Self::Volcengine => "VOLCENGINE_API_KEY",
            Self::Glm => "GLM_API_KEY",
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding provider for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    vendor: Vendor,
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        vendor: Vendor,
        endpoint: Option<&str>,
        api_key: String,
        model: &str,
        dimensions: usize,
        batch_size: usize,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            vendor,
            client,
            base_url: endpoint
                .unwrap_or(vendor.base_url())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: model.to_string(),
            dimensions,
            batch_size: batch_size.max(1),
        })
    }

    fn build_request<'a>(&'a self, input: &'a [String]) -> EmbeddingRequest<'a> {
        // Only the text-embedding-3 family accepts a requested size
        let dimensions = (self.vendor == Vendor::OpenAI
            && self.model.starts_with("text-embedding-3"))
        .then_some(self.dimensions);

        EmbeddingRequest {
            model: &self.model,
            input,
            dimensions,
        }
    }

    fn parse_response(&self, body: EmbeddingResponse, expected: usize) -> AppResult<Vec<Vec<f32>>> {
        let mut data = body.data;
        if data.len() != expected {
            return Err(AppError::Embedding(format!(
                "{} returned {} embeddings for {} inputs",
                self.vendor.as_str(),
                data.len(),
                expected
            )));
        }

        data.sort_by_key(|d| d.index);
        data.into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimensions {
                    Ok(d.embedding)
                } else {
                    Err(AppError::Embedding(format!(
                        "{} model '{}' returned {} dimensions, expected {}",
                        self.vendor.as_str(),
                        self.model,
                        d.embedding.len(),
                        self.dimensions
                    )))
                }
            })
            .collect()
    }

    async fn embed_chunk(&self, input: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(input))
            .send()
            .await
            .map_err(|e| {
                AppError::Embedding(format!(
                    "Failed to send request to {}: {}",
                    self.vendor.as_str(),
                    e
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "{} API error ({}): {}",
                self.vendor.as_str(),
                status,
                error_text
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Embedding(format!(
                "Failed to parse {} response: {}",
                self.vendor.as_str(),
                e
            ))
        })?;

        self.parse_response(body, input.len())
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiCompatibleProvider {
    fn provider_name(&self) -> &str {
        self.vendor.as_str()
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
