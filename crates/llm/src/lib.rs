//! LLM integration crate for DeepSearch.
//!
//! This crate provides a provider-agnostic abstraction for text generation.
//! The searcher only ever sees `Arc<dyn LlmClient>`.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Any OpenAI-compatible chat completions endpoint
//!
//! # Example
//! ```no_run
//! use deepsearch_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new("llama3.2");
//! let request = LlmRequest::new("Hello, world!", "");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
