//! Concrete embedding provider implementations.

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod trigram;
