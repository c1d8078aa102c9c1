//! Embedding providers.
//!
//! Every vendor integration is a variant behind the one
//! [`EmbeddingProvider`] trait; callers never see which one is active.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
