//! Vector index abstraction.
//!
//! The searcher depends only on this trait; the SQLite store in
//! [`crate::index`] is the bundled implementation.

use crate::types::RetrievalResult;
use deepsearch_core::AppResult;

/// A chunk ready to be written, with its embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub reference: String,
    pub position: u32,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Trait for vector index backends.
///
/// Implementations must be safe for concurrent reads; the searcher issues
/// several `search` calls at once within a round.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Return up to `top_k` results ordered by descending score.
    async fn search(&self, query_embedding: &[f32], top_k: usize)
        -> AppResult<Vec<RetrievalResult>>;

    /// Insert or replace chunks.
    async fn upsert(&self, chunks: &[IndexedChunk]) -> AppResult<usize>;

    /// Number of chunks stored.
    async fn count(&self) -> AppResult<usize>;
}
