//! Retrieval and agentic search over local document collections.
//!
//! Collections are loaded offline (parse, chunk, embed, store in SQLite) and
//! queried by the [`rag::Searcher`], which iterates planning and retrieval
//! with a language model before synthesizing an answer.

pub mod bootstrap;
pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod parser;
pub mod rag;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use bootstrap::{build_embedder, build_searcher, load_files};
pub use config::CollectionConfig;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::SqliteIndex;
pub use loader::load_from_local_files;
pub use rag::{QueryResult, RetrievalOutcome, Searcher, StreamEvent};
pub use types::{LoadOptions, LoadStats, RetrievalResult};
pub use vector_index::{IndexedChunk, VectorIndex};
