//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// A passage returned by the vector index.
///
/// Immutable once created. Two results with the same `(source, text)` pair
/// are the same evidence regardless of score or metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Passage text
    pub text: String,

    /// Source reference (file path or URL)
    pub source: String,

    /// Relevance score reported by the index
    pub score: f32,

    /// Insertion-ordered metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RetrievalResult {
    /// Create a result without metadata.
    pub fn new(text: impl Into<String>, source: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            score,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// SHA-256 over `(source, text)`, hex encoded.
    pub fn dedup_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_bytes());
        // Separator keeps ("ab", "c") and ("a", "bc") apart
        hasher.update([0u8]);
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    /// Source reference the chunk came from
    pub reference: String,
    pub position: u32,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Options for loading local files into a collection.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Files or directories to load
    pub paths: Vec<PathBuf>,

    /// Target collection, falls back to the configured default
    pub collection: Option<String>,

    /// Human-readable collection description
    pub description: Option<String>,

    /// Texts per embedding request, falls back to the embedding config
    pub batch_size: Option<usize>,
}

/// Statistics from a load operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadStats {
    /// Collection the chunks were written to
    pub collection: String,

    /// Number of files successfully loaded
    pub sources_count: u32,

    /// Number of chunks written
    pub chunks_count: u32,

    /// Files skipped (binary, unreadable or empty)
    pub skipped_count: u32,

    /// Total bytes of extracted text
    pub bytes_processed: u64,

    /// Duration in seconds
    pub duration_secs: f64,
}
