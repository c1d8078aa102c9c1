//! Collection configuration management.
//!
//! Each collection lives under `.deepsearch/collections/<name>/` with a
//! `config.yaml` recording how its vectors were produced and an
//! `index.sqlite` holding them.

use chrono::{DateTime, Utc};
use deepsearch_core::{AppError, AppResult, EmbeddingConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Name of the collection
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Embedding provider used to build the vectors
    pub provider: String,

    /// Embedding model used to build the vectors
    pub model: String,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: u32,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// When files were last loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_loaded_at: Option<DateTime<Utc>>,
}

fn default_chunk_size() -> u32 {
    512
}

fn default_chunk_overlap() -> u32 {
    64
}

fn default_embedding_dim() -> u32 {
    384
}

impl CollectionConfig {
    /// New collection config bound to an embedding configuration.
    pub fn new(name: &str, embedding: &EmbeddingConfig) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            provider: embedding.provider.clone(),
            model: embedding.model.clone(),
            embedding_dim: embedding.dimensions as u32,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            last_loaded_at: None,
        }
    }

    /// Ensure the collection's vectors are comparable with `embedding`.
    ///
    /// Querying or extending a collection with a different model silently
    /// produces meaningless scores, so any mismatch is an error.
    pub fn validate_consistency(&self, embedding: &EmbeddingConfig) -> AppResult<()> {
        if self.provider != embedding.provider {
            return Err(AppError::Knowledge(format!(
                "Collection '{}' was built with provider '{}', configured provider is '{}'",
                self.name, self.provider, embedding.provider
            )));
        }

        if self.model != embedding.model {
            return Err(AppError::Knowledge(format!(
                "Collection '{}' was built with model '{}', configured model is '{}'",
                self.name, self.model, embedding.model
            )));
        }

        if self.embedding_dim as usize != embedding.dimensions {
            return Err(AppError::Knowledge(format!(
                "Collection '{}' has dimension {}, configured dimension is {}",
                self.name, self.embedding_dim, embedding.dimensions
            )));
        }

        Ok(())
    }
}

/// Load a collection's configuration, if it has one.
pub fn load_config(workspace: &Path, collection: &str) -> AppResult<Option<CollectionConfig>> {
    let config_path = get_config_path(workspace, collection);

    if !config_path.exists() {
        tracing::debug!("No config file for collection '{}'", collection);
        return Ok(None);
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Knowledge(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let mut config: CollectionConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Knowledge(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    // Directory name is authoritative
    config.name = collection.to_string();

    tracing::debug!("Loaded collection config for '{}'", collection);
    Ok(Some(config))
}

/// Load a collection's configuration or start a new one for `embedding`.
pub fn load_or_create(
    workspace: &Path,
    collection: &str,
    embedding: &EmbeddingConfig,
) -> AppResult<CollectionConfig> {
    match load_config(workspace, collection)? {
        Some(config) => {
            config.validate_consistency(embedding)?;
            Ok(config)
        }
        None => Ok(CollectionConfig::new(collection, embedding)),
    }
}

/// Save collection configuration.
pub fn save_config(workspace: &Path, config: &CollectionConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace, &config.name);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Knowledge(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Knowledge(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved collection config for '{}'", config.name);
    Ok(())
}

/// Get the directory for a collection.
pub fn get_collection_dir(workspace: &Path, collection: &str) -> PathBuf {
    workspace
        .join(".deepsearch")
        .join("collections")
        .join(collection)
}

/// Get the path to a collection's config file.
pub fn get_config_path(workspace: &Path, collection: &str) -> PathBuf {
    get_collection_dir(workspace, collection).join("config.yaml")
}

/// Get the SQLite index path for a collection.
pub fn get_index_path(workspace: &Path, collection: &str) -> PathBuf {
    get_collection_dir(workspace, collection).join("index.sqlite")
}
