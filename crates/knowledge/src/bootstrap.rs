//! Wiring concrete adapters from application configuration.

use crate::config;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index::SqliteIndex;
use crate::loader;
use crate::rag::Searcher;
use crate::types::{LoadOptions, LoadStats};
use deepsearch_core::{AppConfig, AppResult};
use deepsearch_llm::create_client;
use deepsearch_prompt::PromptSet;
use std::sync::Arc;

/// Build the embedding provider named by `config.embedding`.
pub fn build_embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(&config.embedding, None)
}

/// Build a searcher over the configured default collection.
///
/// A collection that was loaded with a different embedding model is
/// rejected; a collection that was never loaded searches as empty.
pub fn build_searcher(config: &AppConfig) -> AppResult<Searcher> {
    let embedder = build_embedder(config)?;

    match config::load_config(&config.workspace, &config.collection)? {
        Some(collection) => collection.validate_consistency(&config.embedding)?,
        None => tracing::warn!(
            "Collection '{}' has not been loaded yet; searches will find nothing",
            config.collection
        ),
    }

    let index = SqliteIndex::open(&config::get_index_path(&config.workspace, &config.collection))?;

    let api_key = config.resolve_api_key(&config.provider);
    let llm = create_client(
        &config.provider,
        config.llm_endpoint(),
        api_key.as_deref(),
        &config.model,
    )?;

    let prompts = PromptSet::load(&config.workspace)?;

    tracing::info!(
        "Searcher ready (llm: {}/{}, embedding: {}/{}, collection: {})",
        config.provider,
        config.model,
        embedder.provider_name(),
        embedder.model_name(),
        config.collection
    );

    Ok(Searcher::new(embedder, Arc::new(index), llm, config.search.clone()).with_prompts(prompts))
}

/// Load local files into a collection using the configured embedder.
pub async fn load_files(config: &AppConfig, options: LoadOptions) -> AppResult<LoadStats> {
    let embedder = build_embedder(config)?;
    loader::load_from_local_files(
        &config.workspace,
        embedder.as_ref(),
        &config.embedding,
        &config.collection,
        options,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline_config(workspace: &std::path::Path) -> AppConfig {
        let mut config = AppConfig {
            workspace: workspace.to_path_buf(),
            ..AppConfig::default()
        };
        config.embedding.provider = "trigram".to_string();
        config.provider = "ollama".to_string();
        config
    }

    #[tokio::test]
    async fn test_load_then_build_searcher() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(
            docs.join("geo.md"),
            "# Geography\n\nParis is the capital of France.",
        )
        .unwrap();

        let config = offline_config(dir.path());
        let stats = load_files(
            &config,
            LoadOptions {
                paths: vec![docs],
                ..LoadOptions::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(stats.sources_count, 1);

        let searcher = build_searcher(&config).unwrap();
        assert_eq!(searcher.config().max_iter, config.search.max_iter);
    }

    #[test]
    fn test_build_searcher_rejects_mismatched_collection() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(dir.path());

        let mut other = config.embedding.clone();
        other.model = "some-other-model".to_string();
        let collection = config::CollectionConfig::new(&config.collection, &other);
        config::save_config(dir.path(), &collection).unwrap();

        assert!(build_searcher(&config).is_err());
    }
}
