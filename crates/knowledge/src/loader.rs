//! Offline loading of local files into a collection.

use crate::chunker;
use crate::config::{self, CollectionConfig};
use crate::embeddings::EmbeddingProvider;
use crate::index::{SourceRecord, SqliteIndex};
use crate::parser;
use crate::types::{LoadOptions, LoadStats};
use crate::vector_index::IndexedChunk;
use chrono::Utc;
use deepsearch_core::{AppError, AppResult, EmbeddingConfig};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Parse, chunk, embed and index local files or directories.
///
/// Files that cannot be parsed (binary, unreadable) are skipped with a
/// warning; a provider or index failure aborts the load.
pub async fn load_from_local_files(
    workspace: &Path,
    embedder: &dyn EmbeddingProvider,
    embedding_config: &EmbeddingConfig,
    default_collection: &str,
    options: LoadOptions,
) -> AppResult<LoadStats> {
    let start = Instant::now();

    if options.paths.is_empty() {
        return Err(AppError::InvalidArgument(
            "At least one path is required".to_string(),
        ));
    }
    if let Some(missing) = options.paths.iter().find(|p| !p.exists()) {
        return Err(AppError::InvalidArgument(format!(
            "Path does not exist: {:?}",
            missing
        )));
    }

    let collection = options
        .collection
        .clone()
        .unwrap_or_else(|| default_collection.to_string());
    let batch_size = options
        .batch_size
        .unwrap_or(embedding_config.batch_size)
        .max(1);

    tracing::info!(
        "Loading {} path(s) into collection '{}'",
        options.paths.len(),
        collection
    );

    let mut collection_config = config::load_or_create(workspace, &collection, embedding_config)?;
    if let Some(description) = &options.description {
        collection_config.description = description.clone();
    }

    let index = SqliteIndex::open(&config::get_index_path(workspace, &collection))?;

    let mut stats = LoadStats {
        collection: collection.clone(),
        ..LoadStats::default()
    };

    for file in collect_files(&options.paths) {
        match load_file(&index, embedder, &collection_config, &file, batch_size).await {
            Ok(Some((chunks, bytes))) => {
                stats.sources_count += 1;
                stats.chunks_count += chunks;
                stats.bytes_processed += bytes;
            }
            Ok(None) => stats.skipped_count += 1,
            Err(e) if e.is_provider_error() => return Err(e),
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", file, e);
                stats.skipped_count += 1;
            }
        }
    }

    collection_config.last_loaded_at = Some(Utc::now());
    config::save_config(workspace, &collection_config)?;

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Load completed: {} sources, {} chunks, {} skipped, {} bytes in {:.2}s",
        stats.sources_count,
        stats.chunks_count,
        stats.skipped_count,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}

/// Expand directories into their files, skipping hidden entries.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    files
}

/// Returns `None` when the file yields no text.
///
/// A reload replaces every chunk previously stored for the same reference.
async fn load_file(
    index: &SqliteIndex,
    embedder: &dyn EmbeddingProvider,
    collection: &CollectionConfig,
    path: &Path,
    batch_size: usize,
) -> AppResult<Option<(u32, u64)>> {
    tracing::debug!("Processing file: {:?}", path);

    let reference = path.to_string_lossy().to_string();
    let document = parser::parse_file(path)?;
    if document.text.trim().is_empty() {
        let removed = index.delete_reference(&reference).await?;
        if removed > 0 {
            tracing::info!("Removed {} chunks of emptied file {:?}", removed, path);
        }
        return Ok(None);
    }

    let content_type = document.content_type.as_str();
    let candidates = chunker::chunk_text(
        &reference,
        content_type,
        &document.text,
        collection.chunk_size as usize,
        collection.chunk_overlap as usize,
    );

    let mut chunks = Vec::with_capacity(candidates.len());
    for batch in candidates.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Provider returned {} embeddings for {} chunks",
                embeddings.len(),
                batch.len()
            )));
        }

        chunks.extend(batch.iter().zip(embeddings).map(|(candidate, embedding)| {
            IndexedChunk {
                reference: candidate.reference.clone(),
                position: candidate.position,
                text: candidate.text.clone(),
                embedding,
                metadata: candidate.metadata.clone(),
            }
        }));
    }

    let size_bytes = document.text.len() as u64;
    let source = SourceRecord {
        reference,
        content_type: content_type.to_string(),
        size_bytes,
    };
    let written = index.replace_source(source, chunks).await?;

    Ok(Some((written as u32, size_bytes)))
}
