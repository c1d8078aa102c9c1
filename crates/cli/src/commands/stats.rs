//! Stats command handler.

use clap::Args;
use deepsearch_core::{config::AppConfig, AppError, AppResult};
use deepsearch_knowledge::{config, SqliteIndex};

/// Show collection statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Collection name (default from config)
    pub collection: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, app_config: &AppConfig) -> AppResult<()> {
        let name = self.collection.as_deref().unwrap_or(&app_config.collection);
        tracing::info!("Getting stats for collection '{}'", name);

        let collection = config::load_config(&app_config.workspace, name)?
            .ok_or_else(|| AppError::Knowledge(format!("Collection '{}' does not exist", name)))?;

        let index_path = config::get_index_path(&app_config.workspace, name);
        let (sources_count, chunks_count) = SqliteIndex::open(&index_path)?.stats()?;
        let db_size_bytes = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

        if self.json {
            let output = serde_json::json!({
                "collection": collection.name,
                "description": collection.description,
                "provider": collection.provider,
                "model": collection.model,
                "sourcesCount": sources_count,
                "chunksCount": chunks_count,
                "dbSizeBytes": db_size_bytes,
                "lastLoadedAt": collection.last_loaded_at,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Collection: {}", collection.name);
            if !collection.description.is_empty() {
                println!("  Description: {}", collection.description);
            }
            println!("  Embedding: {}/{}", collection.provider, collection.model);
            println!("  Sources: {}", sources_count);
            println!("  Chunks: {}", chunks_count);
            println!("  DB size: {} bytes", db_size_bytes);
            if let Some(loaded) = collection.last_loaded_at {
                println!("  Last loaded: {}", loaded);
            }
        }

        Ok(())
    }
}
