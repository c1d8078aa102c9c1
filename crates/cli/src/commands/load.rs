//! Load command handler.

use clap::Args;
use deepsearch_core::{config::AppConfig, AppResult};
use deepsearch_knowledge::{bootstrap, LoadOptions};
use std::path::PathBuf;

/// Load local files or directories into a collection
#[derive(Args, Debug)]
pub struct LoadCommand {
    /// Files or directories to load
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Target collection (default from config)
    #[arg(long)]
    pub collection: Option<String>,

    /// Collection description
    #[arg(long)]
    pub description: Option<String>,

    /// Texts per embedding request
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LoadCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing load command for {} paths", self.paths.len());

        let options = LoadOptions {
            paths: self.paths.clone(),
            collection: self.collection.clone(),
            description: self.description.clone(),
            batch_size: self.batch_size,
        };

        let stats = bootstrap::load_files(config, options).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Loaded {} sources into '{}' ({} chunks, {} skipped, {} bytes) in {:.2}s",
                stats.sources_count,
                stats.collection,
                stats.chunks_count,
                stats.skipped_count,
                stats.bytes_processed,
                stats.duration_secs
            );
        }

        Ok(())
    }
}
