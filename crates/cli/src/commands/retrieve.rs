//! Retrieve command handler.

use clap::Args;
use deepsearch_core::{config::AppConfig, AppResult};
use deepsearch_knowledge::bootstrap;

/// Gather evidence for a question without writing an answer
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// The question to research
    pub question: String,

    /// Maximum retrieval rounds (default from config)
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RetrieveCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing retrieve command");

        let searcher = bootstrap::build_searcher(config)?;
        let max_iter = self.max_iter.unwrap_or(config.search.max_iter);
        let outcome = searcher.retrieve(&self.question, max_iter).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            return Ok(());
        }

        println!(
            "{} passages from {} rounds ({}), {} tokens",
            outcome.evidence.len(),
            outcome.metadata.iterations,
            outcome.metadata.stop_reason,
            outcome.tokens_consumed
        );
        println!("Sub-queries:");
        for sub_query in &outcome.metadata.sub_queries {
            println!("- {}", sub_query);
        }
        println!();

        for (i, passage) in outcome.evidence.iter().enumerate() {
            println!("[{}] {} (score {:.3})", i + 1, passage.source, passage.score);
            println!("{}", passage.text.trim());
            println!();
        }

        Ok(())
    }
}
