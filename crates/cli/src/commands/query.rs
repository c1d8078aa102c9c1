//! Query command handler.
//!
//! Answers a question with the agentic searcher, either in one shot or as a
//! stream of `data: <json>` frames.

use clap::Args;
use deepsearch_core::{config::AppConfig, AppError, AppResult};
use deepsearch_knowledge::{bootstrap, StreamEvent};
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;

/// Answer a question from the loaded collection
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// The question to answer
    pub question: String,

    /// Maximum retrieval rounds (default from config)
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Print progress events as they happen
    #[arg(long)]
    pub stream: bool,

    /// Output as JSON
    #[arg(long, conflicts_with = "stream")]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command");

        let searcher = bootstrap::build_searcher(config)?;
        let max_iter = self.max_iter.unwrap_or(config.search.max_iter);

        if self.stream {
            return self.stream_frames(Arc::new(searcher), max_iter).await;
        }

        let result = searcher.query(&self.question, max_iter).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }

        println!("{}", result.answer);
        println!();
        if result.evidence.is_empty() {
            println!("Sources: (none)");
        } else {
            println!("Sources:");
            let mut seen = Vec::new();
            for passage in &result.evidence {
                if !seen.contains(&passage.source) {
                    println!("- {}", passage.source);
                    seen.push(passage.source.clone());
                }
            }
        }
        println!("Tokens: {}", result.tokens_consumed);

        Ok(())
    }

    async fn stream_frames(
        &self,
        searcher: Arc<deepsearch_knowledge::Searcher>,
        max_iter: usize,
    ) -> AppResult<()> {
        let mut events = searcher.query_stream(self.question.clone(), max_iter);
        let mut failure = None;
        let mut stdout = std::io::stdout();

        while let Some(event) = events.next().await {
            write!(stdout, "{}", event.to_frame())?;
            stdout.flush()?;

            if let StreamEvent::Error { content } = event {
                failure = Some(content);
            }
        }

        match failure {
            Some(content) => Err(AppError::Other(content)),
            None => Ok(()),
        }
    }
}
