//! DeepSearch CLI
//!
//! Main entry point for the deepsearch command-line tool.
//! Loads local collections, answers questions with iterative retrieval and
//! serves the same operations over HTTP.

mod commands;
mod server;

use clap::{Parser, Subcommand};
use commands::{LoadCommand, QueryCommand, RetrieveCommand, ServeCommand, StatsCommand};
use deepsearch_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// DeepSearch - agentic retrieval-augmented search over local documents
#[derive(Parser, Debug)]
#[command(name = "deepsearch")]
#[command(about = "Agentic retrieval-augmented search over local documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DEEPSEARCH_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DEEPSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai, deepseek, siliconflow)
    #[arg(short, long, global = true, env = "DEEPSEARCH_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "DEEPSEARCH_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question from the loaded collection
    Query(QueryCommand),

    /// Gather evidence without writing an answer
    Retrieve(RetrieveCommand),

    /// Load local files into a collection
    Load(LoadCommand),

    /// Run the HTTP API
    Serve(ServeCommand),

    /// Show collection statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Workspace and config file decide which YAML is read
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?
        .with_overrides(
            cli.workspace,
            cli.config,
            cli.provider,
            cli.model,
            cli.log_level,
            cli.verbose,
            cli.no_color,
        );
    config.validate()?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("DeepSearch CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_data_dir()?;

    let command_name = match &cli.command {
        Commands::Query(_) => "query",
        Commands::Retrieve(_) => "retrieve",
        Commands::Load(_) => "load",
        Commands::Serve(_) => "serve",
        Commands::Stats(_) => "stats",
    };
    let span = tracing::info_span!("command", name = command_name);
    let _guard = span.enter();

    let result = match cli.command {
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Retrieve(cmd) => cmd.execute(&config).await,
        Commands::Load(cmd) => cmd.execute(&config).await,
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
