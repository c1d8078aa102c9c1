//! Serve command handler.

use crate::server::{self, ServerState};
use clap::Args;
use deepsearch_core::{config::AppConfig, AppResult};
use deepsearch_knowledge::bootstrap;
use std::sync::Arc;

/// Run the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (default from config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (default from config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Allow cross-origin requests from any origin
    #[arg(long)]
    pub enable_cors: bool,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let host = self.host.clone().unwrap_or_else(|| config.server.host.clone());
        let port = self.port.unwrap_or(config.server.port);
        let enable_cors = self.enable_cors || config.server.enable_cors;

        let state = ServerState {
            searcher: Arc::new(bootstrap::build_searcher(config)?),
            config: Arc::new(config.clone()),
        };

        server::serve(state, &host, port, enable_cors).await
    }
}
