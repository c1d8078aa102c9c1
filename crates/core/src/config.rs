//! Configuration management for DeepSearch.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Config file (.deepsearch/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Configuration is read once at bootstrap. The resulting `AppConfig` is
//! shared read-only by every search invocation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .deepsearch/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider (e.g., "ollama", "openai")
    pub provider: String,

    /// Model identifier for the active provider
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Embedding provider settings
    pub embedding: EmbeddingConfig,

    /// Collection queried and loaded by default
    pub collection: String,

    /// Iterative search settings
    pub search: SearchConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// Any OpenAI-compatible chat completions endpoint
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } => model,
            ProviderConfig::Ollama { model, .. } => model,
        }
    }

    /// Endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama", "openai", "siliconflow", "ppio",
    /// "volcengine", "glm", "gemini"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum batch size for embedding requests
    #[serde(rename = "batchSize", default = "default_batch_size")]
    pub batch_size: usize,

    /// Endpoint override for HTTP providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Environment variable holding the provider API key
    #[serde(rename = "apiKeyEnv", default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: default_batch_size(),
            endpoint: None,
            api_key_env: None,
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
    }
}

/// How the searcher decides that gathered evidence is sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoppingKind {
    /// Ask the language model to judge sufficiency after each round
    Llm,
    /// Stop once the evidence set reaches `min_results` entries
    Threshold,
    /// Run every round up to `max_iter`
    Exhaustive,
}

/// Iterative search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default maximum number of retrieval rounds
    #[serde(rename = "maxIter")]
    pub max_iter: usize,

    /// Candidates requested from the vector index per sub-query
    #[serde(rename = "topK")]
    pub top_k: usize,

    /// Sufficiency heuristic
    pub stopping: StoppingKind,

    /// Evidence count at which the threshold policy stops
    #[serde(rename = "minResults")]
    pub min_results: usize,

    /// Upper bound on sub-queries issued per round
    #[serde(rename = "maxSubQueries")]
    pub max_sub_queries: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iter: 3,
            top_k: 10,
            stopping: StoppingKind::Llm,
            min_results: 8,
            max_sub_queries: 4,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(rename = "enableCors")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: false,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    embedding: Option<EmbeddingConfig>,
    collection: Option<String>,
    search: Option<SearchConfig>,
    server: Option<ServerConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

/// LLM providers the factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["ollama", "openai"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            embedding: EmbeddingConfig::default(),
            collection: "default".to_string(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var).ok().map(PathBuf::from)
}

impl AppConfig {
    /// Load configuration from defaults, config file and environment.
    ///
    /// Environment variables:
    /// - `DEEPSEARCH_WORKSPACE`: Override workspace path
    /// - `DEEPSEARCH_CONFIG`: Path to config file
    /// - `DEEPSEARCH_PROVIDER`: LLM provider
    /// - `DEEPSEARCH_MODEL`: Model identifier
    /// - `DEEPSEARCH_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use deepsearch_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], but with workspace and config file paths
    /// given on the command line.
    ///
    /// The paths must be known before the YAML file is located, so they are
    /// resolved here rather than in [`AppConfig::with_overrides`].
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("DEEPSEARCH_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("DEEPSEARCH_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".deepsearch/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("DEEPSEARCH_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("DEEPSEARCH_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("DEEPSEARCH_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(collection) = config_file.collection {
            result.collection = collection;
        }

        if let Some(search) = config_file.search {
            result.search = search;
        }

        if let Some(server) = config_file.server {
            result.server = server;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    /// Workspace and config file paths only affect which YAML is read when
    /// passed to [`AppConfig::load_from`].
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .deepsearch directory.
    pub fn data_dir(&self) -> PathBuf {
        self.workspace.join(".deepsearch")
    }

    /// Ensure the .deepsearch directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        let data_dir = self.data_dir();
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .deepsearch directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the configuration block for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint configured for the active LLM provider.
    pub fn llm_endpoint(&self) -> Option<&str> {
        self.get_provider_config(&self.provider)
            .and_then(ProviderConfig::endpoint)
    }

    /// Resolve the LLM API key: explicit key first, then the provider's env var.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { api_key_env, .. } => std::env::var(api_key_env).ok(),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    /// Validate configuration for the active provider and search settings.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();

        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) =
            self.get_provider_config(&self.provider)
        {
            if self.api_key.is_none() && std::env::var(api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        if self.search.max_iter == 0 {
            return Err(AppError::Config(
                "search.maxIter must be at least 1".to_string(),
            ));
        }

        if self.search.top_k == 0 {
            return Err(AppError::Config("search.topK must be at least 1".to_string()));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.collection, "default");
        assert_eq!(config.search.max_iter, 3);
        assert_eq!(config.search.stopping, StoppingKind::Llm);
        assert_eq!(config.embedding.provider, "trigram");
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_data_dir() {
        let config = AppConfig::default();
        assert!(config.data_dir().ends_with(".deepsearch"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("gpt-4o-mini".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "gpt-4o-mini");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let yaml = r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: "http://gpu-box:11434"
      model: qwen2.5
embedding:
  provider: gemini
  model: text-embedding-004
  dimensions: 768
  apiKeyEnv: GEMINI_API_KEY
collection: papers
search:
  maxIter: 5
  stopping: threshold
  minResults: 3
server:
  port: 9000
  enableCors: true
logging:
  color: false
"#;

        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();

        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "qwen2.5");
        assert_eq!(merged.llm_endpoint(), Some("http://gpu-box:11434"));
        assert_eq!(merged.embedding.provider, "gemini");
        assert_eq!(merged.embedding.dimensions, 768);
        assert_eq!(merged.embedding.batch_size, 100);
        assert_eq!(merged.collection, "papers");
        assert_eq!(merged.search.max_iter, 5);
        assert_eq!(merged.search.stopping, StoppingKind::Threshold);
        assert_eq!(merged.search.min_results, 3);
        // Unspecified search fields keep their defaults
        assert_eq!(merged.search.top_k, 10);
        assert_eq!(merged.server.port, 9000);
        assert!(merged.server.enable_cors);
        assert!(merged.no_color);
    }

    #[test]
    fn test_openai_provider_config_parses() {
        let yaml = r#"
llm:
  activeProvider: openai
  providers:
    openai:
      apiKeyEnv: DEEPSEARCH_TEST_UNSET_KEY
      model: gpt-4o-mini
      endpoint: "https://api.deepseek.com/v1"
"#;

        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(merged.provider, "openai");
        assert_eq!(merged.model, "gpt-4o-mini");
        assert_eq!(merged.llm_endpoint(), Some("https://api.deepseek.com/v1"));
        assert!(merged.resolve_api_key("openai").is_none());
        assert!(merged.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_max_iter() {
        let mut config = AppConfig::default();
        config.search.max_iter = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("maxIter"));
    }

    #[test]
    fn test_load_from_explicit_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        std::fs::write(&path, "search:\n  maxIter: 7\n").unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), Some(path.clone()))
            .unwrap()
            .with_overrides(None, Some(path.clone()), None, None, None, false, false);

        assert_eq!(config.search.max_iter, 7);
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.workspace, temp.path());
    }

    #[test]
    fn test_load_from_workspace_reads_its_config() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".deepsearch")).unwrap();
        std::fs::write(
            temp.path().join(".deepsearch/config.yaml"),
            "collection: papers\nsearch:\n  topK: 4\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.collection, "papers");
        assert_eq!(config.search.top_k, 4);
    }

    #[test]
    fn test_load_from_missing_workspace_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = AppConfig::load_from(Some(temp.path().join("absent")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
