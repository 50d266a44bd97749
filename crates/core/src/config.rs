//! Configuration management for docgraph.
//!
//! Configuration is parsed once at startup into an immutable [`AppConfig`]
//! and passed by reference into components — core logic never reads the
//! environment on its own. Sources, in precedence order:
//! - Environment variables
//! - Optional YAML config file (`DOCGRAPH_CONFIG`)
//! - Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Default embedding vector dimension (Gemini embedding models).
pub const DEFAULT_DIMENSION: usize = 768;

/// Default cosine-similarity threshold for graph edges.
pub const DEFAULT_GRAPH_THRESHOLD: f32 = 0.7;

/// Main application configuration.
///
/// Immutable once loaded. Missing required keys are a startup-time fatal
/// error, not a runtime error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API credential for the embedding/completion provider.
    pub api_key: String,

    /// Override for the provider API base URL; `None` uses the provider
    /// default.
    pub api_url: Option<String>,

    /// Connection string for the vector store backend (SQLite path).
    pub store_path: PathBuf,

    /// Name of the vector index holding document embeddings.
    pub index_name: String,

    /// Embedding vector dimension, fixed per index.
    pub dimension: usize,

    /// Embedding model identifier.
    pub embedding_model: String,

    /// Chat/completion model identifier.
    pub chat_model: String,

    /// Maximum chunk size in characters.
    pub chunk_max_size: usize,

    /// Cosine-similarity threshold for graph edges.
    pub graph_threshold: f32,

    /// Number of direct hits retrieved per query.
    pub top_k: usize,

    /// Query deadline in seconds.
    pub query_timeout_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Disable colored output
    pub no_color: bool,
}

/// Tuning knobs loadable from a YAML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    api_url: Option<String>,
    index_name: Option<String>,
    dimension: Option<usize>,
    embedding_model: Option<String>,
    chat_model: Option<String>,
    chunk_max_size: Option<usize>,
    graph_threshold: Option<f32>,
    top_k: Option<usize>,
    query_timeout_secs: Option<u64>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl AppConfig {
    /// Load configuration from environment variables and the optional
    /// config file.
    ///
    /// Environment variables:
    /// - `GOOGLE_GENERATIVE_AI_API_KEY`: provider credential (required)
    /// - `DOCGRAPH_DB`: vector store connection string (required)
    /// - `GOOGLE_API_URL`: provider API base URL override
    /// - `DOCGRAPH_CONFIG`: path to a YAML tuning file
    /// - `RUST_LOG`: log level
    /// - `NO_COLOR`: disable colored output
    pub fn load() -> AppResult<Self> {
        let api_key = std::env::var("GOOGLE_GENERATIVE_AI_API_KEY").map_err(|_| {
            AppError::Config(
                "GOOGLE_GENERATIVE_AI_API_KEY is not set; it is required at startup".to_string(),
            )
        })?;

        let store_path = std::env::var("DOCGRAPH_DB").map_err(|_| {
            AppError::Config("DOCGRAPH_DB is not set; it is required at startup".to_string())
        })?;

        let mut config = Self {
            api_key,
            api_url: std::env::var("GOOGLE_API_URL").ok(),
            store_path: PathBuf::from(store_path),
            index_name: "embeddings".to_string(),
            dimension: DEFAULT_DIMENSION,
            embedding_model: "gemini-embedding-exp-03-07".to_string(),
            chat_model: "gemini-2.0-flash".to_string(),
            chunk_max_size: 1000,
            graph_threshold: DEFAULT_GRAPH_THRESHOLD,
            top_k: 10,
            query_timeout_secs: 30,
            log_level: std::env::var("RUST_LOG").ok(),
            no_color: std::env::var("NO_COLOR").is_ok(),
        };

        if let Ok(path) = std::env::var("DOCGRAPH_CONFIG") {
            config.merge_yaml(&PathBuf::from(path))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Merge a YAML tuning file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(url) = file.api_url {
            self.api_url = Some(url);
        }
        if let Some(name) = file.index_name {
            self.index_name = name;
        }
        if let Some(dim) = file.dimension {
            self.dimension = dim;
        }
        if let Some(model) = file.embedding_model {
            self.embedding_model = model;
        }
        if let Some(model) = file.chat_model {
            self.chat_model = model;
        }
        if let Some(size) = file.chunk_max_size {
            self.chunk_max_size = size;
        }
        if let Some(threshold) = file.graph_threshold {
            self.graph_threshold = threshold;
        }
        if let Some(k) = file.top_k {
            self.top_k = k;
        }
        if let Some(secs) = file.query_timeout_secs {
            self.query_timeout_secs = secs;
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        Ok(())
    }

    /// Validate value ranges after all sources are merged.
    fn validate(&self) -> AppResult<()> {
        if self.chunk_max_size == 0 {
            return Err(AppError::Config(
                "chunk_max_size must be a positive integer".to_string(),
            ));
        }
        if self.dimension == 0 {
            return Err(AppError::Config(
                "dimension must be a positive integer".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.graph_threshold) {
            return Err(AppError::Config(format!(
                "graph_threshold must be within [-1, 1], got {}",
                self.graph_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Apply CLI overrides, giving flags precedence over the environment.
    pub fn with_overrides(
        mut self,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose && self.log_level.is_none() {
            self.log_level = Some("debug".to_string());
        }

        if no_color {
            self.no_color = true;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_config() -> AppConfig {
        AppConfig {
            api_key: "test-key".to_string(),
            api_url: None,
            store_path: PathBuf::from("/tmp/docgraph.db"),
            index_name: "embeddings".to_string(),
            dimension: DEFAULT_DIMENSION,
            embedding_model: "gemini-embedding-exp-03-07".to_string(),
            chat_model: "gemini-2.0-flash".to_string(),
            chunk_max_size: 1000,
            graph_threshold: DEFAULT_GRAPH_THRESHOLD,
            top_k: 10,
            query_timeout_secs: 30,
            log_level: None,
            no_color: false,
        }
    }

    #[test]
    fn test_defaults() {
        let config = base_config();
        assert_eq!(config.dimension, 768);
        assert!((config.graph_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.index_name, "embeddings");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = base_config();
        config.chunk_max_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = base_config();
        config.graph_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_yaml_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_url: http://localhost:9090/v1beta\nchunk_max_size: 500\ngraph_threshold: 0.8\ntop_k: 5\nlogging:\n  level: debug"
        )
        .unwrap();

        let mut config = base_config();
        config.merge_yaml(&file.path().to_path_buf()).unwrap();

        assert_eq!(
            config.api_url.as_deref(),
            Some("http://localhost:9090/v1beta")
        );
        assert_eq!(config.chunk_max_size, 500);
        assert!((config.graph_threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_with_overrides_verbose() {
        let config = base_config().with_overrides(None, true, true);
        assert_eq!(config.log_level, Some("debug".to_string()));
        assert!(config.no_color);
    }
}
