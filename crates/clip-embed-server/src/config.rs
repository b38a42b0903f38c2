//! Server configuration.
//!
//! # TOML Structure
//!
//! ```toml
//! [http]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [batch]
//! max_batch_size = 8
//! batch_timeout_ms = 2
//!
//! [model]
//! model_name = "laion/CLIP-ViT-B-32-laion2B-s34B-b79K"
//! dimension = 512
//! ```
//!
//! # Priority
//!
//! CLI arguments > Environment variables > Config file > Defaults

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use clip_embed_batching::{EmbeddingConfig, EmbeddingError, EmbeddingResult};

// ============================================================================
// HTTP CONFIG
// ============================================================================

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl HttpConfig {
    /// `host:port` string for `TcpListener::bind`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// # Errors
    /// - `EmbeddingError::ConfigError` if host is empty
    pub fn validate(&self) -> EmbeddingResult<()> {
        if self.host.trim().is_empty() {
            return Err(EmbeddingError::ConfigError {
                message: "host cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SERVER CONFIG
// ============================================================================

/// Complete server configuration: listener plus scheduler and model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(flatten)]
    pub embedding: EmbeddingConfig,
}

/// Values given on the command line. `None` leaves the setting alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_batch_size: Option<usize>,
    pub batch_timeout_ms: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> EmbeddingResult<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|e| EmbeddingError::ConfigError {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        toml::from_str(&contents).map_err(|e| EmbeddingError::ConfigError {
            message: format!("Failed to parse TOML in '{}': {}", path.display(), e),
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if TOML parsing fails
    pub fn from_toml_str(toml: &str) -> EmbeddingResult<Self> {
        toml::from_str(toml).map_err(|e| EmbeddingError::ConfigError {
            message: format!("Failed to parse TOML: {}", e),
        })
    }

    /// Validate every section, returning the first error found.
    pub fn validate(&self) -> EmbeddingResult<()> {
        self.http.validate().map_err(|e| e.in_section("http"))?;
        self.embedding.validate()
    }

    /// Apply environment variable overrides.
    ///
    /// | Variable | Config Path | Type |
    /// |----------|-------------|------|
    /// | `CLIP_SERVER_HOST` | `http.host` | String |
    /// | `CLIP_SERVER_PORT` | `http.port` | u16 |
    ///
    /// plus every `EMBEDDING_*` variable understood by
    /// [`EmbeddingConfig::with_env_overrides`]. Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = env::var("CLIP_SERVER_HOST") {
            tracing::info!("ENV override: http.host = {}", host);
            self.http.host = host;
        }
        if let Ok(val) = env::var("CLIP_SERVER_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("ENV override: http.port = {}", port);
                    self.http.port = port;
                }
                Err(_) => tracing::warn!("Ignoring unparseable CLIP_SERVER_PORT={}", val),
            }
        }
        self.embedding = self.embedding.with_env_overrides();
        self
    }

    /// Apply command-line overrides. Called after `with_env_overrides` so
    /// the command line wins.
    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(host) = &cli.host {
            tracing::info!("CLI override: http.host = {}", host);
            self.http.host = host.clone();
        }
        if let Some(port) = cli.port {
            tracing::info!("CLI override: http.port = {}", port);
            self.http.port = port;
        }
        if let Some(size) = cli.max_batch_size {
            tracing::info!("CLI override: batch.max_batch_size = {}", size);
            self.embedding.batch.max_batch_size = size;
        }
        if let Some(ms) = cli.batch_timeout_ms {
            tracing::info!("CLI override: batch.batch_timeout_ms = {}", ms);
            self.embedding.batch.batch_timeout_ms = ms;
        }
    }
}
