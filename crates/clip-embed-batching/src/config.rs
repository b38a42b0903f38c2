//! Configuration for the embedding scheduler.
//!
//! # TOML Structure
//!
//! ```toml
//! [batch]
//! max_batch_size = 8
//! batch_timeout_ms = 2
//!
//! [model]
//! model_name = "laion/CLIP-ViT-B-32-laion2B-s34B-b79K"
//! dimension = 512
//! ```
//!
//! Invalid configuration is an error, never silently defaulted.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, EmbeddingResult};

// ============================================================================
// BATCH CONFIG
// ============================================================================

/// Batch formation knobs.
///
/// A batch is dispatched when it reaches `max_batch_size` or when
/// `batch_timeout_ms` has elapsed since its first request arrived, whichever
/// comes first. Later arrivals never extend the deadline, so the added
/// latency per request is bounded by `batch_timeout_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of requests per batch.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Maximum wait measured from the first request of a forming batch.
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
}

fn default_max_batch_size() -> usize {
    8
}

fn default_batch_timeout_ms() -> u64 {
    2
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
        }
    }
}

impl BatchConfig {
    /// Shorthand constructor.
    #[must_use]
    pub fn new(max_batch_size: usize, batch_timeout_ms: u64) -> Self {
        Self {
            max_batch_size,
            batch_timeout_ms,
        }
    }

    /// Batch timeout as a `Duration`.
    #[inline]
    #[must_use]
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    /// Validate batch configuration values.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if max_batch_size is 0
    /// - `EmbeddingError::ConfigError` if batch_timeout_ms is 0
    pub fn validate(&self) -> EmbeddingResult<()> {
        if self.max_batch_size == 0 {
            return Err(EmbeddingError::ConfigError {
                message: "max_batch_size must be > 0".to_string(),
            });
        }

        if self.batch_timeout_ms == 0 {
            return Err(EmbeddingError::ConfigError {
                message: "batch_timeout_ms must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// MODEL CONFIG
// ============================================================================

/// Identity of the embedding model behind the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name reported by `/health`.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Output dimension of the embedding vectors.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_model_name() -> String {
    "laion/CLIP-ViT-B-32-laion2B-s34B-b79K".to_string()
}

fn default_dimension() -> usize {
    512
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            dimension: default_dimension(),
        }
    }
}

impl ModelConfig {
    /// # Errors
    /// - `EmbeddingError::ConfigError` if model_name is blank or dimension is 0
    pub fn validate(&self) -> EmbeddingResult<()> {
        if self.model_name.trim().is_empty() {
            return Err(EmbeddingError::ConfigError {
                message: "model_name must not be empty".to_string(),
            });
        }
        if self.dimension == 0 {
            return Err(EmbeddingError::ConfigError {
                message: "dimension must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// EMBEDDING CONFIG (ROOT)
// ============================================================================

/// Root configuration for the embedding scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub model: ModelConfig,
}

impl EmbeddingConfig {
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

    /// Serialize configuration to a TOML string.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if serialization fails
    pub fn to_toml_string(&self) -> EmbeddingResult<String> {
        toml::to_string_pretty(self).map_err(|e| EmbeddingError::ConfigError {
            message: format!("Failed to serialize to TOML: {}", e),
        })
    }

    /// Validate all nested sections, returning the first error found.
    pub fn validate(&self) -> EmbeddingResult<()> {
        self.batch.validate().map_err(|e| e.in_section("batch"))?;
        self.model.validate().map_err(|e| e.in_section("model"))?;

        Ok(())
    }

    /// Apply environment variable overrides. Prefix: `EMBEDDING_`
    ///
    /// | Variable | Config Path | Type |
    /// |----------|-------------|------|
    /// | `EMBEDDING_BATCH_MAX_SIZE` | `batch.max_batch_size` | usize |
    /// | `EMBEDDING_BATCH_TIMEOUT_MS` | `batch.batch_timeout_ms` | u64 |
    /// | `EMBEDDING_MODEL_NAME` | `model.model_name` | String |
    /// | `EMBEDDING_DIMENSION` | `model.dimension` | usize |
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var("EMBEDDING_BATCH_MAX_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                self.batch.max_batch_size = n;
            }
        }
        if let Ok(val) = env::var("EMBEDDING_BATCH_TIMEOUT_MS") {
            if let Ok(n) = val.parse::<u64>() {
                self.batch.batch_timeout_ms = n;
            }
        }
        if let Ok(val) = env::var("EMBEDDING_MODEL_NAME") {
            self.model.model_name = val;
        }
        if let Ok(val) = env::var("EMBEDDING_DIMENSION") {
            if let Ok(n) = val.parse::<usize>() {
                self.model.dimension = n;
            }
        }

        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
