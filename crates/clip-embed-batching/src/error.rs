//! Error type for the embedding scheduler.
//!
//! # Error Categories
//!
//! | Category | Variants | Who sees it |
//! |----------|----------|-------------|
//! | Caller | EmptyInput, InvalidImage, MixedKinds | Rejected before `submit` |
//! | Admission | AdmissionError, NotRunning, ShuttingDown | Caller of `submit` |
//! | Dispatch | DispatchError, ResultCountMismatch, RequestDropped | Every member of a kind-partition |
//! | Configuration | ConfigError, IoError | Startup |
//!
//! Dispatch failures are terminal: a request is never retried or re-queued.

use thiserror::Error;

use crate::types::RequestKind;

/// Error type for all scheduler and backend failures.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    // === Caller Errors ===
    /// Empty payload (zero-sized image or empty byte buffer).
    #[error("Empty input not allowed")]
    EmptyInput,

    /// Image bytes could not be decoded.
    #[error("Invalid image: {reason}")]
    InvalidImage { reason: String },

    /// A direct batch call mixed image and text inputs.
    #[error("Batch inputs must all share one kind")]
    MixedKinds,

    // === Admission Errors ===
    /// The admission queue could not accept or yield a request.
    #[error("Admission error: {message}")]
    AdmissionError { message: String },

    /// `submit` called while the background loop is not running.
    #[error("Scheduler is not running")]
    NotRunning,

    /// Request was still queued when the scheduler stopped.
    #[error("Scheduler shut down before the request was batched")]
    ShuttingDown,

    // === Dispatch Errors ===
    /// The embedding function failed for a whole kind-partition.
    #[error("Embedding failed for {kind} batch: {message}")]
    DispatchError { kind: RequestKind, message: String },

    /// The embedding function broke its contract by returning the wrong
    /// number of vectors.
    #[error("Embedding function returned {actual} vectors for {expected} {kind} inputs")]
    ResultCountMismatch {
        kind: RequestKind,
        expected: usize,
        actual: usize,
    },

    /// The completion channel was dropped without a result.
    #[error("Request was dropped before completion")]
    RequestDropped,

    // === Configuration Errors ===
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EmbeddingError {
    /// Prefix a `ConfigError` message with the config section it came from.
    ///
    /// Other variants pass through unchanged.
    #[must_use]
    pub fn in_section(self, section: &str) -> Self {
        match self {
            EmbeddingError::ConfigError { message } => EmbeddingError::ConfigError {
                message: format!("[{}] {}", section, message),
            },
            other => other,
        }
    }
}

/// Result type alias for scheduler operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_in_section_prefixes_config_errors_once() {
        let err = EmbeddingError::ConfigError {
            message: "dimension must be > 0".to_string(),
        }
        .in_section("model");
        assert_eq!(
            err.to_string(),
            "Configuration error: [model] dimension must be > 0"
        );

        let passthrough = EmbeddingError::ShuttingDown.in_section("model");
        assert!(matches!(passthrough, EmbeddingError::ShuttingDown));
    }

    #[test]
    fn test_dispatch_error_names_kind_and_message() {
        let err = EmbeddingError::DispatchError {
            kind: RequestKind::Text,
            message: "CUDA out of memory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("text"));
        assert!(msg.contains("CUDA out of memory"));
    }

    #[test]
    fn test_result_count_mismatch_message() {
        let err = EmbeddingError::ResultCountMismatch {
            kind: RequestKind::Image,
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Embedding function returned 3 vectors for 4 image inputs"
        );
    }

    #[test]
    fn test_io_error_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config missing");
        let err: EmbeddingError = io.into();
        assert!(err.to_string().contains("config missing"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EmbeddingError>();
    }
}
