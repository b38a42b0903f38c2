//! Dynamic-batching scheduler for CLIP-style embedding requests.
//!
//! Many concurrent callers each submit one image or one text; the scheduler
//! groups them into small batches, embeds each batch with a single model call
//! per input kind, and hands every caller exactly its own vector.
//!
//! # Architecture
//!
//! - **Scheduler**: Lifecycle and `submit` entry point
//! - **EmbeddingBackend**: Trait for the model behind the scheduler
//! - **StubEmbeddingBackend**: Deterministic hash-seeded backend
//! - **EmbeddingConfig**: Batch and model settings from TOML and environment
//!
//! A batch is dispatched as soon as it holds `max_batch_size` requests, or
//! `batch_timeout_ms` after its first request arrived, whichever is first.
//!
//! # Example
//!
//! ```rust
//! use clip_embed_batching::{BatchConfig, RequestKind};
//!
//! let config = BatchConfig::default();
//! assert_eq!(config.max_batch_size, 8);
//! assert_eq!(config.batch_timeout_ms, 2);
//! assert_eq!(RequestKind::Image.as_str(), "image");
//! config.validate().expect("default config is valid");
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod stub;
pub mod traits;
pub mod types;

pub use batch::SchedulerStatsSummary;
pub use config::{BatchConfig, EmbeddingConfig, ModelConfig};
pub use error::{EmbeddingError, EmbeddingResult};
pub use scheduler::Scheduler;
pub use stub::StubEmbeddingBackend;
pub use traits::EmbeddingBackend;
pub use types::{DecodedImage, EmbeddingVector, ModelInput, RequestKind};
