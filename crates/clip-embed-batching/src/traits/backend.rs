//! The embedding function consumed by the scheduler.
//!
//! # Contract
//!
//! Given N same-kind inputs in order, an implementation returns exactly N
//! vectors, index-aligned with the inputs, or fails the whole call. Partial
//! success is not expressible. The scheduler never calls an implementation
//! with zero inputs and never retries a failed call.
//!
//! Implementations are shared across dispatches (`Arc<dyn EmbeddingBackend>`)
//! and may be invoked concurrently for different batches. CPU- or GPU-bound
//! work should be moved off the async executor (e.g. `spawn_blocking`).
//!
//! # Example Implementation
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use clip_embed_batching::{DecodedImage, EmbeddingBackend, EmbeddingResult};
//!
//! struct ClipOnnx { /* session, tokenizer */ }
//!
//! #[async_trait]
//! impl EmbeddingBackend for ClipOnnx {
//!     fn model_name(&self) -> &str { "clip-vit-b-32" }
//!     fn dimension(&self) -> usize { 512 }
//!
//!     async fn embed_images(&self, images: &[DecodedImage]) -> EmbeddingResult<Vec<Vec<f32>>> {
//!         todo!()
//!     }
//!
//!     async fn embed_texts(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::EmbeddingResult;
use crate::types::{DecodedImage, EmbeddingVector};

/// Model-backed embedding function, one entry point per request kind.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Model identifier reported by health checks.
    fn model_name(&self) -> &str;

    /// Output dimension of every returned vector.
    fn dimension(&self) -> usize;

    /// Embed an ordered batch of images.
    ///
    /// # Errors
    /// Any error fails the whole call.
    async fn embed_images(&self, images: &[DecodedImage]) -> EmbeddingResult<Vec<EmbeddingVector>>;

    /// Embed an ordered batch of texts.
    ///
    /// # Errors
    /// Any error fails the whole call.
    async fn embed_texts(&self, texts: &[String]) -> EmbeddingResult<Vec<EmbeddingVector>>;
}
