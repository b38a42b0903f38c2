//! Core value types: request kinds and payloads.

mod input;
mod kind;

pub use input::{DecodedImage, ModelInput};
pub use kind::RequestKind;

/// Embedding vector returned for one input.
pub type EmbeddingVector = Vec<f32>;
