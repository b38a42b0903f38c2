//! Stub embedding backend.
//!
//! Generates DETERMINISTIC embeddings from a content hash so the server and
//! tests can run without model weights. Not a model: similar inputs do not
//! produce similar vectors.
//!
//! # How It Works
//!
//! 1. Hash the payload (kind tag + text bytes, or image shape + pixels)
//! 2. Seed an LCG PRNG with the hash
//! 3. Generate `dimension` values in [-1, 1]
//! 4. Normalize to unit length, like CLIP features
//!
//! Same input → same vector; image and text inputs never collide.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::error::EmbeddingResult;
use crate::traits::EmbeddingBackend;
use crate::types::{DecodedImage, EmbeddingVector, RequestKind};

/// Hash-seeded embedding backend.
///
/// # Example
///
/// ```rust
/// use clip_embed_batching::{EmbeddingBackend, StubEmbeddingBackend};
///
/// let backend = StubEmbeddingBackend::new("stub-clip", 512);
/// assert_eq!(backend.dimension(), 512);
/// assert_eq!(backend.model_name(), "stub-clip");
/// ```
#[derive(Debug, Clone)]
pub struct StubEmbeddingBackend {
    model_name: String,
    dimension: usize,
}

impl StubEmbeddingBackend {
    #[must_use]
    pub fn new(model_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dimension,
        }
    }

    fn vector_from_seed(&self, mut seed: u64) -> EmbeddingVector {
        let mut vector = Vec::with_capacity(self.dimension);

        for _ in 0..self.dimension {
            // Knuth MMIX LCG
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            let value = (seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
            vector.push(value as f32);
        }

        let magnitude: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in &mut vector {
                *v /= magnitude;
            }
        }

        vector
    }

    fn text_vector(&self, text: &str) -> EmbeddingVector {
        let mut hasher = DefaultHasher::new();
        RequestKind::Text.hash(&mut hasher);
        text.hash(&mut hasher);
        self.vector_from_seed(hasher.finish())
    }

    fn image_vector(&self, image: &DecodedImage) -> EmbeddingVector {
        let mut hasher = DefaultHasher::new();
        RequestKind::Image.hash(&mut hasher);
        image.width().hash(&mut hasher);
        image.height().hash(&mut hasher);
        image.pixels().hash(&mut hasher);
        self.vector_from_seed(hasher.finish())
    }
}

#[async_trait]
impl EmbeddingBackend for StubEmbeddingBackend {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_images(&self, images: &[DecodedImage]) -> EmbeddingResult<Vec<EmbeddingVector>> {
        Ok(images.iter().map(|img| self.image_vector(img)).collect())
    }

    async fn embed_texts(&self, texts: &[String]) -> EmbeddingResult<Vec<EmbeddingVector>> {
        Ok(texts.iter().map(|t| self.text_vector(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_stub_dimension_and_unit_norm() {
        let backend = StubEmbeddingBackend::new("stub", 512);
        let out = backend
            .embed_texts(&["a photo of a cat".to_string()])
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 512);
        assert!((norm(&out[0]) - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_stub_is_deterministic_and_index_aligned() {
        let backend = StubEmbeddingBackend::new("stub", 64);
        let texts: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

        let batched = backend.embed_texts(&texts).await.unwrap();
        for (i, text) in texts.iter().enumerate() {
            let single = backend.embed_texts(&[text.clone()]).await.unwrap();
            assert_eq!(batched[i], single[0], "index {} must match single call", i);
        }
        assert_ne!(batched[0], batched[1]);
    }

    #[tokio::test]
    async fn test_stub_image_and_text_do_not_collide() {
        let backend = StubEmbeddingBackend::new("stub", 32);
        let image = DecodedImage::from_rgb8(1, 1, vec![0, 0, 0]).unwrap();

        let img_vec = backend.embed_images(&[image]).await.unwrap();
        let txt_vec = backend.embed_texts(&[String::new()]).await.unwrap();
        assert_ne!(img_vec[0], txt_vec[0]);
    }

    #[tokio::test]
    async fn test_stub_empty_batch_returns_empty() {
        let backend = StubEmbeddingBackend::new("stub", 8);
        assert!(backend.embed_images(&[]).await.unwrap().is_empty());
    }
}
