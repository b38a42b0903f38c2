//! Shared fixtures for scheduler integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clip_embed_batching::{
    BatchConfig, DecodedImage, EmbeddingBackend, EmbeddingError, EmbeddingResult,
    EmbeddingVector, RequestKind, Scheduler,
};
use parking_lot::Mutex;
use tokio::time::Instant;

/// One observed backend invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: RequestKind,
    /// Texts as given; images as their first pixel byte.
    pub inputs: Vec<String>,
    pub at: Instant,
}

/// Backend that records every call and answers with vectors derived from
/// the input, so a caller can check it got its own result.
///
/// A text embeds to its bytes as floats; an image whose first red byte is
/// `n` embeds to `[n, 0.0]`.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<RecordedCall>>,
    fail_kind: Option<RequestKind>,
    latency: Option<Duration>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call for `kind` fails with the same error.
    pub fn failing(kind: RequestKind) -> Self {
        Self {
            fail_kind: Some(kind),
            ..Self::default()
        }
    }

    /// Every call sleeps for `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().iter().map(|c| c.inputs.len()).collect()
    }

    async fn answer(
        &self,
        kind: RequestKind,
        inputs: Vec<String>,
        vectors: Vec<EmbeddingVector>,
    ) -> EmbeddingResult<Vec<EmbeddingVector>> {
        self.calls.lock().push(RecordedCall {
            kind,
            inputs,
            at: Instant::now(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_kind == Some(kind) {
            return Err(EmbeddingError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "model unavailable",
            )));
        }
        Ok(vectors)
    }
}

pub fn text_vector(text: &str) -> EmbeddingVector {
    text.bytes().map(f32::from).collect()
}

pub fn image_vector(seed: u8) -> EmbeddingVector {
    vec![f32::from(seed), 0.0]
}

pub fn image(seed: u8) -> DecodedImage {
    DecodedImage::from_rgb8(1, 1, vec![seed, 0, 0]).unwrap()
}

#[async_trait]
impl EmbeddingBackend for RecordingBackend {
    fn model_name(&self) -> &str {
        "recording"
    }

    fn dimension(&self) -> usize {
        2
    }

    async fn embed_images(&self, images: &[DecodedImage]) -> EmbeddingResult<Vec<EmbeddingVector>> {
        let inputs = images.iter().map(|i| i.pixels()[0].to_string()).collect();
        let vectors = images.iter().map(|i| image_vector(i.pixels()[0])).collect();
        self.answer(RequestKind::Image, inputs, vectors).await
    }

    async fn embed_texts(&self, texts: &[String]) -> EmbeddingResult<Vec<EmbeddingVector>> {
        let vectors = texts.iter().map(|t| text_vector(t)).collect();
        self.answer(RequestKind::Text, texts.to_vec(), vectors).await
    }
}

/// Start a scheduler over `backend`.
pub fn started(
    backend: Arc<RecordingBackend>,
    max_batch_size: usize,
    batch_timeout_ms: u64,
) -> Arc<Scheduler> {
    let scheduler =
        Scheduler::new(BatchConfig::new(max_batch_size, batch_timeout_ms), backend).unwrap();
    scheduler.start().unwrap();
    Arc::new(scheduler)
}
