//! Request submission for the scheduler.

use crate::batch::BatchRequest;
use crate::error::{EmbeddingError, EmbeddingResult};
use crate::types::{DecodedImage, EmbeddingVector, ModelInput, RequestKind};

use super::core::Scheduler;

impl Scheduler {
    /// Submit a single input and wait for its embedding.
    ///
    /// The request joins the next batch; the returned future resolves when
    /// that batch has been embedded. Dropping the future abandons the
    /// request without affecting the rest of its batch.
    ///
    /// # Errors
    /// * `EmbeddingError::NotRunning` if the scheduler is stopped
    /// * `EmbeddingError::AdmissionError` if the queue cannot accept requests
    /// * `EmbeddingError::DispatchError` / `ResultCountMismatch` if the
    ///   backend failed for this request's kind-partition
    /// * `EmbeddingError::ShuttingDown` if the scheduler stopped before the
    ///   request was batched
    /// * `EmbeddingError::RequestDropped` if the completion channel closed
    ///   without a result
    pub async fn submit(&self, input: ModelInput) -> EmbeddingResult<EmbeddingVector> {
        let (request, rx) = BatchRequest::new(input);
        let request_id = request.id;
        let kind = request.kind();

        {
            let running = self.running.read();
            if !*running {
                return Err(EmbeddingError::NotRunning);
            }
            self.queue.enqueue(request)?;
        }
        self.stats.record_submission();
        tracing::trace!(request_id = %request_id, kind = %kind, "Request submitted");

        match rx.await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(request_id = %request_id, "Request dropped before completion");
                Err(EmbeddingError::RequestDropped)
            }
        }
    }

    /// Submit one decoded image.
    pub async fn embed_image(&self, image: DecodedImage) -> EmbeddingResult<EmbeddingVector> {
        self.submit(ModelInput::Image(image)).await
    }

    /// Submit one text.
    pub async fn embed_text(&self, text: impl Into<String>) -> EmbeddingResult<EmbeddingVector> {
        self.submit(ModelInput::text(text)).await
    }

    /// Embed a same-kind list directly, bypassing the queue.
    ///
    /// Works whether or not the scheduler is running; the call is not
    /// recorded in the scheduler statistics.
    ///
    /// # Errors
    /// * `EmbeddingError::MixedKinds` if the inputs are not all one kind
    /// * `EmbeddingError::ResultCountMismatch` if the backend returns the
    ///   wrong number of vectors
    /// * Any error returned by the backend, unchanged
    pub async fn embed_batch_now(
        &self,
        inputs: Vec<ModelInput>,
    ) -> EmbeddingResult<Vec<EmbeddingVector>> {
        let Some(kind) = inputs.first().map(ModelInput::kind) else {
            return Ok(Vec::new());
        };
        if inputs.iter().any(|input| input.kind() != kind) {
            return Err(EmbeddingError::MixedKinds);
        }

        let expected = inputs.len();
        let backend = self.dispatcher.backend();
        let vectors = match kind {
            RequestKind::Image => {
                let images: Vec<DecodedImage> = inputs
                    .into_iter()
                    .filter_map(|input| match input {
                        ModelInput::Image(image) => Some(image),
                        ModelInput::Text(_) => None,
                    })
                    .collect();
                backend.embed_images(&images).await?
            }
            RequestKind::Text => {
                let texts: Vec<String> = inputs
                    .into_iter()
                    .filter_map(|input| match input {
                        ModelInput::Text(text) => Some(text),
                        ModelInput::Image(_) => None,
                    })
                    .collect();
                backend.embed_texts(&texts).await?
            }
        };

        if vectors.len() != expected {
            return Err(EmbeddingError::ResultCountMismatch {
                kind,
                expected,
                actual: vectors.len(),
            });
        }

        tracing::debug!(kind = %kind, size = expected, "Direct batch embedded");
        Ok(vectors)
    }
}
