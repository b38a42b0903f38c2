//! Batch dispatcher: one backend call per kind-partition.
//!
//! A formed batch is split into its image and text partitions, which are
//! embedded concurrently and resolved independently. A failure (or panic) in
//! one partition never affects the other.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinError;
use uuid::Uuid;

use crate::batch::{Batch, Completions, DeliveryReport, KindPartition, SchedulerStats};
use crate::error::{EmbeddingError, EmbeddingResult};
use crate::traits::EmbeddingBackend;
use crate::types::EmbeddingVector;

/// Runs formed batches against the embedding backend and delivers results.
#[derive(Clone)]
pub struct BatchDispatcher {
    backend: Arc<dyn EmbeddingBackend>,
    stats: Arc<SchedulerStats>,
}

impl BatchDispatcher {
    #[must_use]
    pub fn new(backend: Arc<dyn EmbeddingBackend>, stats: Arc<SchedulerStats>) -> Self {
        Self { backend, stats }
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn EmbeddingBackend> {
        &self.backend
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> &Arc<SchedulerStats> {
        &self.stats
    }

    /// Embed every member of `batch` and resolve each exactly once.
    ///
    /// Image and text partitions are dispatched concurrently; an empty
    /// partition is skipped without calling the backend.
    pub async fn dispatch(&self, batch: Batch) -> DeliveryReport {
        let batch_id = batch.id;
        let size = batch.len();
        self.stats.dispatch_started();

        let (images, texts) = batch.into_partitions();
        let (image_report, text_report) = tokio::join!(
            self.dispatch_partition(batch_id, images, |backend, inputs| async move {
                backend.embed_images(&inputs).await
            }),
            self.dispatch_partition(batch_id, texts, |backend, inputs| async move {
                backend.embed_texts(&inputs).await
            }),
        );

        let report = DeliveryReport {
            succeeded: image_report.succeeded + text_report.succeeded,
            failed: image_report.failed + text_report.failed,
            receivers_gone: image_report.receivers_gone + text_report.receivers_gone,
        };
        self.stats.record_outcomes(report.succeeded, report.failed);
        self.stats.dispatch_finished();

        tracing::debug!(
            batch_id = %batch_id,
            size,
            succeeded = report.succeeded,
            failed = report.failed,
            "Batch dispatched"
        );
        report
    }

    async fn dispatch_partition<T, F, Fut>(
        &self,
        batch_id: Uuid,
        partition: KindPartition<T>,
        call: F,
    ) -> DeliveryReport
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn EmbeddingBackend>, Vec<T>) -> Fut,
        Fut: Future<Output = EmbeddingResult<Vec<EmbeddingVector>>> + Send + 'static,
    {
        if partition.is_empty() {
            return DeliveryReport::default();
        }

        let KindPartition {
            inputs,
            completions,
        } = partition;

        // Own task so a backend panic surfaces as a JoinError here.
        let joined = tokio::spawn(call(self.backend.clone(), inputs)).await;
        deliver_joined(batch_id, completions, joined)
    }
}

fn deliver_joined(
    batch_id: Uuid,
    completions: Completions,
    joined: Result<EmbeddingResult<Vec<EmbeddingVector>>, JoinError>,
) -> DeliveryReport {
    let kind = completions.kind();
    let size = completions.len();

    match joined {
        Ok(Ok(vectors)) => {
            if vectors.len() != size {
                tracing::error!(
                    batch_id = %batch_id,
                    kind = %kind,
                    expected = size,
                    actual = vectors.len(),
                    "Embedding backend returned wrong number of vectors"
                );
            }
            completions.deliver(Ok(vectors))
        }
        Ok(Err(e)) => {
            tracing::error!(
                batch_id = %batch_id,
                kind = %kind,
                size,
                error = %e,
                "Embedding call failed"
            );
            completions.deliver(Err(e))
        }
        Err(join_error) => {
            let message = if join_error.is_panic() {
                format!(
                    "embedding backend panicked: {}",
                    panic_message(join_error.into_panic())
                )
            } else {
                "embedding task was cancelled".to_string()
            };
            tracing::error!(
                batch_id = %batch_id,
                kind = %kind,
                size,
                error = %message,
                "Embedding task aborted"
            );
            completions.fail(|| EmbeddingError::DispatchError {
                kind,
                message: message.clone(),
            })
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
