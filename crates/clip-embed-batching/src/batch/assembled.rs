//! Formed batches and their per-kind partitions.
//!
//! # Lifecycle
//!
//! 1. The batch former creates an empty `Batch` and pushes requests in
//!    admission order
//! 2. The dispatcher splits it with [`Batch::into_partitions`]
//! 3. Each `KindPartition` is embedded with one backend call
//! 4. [`Completions::deliver`] resolves every member exactly once

use uuid::Uuid;

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::types::{DecodedImage, EmbeddingVector, ModelInput, RequestKind};

use super::request::{BatchRequest, CompletionSender};

// ============================================================================
// BATCH
// ============================================================================

/// Ordered group of requests collected by one formation cycle.
///
/// May mix kinds; order is admission order.
#[derive(Debug)]
pub struct Batch {
    /// Batch identifier for tracing.
    pub id: Uuid,

    requests: Vec<BatchRequest>,
}

impl Batch {
    /// Create an empty batch with room for `capacity` requests.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            requests: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, request: BatchRequest) {
        self.requests.push(request);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Requests in admission order.
    #[inline]
    #[must_use]
    pub fn requests(&self) -> &[BatchRequest] {
        &self.requests
    }

    /// Number of requests of the given kind.
    #[must_use]
    pub fn count_of(&self, kind: RequestKind) -> usize {
        self.requests.iter().filter(|r| r.kind() == kind).count()
    }

    /// Average time the members spent between submission and now.
    #[must_use]
    pub fn avg_wait_us(&self) -> u64 {
        if self.requests.is_empty() {
            return 0;
        }
        let total: u64 = self
            .requests
            .iter()
            .map(|r| r.elapsed().as_micros() as u64)
            .sum();
        total / self.requests.len() as u64
    }

    /// Split into image and text partitions, each preserving relative order.
    #[must_use]
    pub fn into_partitions(self) -> (KindPartition<DecodedImage>, KindPartition<String>) {
        let mut images = KindPartition::new(RequestKind::Image);
        let mut texts = KindPartition::new(RequestKind::Text);

        for request in self.requests {
            let BatchRequest {
                id,
                input,
                response_tx,
                ..
            } = request;
            match input {
                ModelInput::Image(image) => images.push(id, image, response_tx),
                ModelInput::Text(text) => texts.push(id, text, response_tx),
            }
        }

        (images, texts)
    }
}

// ============================================================================
// KIND PARTITION
// ============================================================================

/// Same-kind subset of a batch: the unit of one backend invocation.
#[derive(Debug)]
pub struct KindPartition<T> {
    /// Payloads in batch order.
    pub inputs: Vec<T>,

    /// Completion channels, index-aligned with `inputs`.
    pub completions: Completions,
}

impl<T> KindPartition<T> {
    #[must_use]
    pub fn new(kind: RequestKind) -> Self {
        Self {
            inputs: Vec::new(),
            completions: Completions {
                kind,
                request_ids: Vec::new(),
                response_txs: Vec::new(),
            },
        }
    }

    fn push(&mut self, id: Uuid, input: T, tx: CompletionSender) {
        self.inputs.push(input);
        self.completions.request_ids.push(id);
        self.completions.response_txs.push(tx);
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        self.completions.kind
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

// ============================================================================
// COMPLETIONS
// ============================================================================

/// Completion channels of one partition, consumed by a single delivery.
#[derive(Debug)]
pub struct Completions {
    kind: RequestKind,
    request_ids: Vec<Uuid>,
    response_txs: Vec<CompletionSender>,
}

/// What happened when a partition was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Members resolved with a vector.
    pub succeeded: usize,
    /// Members resolved with an error.
    pub failed: usize,
    /// Members whose caller had already gone away.
    pub receivers_gone: usize,
}

impl Completions {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.response_txs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.response_txs.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn request_ids(&self) -> &[Uuid] {
        &self.request_ids
    }

    /// Resolve every member from one backend call result.
    ///
    /// - `Ok` with one vector per member: each member gets its own vector,
    ///   index for index
    /// - `Ok` with the wrong count: every member gets `ResultCountMismatch`
    /// - `Err`: every member gets `DispatchError` with the same description
    pub fn deliver(self, result: EmbeddingResult<Vec<EmbeddingVector>>) -> DeliveryReport {
        let expected = self.len();
        match result {
            Ok(vectors) if vectors.len() == expected => {
                let mut report = DeliveryReport::default();
                for ((id, tx), vector) in self
                    .request_ids
                    .into_iter()
                    .zip(self.response_txs)
                    .zip(vectors)
                {
                    report.succeeded += 1;
                    if tx.send(Ok(vector)).is_err() {
                        report.receivers_gone += 1;
                        tracing::debug!(request_id = %id, "caller dropped before result delivery");
                    }
                }
                report
            }
            Ok(vectors) => {
                let kind = self.kind;
                let actual = vectors.len();
                self.fail(|| EmbeddingError::ResultCountMismatch {
                    kind,
                    expected,
                    actual,
                })
            }
            Err(e) => {
                let kind = self.kind;
                let message = e.to_string();
                self.fail(|| EmbeddingError::DispatchError {
                    kind,
                    message: message.clone(),
                })
            }
        }
    }

    /// Resolve every member with an error built by `make_error`.
    pub fn fail(self, make_error: impl Fn() -> EmbeddingError) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for (id, tx) in self.request_ids.into_iter().zip(self.response_txs) {
            report.failed += 1;
            if tx.send(Err(make_error())).is_err() {
                report.receivers_gone += 1;
                tracing::debug!(request_id = %id, "caller dropped before error delivery");
            }
        }
        report
    }
}
