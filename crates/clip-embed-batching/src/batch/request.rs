//! Pending request: one caller's input plus its completion channel.

use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::EmbeddingResult;
use crate::types::{EmbeddingVector, ModelInput, RequestKind};

/// Write half of a request's completion channel.
pub type CompletionSender = oneshot::Sender<EmbeddingResult<EmbeddingVector>>;

/// Read half of a request's completion channel, held by the caller.
pub type CompletionReceiver = oneshot::Receiver<EmbeddingResult<EmbeddingVector>>;

/// Individual embedding request submitted to the scheduler.
///
/// The completion sender is consumed on delivery, so a request can be
/// resolved at most once; the type system rules out double delivery.
///
/// # Example
///
/// ```rust
/// use clip_embed_batching::batch::BatchRequest;
/// use clip_embed_batching::{ModelInput, RequestKind};
///
/// let (request, _receiver) = BatchRequest::new(ModelInput::text("a diagram"));
/// assert_eq!(request.kind(), RequestKind::Text);
/// ```
#[derive(Debug)]
pub struct BatchRequest {
    /// Unique request identifier for tracing.
    pub id: Uuid,

    /// Input to embed. Never mutated by the scheduler.
    pub input: ModelInput,

    /// Completion channel, consumed when the request is resolved.
    pub response_tx: CompletionSender,

    /// Submission timestamp, used for wait-time statistics.
    pub submitted_at: Instant,
}

impl BatchRequest {
    /// Create a request and the receiver its caller awaits.
    #[must_use]
    pub fn new(input: ModelInput) -> (Self, CompletionReceiver) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            id: Uuid::new_v4(),
            input,
            response_tx: tx,
            submitted_at: Instant::now(),
        };
        (request, rx)
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        self.input.kind()
    }

    /// Time elapsed since submission.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.submitted_at.elapsed()
    }

    /// Deliver a result directly, bypassing batching.
    ///
    /// Returns `false` if the caller already dropped its receiver.
    pub fn resolve(self, result: EmbeddingResult<EmbeddingVector>) -> bool {
        let delivered = self.response_tx.send(result).is_ok();
        if !delivered {
            tracing::debug!(request_id = %self.id, "caller dropped before result delivery");
        }
        delivered
    }
}
