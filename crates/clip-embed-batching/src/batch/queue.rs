//! Admission queue: unbounded FIFO, many producers, one consumer.
//!
//! Built on `tokio::sync::mpsc::unbounded_channel`, which gives FIFO order
//! across all producers without an explicit lock. `enqueue` never blocks and
//! never rejects while the consumer half is alive.
//!
//! There is no capacity bound. Under sustained overload memory grows with the
//! backlog; the queue depth is exported through [`AdmissionQueue::depth`] so
//! that growth is at least observable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{timeout_at, Instant};

use crate::error::{EmbeddingError, EmbeddingResult};

use super::request::BatchRequest;

/// Create a connected producer/consumer pair.
#[must_use]
pub fn admission_queue() -> (AdmissionQueue, AdmissionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        AdmissionQueue {
            tx,
            depth: depth.clone(),
        },
        AdmissionReceiver { rx, depth },
    )
}

// ============================================================================
// PRODUCER
// ============================================================================

/// Producer half. Cheap to clone; every clone feeds the same FIFO.
#[derive(Debug, Clone)]
pub struct AdmissionQueue {
    tx: mpsc::UnboundedSender<BatchRequest>,
    depth: Arc<AtomicUsize>,
}

impl AdmissionQueue {
    /// Push a request onto the tail of the queue.
    ///
    /// # Errors
    /// * `EmbeddingError::AdmissionError` if the consumer half has been dropped.
    ///   The rejected request is dropped, which closes its completion channel.
    pub fn enqueue(&self, request: BatchRequest) -> EmbeddingResult<()> {
        self.depth.fetch_add(1, Ordering::Relaxed);
        self.tx.send(request).map_err(|rejected| {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            tracing::error!(request_id = %rejected.0.id, "admission queue consumer is gone");
            EmbeddingError::AdmissionError {
                message: "admission queue is closed".to_string(),
            }
        })
    }

    /// Number of requests waiting to be batched.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// CONSUMER
// ============================================================================

/// Outcome of a deadline-bounded dequeue.
#[derive(Debug)]
pub enum Dequeued {
    /// A request was available before the deadline.
    Item(BatchRequest),
    /// The deadline passed with the queue empty.
    TimedOut,
    /// Every producer has been dropped and the queue is empty.
    Closed,
}

/// Consumer half, owned by the batch former.
#[derive(Debug)]
pub struct AdmissionReceiver {
    rx: mpsc::UnboundedReceiver<BatchRequest>,
    depth: Arc<AtomicUsize>,
}

impl AdmissionReceiver {
    /// Wait until a request is available.
    ///
    /// Returns `None` once every producer is gone and the queue is drained.
    pub async fn dequeue(&mut self) -> Option<BatchRequest> {
        let request = self.rx.recv().await;
        if request.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        request
    }

    /// Wait for a request until `deadline`.
    ///
    /// A request that is already queued is returned even if the deadline has
    /// passed, so a backlog of at least `max_batch_size` always yields a full
    /// batch.
    pub async fn dequeue_until(&mut self, deadline: Instant) -> Dequeued {
        match self.rx.try_recv() {
            Ok(request) => {
                self.depth.fetch_sub(1, Ordering::Relaxed);
                return Dequeued::Item(request);
            }
            Err(TryRecvError::Disconnected) => return Dequeued::Closed,
            Err(TryRecvError::Empty) => {}
        }

        match timeout_at(deadline, self.rx.recv()).await {
            Ok(Some(request)) => {
                self.depth.fetch_sub(1, Ordering::Relaxed);
                Dequeued::Item(request)
            }
            Ok(None) => Dequeued::Closed,
            Err(_elapsed) => Dequeued::TimedOut,
        }
    }

    /// Remove every request currently queued, without waiting.
    pub fn drain_pending(&mut self) -> Vec<BatchRequest> {
        let mut drained = Vec::new();
        while let Ok(request) = self.rx.try_recv() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            drained.push(request);
        }
        drained
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}
