//! Batch formation loop.
//!
//! # State Machine
//!
//! ```text
//!            first request                 size == max or deadline
//!   Idle ───────────────────► Collecting ─────────────────────────► Dispatching
//!    ▲    deadline = now + T                                            │
//!    └──────────────────────────── spawn dispatch task ─────────────────┘
//! ```
//!
//! The deadline is fixed by the first request of a cycle; later arrivals never
//! extend it. Dispatch runs on its own task so the next cycle is not
//! serialized behind the model call.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::batch::{AdmissionReceiver, Batch, BatchRequest, Dequeued};
use crate::config::BatchConfig;
use crate::types::RequestKind;

use super::dispatcher::BatchDispatcher;

/// How a collection cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleEnd {
    /// Batch full or deadline reached; keep forming.
    Continue,
    /// Cancellation arrived mid-collection.
    Cancelled,
    /// Every producer is gone.
    Closed,
}

/// Background task that turns the admission queue into batches.
pub(crate) struct BatchFormer {
    config: BatchConfig,
    dispatcher: BatchDispatcher,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl BatchFormer {
    pub(crate) fn new(
        config: BatchConfig,
        dispatcher: BatchDispatcher,
        cancel: CancellationToken,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            config,
            dispatcher,
            cancel,
            tracker,
        }
    }

    /// Run until cancelled or the queue closes.
    ///
    /// Hands the receiver back so the owner can drain what is left and
    /// restart the loop later.
    pub(crate) async fn run(self, mut rx: AdmissionReceiver) -> AdmissionReceiver {
        tracing::info!(
            max_batch_size = self.config.max_batch_size,
            batch_timeout_ms = self.config.batch_timeout_ms,
            "Batch former started"
        );

        loop {
            // Idle
            let first = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = rx.dequeue() => match next {
                    Some(request) => request,
                    None => {
                        tracing::warn!("Admission queue closed, batch former exiting");
                        break;
                    }
                },
            };

            // Collecting
            let (batch, end) = self.collect(first, &mut rx).await;

            // Dispatching
            self.spawn_dispatch(batch);

            match end {
                CycleEnd::Continue => {}
                CycleEnd::Cancelled => break,
                CycleEnd::Closed => {
                    tracing::warn!("Admission queue closed, batch former exiting");
                    break;
                }
            }
        }

        tracing::info!(queued = rx.depth(), "Batch former stopped");
        rx
    }

    async fn collect(&self, first: BatchRequest, rx: &mut AdmissionReceiver) -> (Batch, CycleEnd) {
        let deadline = Instant::now() + self.config.batch_timeout();
        let mut batch = Batch::with_capacity(self.config.max_batch_size);
        batch.push(first);

        while batch.len() < self.config.max_batch_size {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return (batch, CycleEnd::Cancelled),
                next = rx.dequeue_until(deadline) => match next {
                    Dequeued::Item(request) => batch.push(request),
                    Dequeued::TimedOut => break,
                    Dequeued::Closed => return (batch, CycleEnd::Closed),
                },
            }
        }

        (batch, CycleEnd::Continue)
    }

    fn spawn_dispatch(&self, batch: Batch) {
        let size = batch.len();
        let wait_us = batch.avg_wait_us();
        self.dispatcher.stats().record_batch(size, wait_us);

        tracing::debug!(
            batch_id = %batch.id,
            size,
            images = batch.count_of(RequestKind::Image),
            texts = batch.count_of(RequestKind::Text),
            avg_wait_us = wait_us,
            "Batch formed"
        );

        let dispatcher = self.dispatcher.clone();
        self.tracker.spawn(async move {
            dispatcher.dispatch(batch).await;
        });
    }
}
