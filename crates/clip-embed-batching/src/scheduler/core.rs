//! Scheduler core: construction, lifecycle and query methods.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::batch::{
    admission_queue, AdmissionQueue, AdmissionReceiver, SchedulerStats, SchedulerStatsSummary,
};
use crate::config::BatchConfig;
use crate::error::{EmbeddingError, EmbeddingResult};
use crate::traits::EmbeddingBackend;

use super::dispatcher::BatchDispatcher;
use super::former::BatchFormer;

// ============================================================================
// SCHEDULER
// ============================================================================

/// Dynamic-batching scheduler in front of one embedding backend.
///
/// Concurrent callers [`submit`](Self::submit) single inputs; a background
/// task groups them into batches of at most `max_batch_size`, waiting at most
/// `batch_timeout_ms` after the first request of each batch, and each batch
/// is embedded with one backend call per request kind.
///
/// # Lifecycle
/// 1. Create with `new()` - validates the configuration
/// 2. `start()` - spawns the batch former (requires a Tokio runtime)
/// 3. Submit requests with `submit()`, `embed_image()` or `embed_text()`
/// 4. `stop()` - cancels formation, fails still-queued requests with
///    `ShuttingDown` and waits for in-flight batches
///
/// A stopped scheduler can be started again.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use clip_embed_batching::{BatchConfig, Scheduler, StubEmbeddingBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = Arc::new(StubEmbeddingBackend::new("stub-clip", 512));
/// let scheduler = Scheduler::new(BatchConfig::default(), backend)?;
/// scheduler.start()?;
///
/// let vector = scheduler.embed_text("a photo of a dog").await?;
/// assert_eq!(vector.len(), 512);
///
/// scheduler.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Scheduler {
    pub(crate) config: BatchConfig,

    /// Producer half of the admission queue.
    pub(crate) queue: AdmissionQueue,

    /// Consumer half, parked here while the former is not running.
    pub(crate) receiver: Mutex<Option<AdmissionReceiver>>,

    /// Former task handle; resolves to the consumer half when the loop exits.
    pub(crate) former_handle: Mutex<Option<JoinHandle<AdmissionReceiver>>>,

    /// Admission gate. Held for reading across the running check and the
    /// enqueue in `submit`, so `stop` never misses a request.
    pub(crate) running: RwLock<bool>,

    /// Cancellation for the current run; replaced on every `start`.
    pub(crate) cancel: Mutex<CancellationToken>,

    /// In-flight dispatch tasks.
    pub(crate) tracker: TaskTracker,

    /// Serializes `stop`; a concurrent caller waits for the drain in progress.
    pub(crate) stopping: AsyncMutex<()>,

    pub(crate) dispatcher: BatchDispatcher,

    pub(crate) stats: Arc<SchedulerStats>,
}

impl Scheduler {
    /// Create a stopped scheduler.
    ///
    /// # Errors
    /// * `EmbeddingError::ConfigError` if config is invalid
    pub fn new(config: BatchConfig, backend: Arc<dyn EmbeddingBackend>) -> EmbeddingResult<Self> {
        config.validate()?;

        let (queue, receiver) = admission_queue();
        let stats = Arc::new(SchedulerStats::default());
        let dispatcher = BatchDispatcher::new(backend, stats.clone());

        Ok(Self {
            config,
            queue,
            receiver: Mutex::new(Some(receiver)),
            former_handle: Mutex::new(None),
            running: RwLock::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            tracker: TaskTracker::new(),
            stopping: AsyncMutex::new(()),
            dispatcher,
            stats,
        })
    }

    // ========================================================================
    // LIFECYCLE METHODS
    // ========================================================================

    /// Spawn the batch former. A no-op if it is already running.
    ///
    /// # Errors
    /// * `EmbeddingError::AdmissionError` if the admission queue's consumer
    ///   was lost (a previous former task panicked, or `stop` is still
    ///   in progress)
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) -> EmbeddingResult<()> {
        let mut running = self.running.write();
        if *running {
            tracing::debug!("Scheduler already running");
            return Ok(());
        }

        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or_else(|| EmbeddingError::AdmissionError {
                message: "admission queue consumer is unavailable".to_string(),
            })?;

        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();
        self.tracker.reopen();

        let former = BatchFormer::new(
            self.config.clone(),
            self.dispatcher.clone(),
            cancel,
            self.tracker.clone(),
        );
        *self.former_handle.lock() = Some(tokio::spawn(former.run(receiver)));
        *running = true;

        tracing::info!(
            model = self.model_name(),
            max_batch_size = self.config.max_batch_size,
            batch_timeout_ms = self.config.batch_timeout_ms,
            "Scheduler started"
        );
        Ok(())
    }

    /// Stop the batch former and wait for in-flight batches.
    ///
    /// After `stop` returns:
    /// 1. `submit` returns `NotRunning`
    /// 2. A batch that was being collected has been dispatched
    /// 3. Requests still in the queue have received `ShuttingDown`
    /// 4. Every dispatched batch has delivered its results
    ///
    /// A no-op if the scheduler is not running. A call that overlaps
    /// another `stop` returns only after that one has finished.
    pub async fn stop(&self) {
        let _stopping = self.stopping.lock().await;
        {
            let mut running = self.running.write();
            if !*running {
                tracing::debug!("Scheduler already stopped");
                return;
            }
            *running = false;
        }

        self.cancel.lock().cancel();

        let handle = self.former_handle.lock().take();
        if let Some(handle) = handle {
            match handle.await {
                Ok(mut receiver) => {
                    let pending = receiver.drain_pending();
                    if !pending.is_empty() {
                        tracing::warn!(
                            count = pending.len(),
                            "Failing requests still queued at shutdown"
                        );
                        self.stats.record_outcomes(0, pending.len());
                    }
                    for request in pending {
                        request.resolve(Err(EmbeddingError::ShuttingDown));
                    }
                    *self.receiver.lock() = Some(receiver);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Batch former task failed; scheduler cannot restart");
                }
            }
        }

        self.tracker.close();
        self.tracker.wait().await;

        tracing::info!("Scheduler stopped");
    }

    // ========================================================================
    // QUERY METHODS
    // ========================================================================

    /// Check if the batch former is running.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Name of the model behind the backend.
    #[inline]
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.dispatcher.backend().model_name()
    }

    /// Output dimension of the backend.
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dispatcher.backend().dimension()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Current statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> SchedulerStatsSummary {
        let mut summary = self.stats.summary();
        summary.queue_depth = self.queue.depth();
        summary
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Cannot await in Drop; cancellation lets the former dispatch any
        // partial batch and exit on its own.
        self.cancel.lock().cancel();
        if self.former_handle.lock().is_some() {
            tracing::debug!("Scheduler dropped while running; batch former cancelled");
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("model", &self.model_name())
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("queue_depth", &self.queue.depth())
            .finish()
    }
}
