//! Request, queue and batch types for dynamic batching.
//!
//! # Architecture
//!
//! ```text
//! Caller             AdmissionQueue          BatchFormer        BatchDispatcher
//!   |                      |                      |                    |
//!   |--BatchRequest-->  enqueue()                 |                    |
//!   |--BatchRequest-->  enqueue()                 |                    |
//!   |                      |--dequeue_until()---->|                    |
//!   |                      |                      |---Batch----------->|
//!   |                      |                      |        into_partitions()
//!   |                      |                      |          (one call per kind)
//!   |<----Result-----------+----------------------+------deliver()-----+
//! ```
//!
//! - **ASYNC NATIVE**: tokio oneshot channels carry each caller's result
//! - **EXACTLY ONCE**: completion senders are consumed on delivery
//! - **THREAD SAFE**: statistics use atomics for concurrent access

mod assembled;
mod queue;
mod request;
mod stats;


pub use assembled::{Batch, Completions, DeliveryReport, KindPartition};
pub use queue::{admission_queue, AdmissionQueue, AdmissionReceiver, Dequeued};
pub use request::{BatchRequest, CompletionReceiver, CompletionSender};
pub use stats::{SchedulerStats, SchedulerStatsSummary};
