//! Dynamic-batching scheduler.
//!
//! # Architecture
//!
//! - **`Scheduler`**: owns the admission queue and the lifecycle; callers
//!   `submit` here
//! - **`BatchFormer`**: background task that groups queued requests into
//!   batches by size or deadline
//! - **`BatchDispatcher`**: embeds each batch with one backend call per kind
//!   and resolves every member
//!
//! One former task runs per started scheduler. Dispatches run on their own
//! tasks, tracked so `stop()` can wait for them, and may overlap.

mod core;
mod dispatcher;
mod former;
mod submit;


pub use self::core::Scheduler;
pub use self::dispatcher::BatchDispatcher;
