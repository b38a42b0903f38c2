//! HTTP server for batched CLIP embeddings.
//!
//! Wraps a [`clip_embed_batching::Scheduler`] in an axum router so that
//! concurrent `/embed_image` and `/embed_text` requests are batched before
//! they reach the model.

pub mod config;
pub mod error;
pub mod routes;

pub use config::{CliOverrides, HttpConfig, ServerConfig};
pub use error::{ApiError, ErrorResponse};
pub use routes::{create_router, AppState};
