//! Traits at the boundary between the scheduler and the model.

mod backend;

pub use backend::EmbeddingBackend;
