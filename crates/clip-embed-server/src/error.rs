//! HTTP error mapping.
//!
//! Every failure is answered with HTTP 500 and a `{"error": "..."}` body,
//! whether the caller sent a bad request or the backend failed.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use clip_embed_batching::EmbeddingError;

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failure of a single HTTP request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body was not valid JSON or lacked a required field.
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    /// `image` field was not valid base64.
    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Scheduler, backend or image decoding failure.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

impl ApiError {
    /// Log the failure against its endpoint and pass it through.
    #[must_use]
    pub fn logged(self, endpoint: &str) -> Self {
        tracing::error!(endpoint, error = %self, "Request failed");
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
