//! HTTP routes.
//!
//! | Endpoint | Method | Request | Response |
//! |----------|--------|---------|----------|
//! | `/health` | GET | - | `{"status", "model"}` |
//! | `/embed_image` | POST | `{"image": <base64>}` | `{"embedding"}` |
//! | `/embed_text` | POST | `{"text"}` | `{"embedding"}` |
//! | `/embed_texts_batch` | POST | `{"texts": [..]}` | `{"embeddings"}` |
//!
//! `/embed_image` and `/embed_text` go through the batching scheduler.
//! `/embed_texts_batch` calls the backend directly with the caller's list.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use clip_embed_batching::{DecodedImage, EmbeddingVector, ModelInput, Scheduler};

use crate::error::ApiError;

// ============================================================================
// STATE
// ============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    #[must_use]
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedImageRequest {
    /// Base64-encoded PNG, JPEG or WebP bytes.
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedTextRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedTextsBatchRequest {
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: EmbeddingVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    pub embeddings: Vec<EmbeddingVector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

// ============================================================================
// ROUTER
// ============================================================================

/// Build the router with all four endpoints.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use clip_embed_batching::{BatchConfig, Scheduler, StubEmbeddingBackend};
/// use clip_embed_server::routes::{create_router, AppState};
///
/// #[tokio::main]
/// async fn main() {
///     let backend = Arc::new(StubEmbeddingBackend::new("stub-clip", 512));
///     let scheduler = Arc::new(Scheduler::new(BatchConfig::default(), backend).unwrap());
///     scheduler.start().unwrap();
///
///     let router = create_router(AppState::new(scheduler));
///     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
///     axum::serve(listener, router).await.unwrap();
/// }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/embed_image", post(embed_image))
        .route("/embed_text", post(embed_text))
        .route("/embed_texts_batch", post(embed_texts_batch))
        .with_state(state)
}

// ============================================================================
// HANDLERS
// ============================================================================

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model: state.scheduler.model_name().to_string(),
    })
}

pub async fn embed_image(
    State(state): State<AppState>,
    payload: Result<Json<EmbedImageRequest>, JsonRejection>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    async {
        let Json(request) = payload?;
        let bytes = STANDARD.decode(request.image.as_bytes())?;
        let image = DecodedImage::from_encoded(&bytes)?;
        let embedding = state.scheduler.embed_image(image).await?;
        Ok::<_, ApiError>(Json(EmbeddingResponse { embedding }))
    }
    .await
    .map_err(|e| e.logged("embed_image"))
}

pub async fn embed_text(
    State(state): State<AppState>,
    payload: Result<Json<EmbedTextRequest>, JsonRejection>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    async {
        let Json(request) = payload?;
        let embedding = state.scheduler.embed_text(request.text).await?;
        Ok::<_, ApiError>(Json(EmbeddingResponse { embedding }))
    }
    .await
    .map_err(|e| e.logged("embed_text"))
}

pub async fn embed_texts_batch(
    State(state): State<AppState>,
    payload: Result<Json<EmbedTextsBatchRequest>, JsonRejection>,
) -> Result<Json<EmbeddingsResponse>, ApiError> {
    async {
        let Json(request) = payload?;
        let inputs = request.texts.into_iter().map(ModelInput::Text).collect();
        let embeddings = state.scheduler.embed_batch_now(inputs).await?;
        Ok::<_, ApiError>(Json(EmbeddingsResponse { embeddings }))
    }
    .await
    .map_err(|e| e.logged("embed_texts_batch"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use clip_embed_batching::{BatchConfig, EmbeddingBackend, StubEmbeddingBackend};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    use super::*;
    use crate::error::ErrorResponse;

    fn test_state() -> (AppState, Arc<StubEmbeddingBackend>) {
        let backend = Arc::new(StubEmbeddingBackend::new("stub-clip", 32));
        let scheduler = Arc::new(Scheduler::new(BatchConfig::new(8, 5), backend.clone()).unwrap());
        scheduler.start().unwrap();
        (AppState::new(scheduler), backend)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn png_base64() -> String {
        let img = RgbImage::from_fn(4, 4, |x, y| image::Rgb([x as u8 * 40, y as u8 * 40, 90]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        STANDARD.encode(bytes.into_inner())
    }

    #[tokio::test]
    async fn test_health_reports_model() {
        let (state, _) = test_state();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = create_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: HealthResponse = read_json(response).await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.model, "stub-clip");
    }

    #[tokio::test]
    async fn test_embed_text_returns_backend_vector() {
        let (state, backend) = test_state();

        let response = create_router(state)
            .oneshot(post_json("/embed_text", serde_json::json!({"text": "a red car"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: EmbeddingResponse = read_json(response).await;
        let expected = backend.embed_texts(&["a red car".to_string()]).await.unwrap();
        assert_eq!(body.embedding, expected[0]);
    }

    #[tokio::test]
    async fn test_embed_image_decodes_base64_png() {
        let (state, _) = test_state();

        let response = create_router(state)
            .oneshot(post_json(
                "/embed_image",
                serde_json::json!({ "image": png_base64() }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: EmbeddingResponse = read_json(response).await;
        assert_eq!(body.embedding.len(), 32);
    }

    #[tokio::test]
    async fn test_embed_image_bad_base64_is_500() {
        let (state, _) = test_state();

        let response = create_router(state)
            .oneshot(post_json(
                "/embed_image",
                serde_json::json!({"image": "not base64!!"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = read_json(response).await;
        assert!(body.error.contains("base64"), "got: {}", body.error);
    }

    #[tokio::test]
    async fn test_embed_image_undecodable_bytes_is_500() {
        let (state, _) = test_state();
        let garbage = STANDARD.encode(b"definitely not an image");

        let response = create_router(state)
            .oneshot(post_json("/embed_image", serde_json::json!({ "image": garbage })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = read_json(response).await;
        assert!(body.error.starts_with("Invalid image"), "got: {}", body.error);
    }

    #[tokio::test]
    async fn test_missing_field_is_500_with_error_body() {
        let (state, _) = test_state();

        let response = create_router(state)
            .oneshot(post_json("/embed_text", serde_json::json!({"txt": "typo"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = read_json(response).await;
        assert!(body.error.starts_with("Invalid request body"), "got: {}", body.error);
    }

    #[tokio::test]
    async fn test_embed_texts_batch_preserves_order() {
        let (state, backend) = test_state();
        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];

        let response = create_router(state.clone())
            .oneshot(post_json(
                "/embed_texts_batch",
                serde_json::json!({ "texts": texts }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: EmbeddingsResponse = read_json(response).await;
        assert_eq!(body.embeddings, backend.embed_texts(&texts).await.unwrap());
        assert_eq!(state.scheduler.stats().batches_formed, 0, "bypasses the queue");
    }

    #[tokio::test]
    async fn test_embed_texts_batch_empty_list() {
        let (state, _) = test_state();

        let response = create_router(state)
            .oneshot(post_json("/embed_texts_batch", serde_json::json!({"texts": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: EmbeddingsResponse = read_json(response).await;
        assert!(body.embeddings.is_empty());
    }

    #[tokio::test]
    async fn test_embed_text_after_stop_is_500() {
        let (state, _) = test_state();
        state.scheduler.stop().await;

        let response = create_router(state)
            .oneshot(post_json("/embed_text", serde_json::json!({"text": "late"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.error, "Scheduler is not running");
    }
}
