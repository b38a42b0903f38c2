//! End-to-end router tests: concurrent HTTP requests share batches.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use clip_embed_batching::{BatchConfig, EmbeddingBackend, Scheduler, StubEmbeddingBackend};
use clip_embed_server::routes::EmbeddingResponse;
use clip_embed_server::{create_router, AppState, ServerConfig};
use tower::ServiceExt;

fn embed_text_request(text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/embed_text")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "text": text }).to_string()))
        .unwrap()
}

async fn embedding_of(response: axum::response::Response) -> Vec<f32> {
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice::<EmbeddingResponse>(&bytes)
        .unwrap()
        .embedding
}

#[tokio::test(start_paused = true)]
async fn concurrent_text_requests_are_served_by_one_batch() {
    let backend = Arc::new(StubEmbeddingBackend::new("stub-clip", 16));
    let scheduler = Arc::new(Scheduler::new(BatchConfig::new(8, 50), backend.clone()).unwrap());
    scheduler.start().unwrap();
    let router = create_router(AppState::new(scheduler.clone()));

    let (a, b, c) = tokio::join!(
        router.clone().oneshot(embed_text_request("a")),
        router.clone().oneshot(embed_text_request("b")),
        router.clone().oneshot(embed_text_request("c")),
    );

    let expected = backend
        .embed_texts(&["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .unwrap();
    assert_eq!(embedding_of(a.unwrap()).await, expected[0]);
    assert_eq!(embedding_of(b.unwrap()).await, expected[1]);
    assert_eq!(embedding_of(c.unwrap()).await, expected[2]);

    let stats = scheduler.stats();
    println!("stats = {:?}", stats);
    assert_eq!(stats.batches_formed, 1);
    assert_eq!(stats.requests_completed, 3);
    assert!((stats.avg_batch_size - 3.0).abs() < f64::EPSILON);

    scheduler.stop().await;
}

#[tokio::test]
async fn router_built_from_default_config_serves_health() {
    let config = ServerConfig::default();
    let model = &config.embedding.model;
    let backend = Arc::new(StubEmbeddingBackend::new(
        model.model_name.clone(),
        model.dimension,
    ));
    let scheduler = Arc::new(Scheduler::new(config.embedding.batch.clone(), backend).unwrap());
    scheduler.start().unwrap();

    let response = create_router(AppState::new(scheduler.clone()))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "status": "healthy",
            "model": "laion/CLIP-ViT-B-32-laion2B-s34B-b79K"
        })
    );

    scheduler.stop().await;
}
