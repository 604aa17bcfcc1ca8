//! Readiness checks against Pinecone, Milvus and the embedding service.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};
use domain_search::{EmbeddingProvider, VectorStore};

use crate::state::AppState;

/// Runs the three upstream probes concurrently; 503 if any fails.
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![
        (
            "pinecone",
            Box::pin(async {
                state
                    .pinecone
                    .health_check()
                    .await
                    .map_err(|e| format!("Pinecone check failed: {}", e))
            }),
        ),
        (
            "milvus",
            Box::pin(async {
                state
                    .milvus
                    .health_check()
                    .await
                    .map_err(|e| format!("Milvus check failed: {}", e))
            }),
        ),
        (
            "embedding",
            Box::pin(async {
                state
                    .embedder
                    .embed("ready")
                    .await
                    .map(|_| ())
                    .map_err(|e| format!("Embedding check failed: {}", e))
            }),
        ),
    ];

    match run_health_checks(checks).await {
        Ok((status, json)) => (status, json).into_response(),
        Err((status, json)) => (status, json).into_response(),
    }
}
