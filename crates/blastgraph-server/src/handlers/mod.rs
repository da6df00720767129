//! HTTP handler modules for the blastgraph API.
//!
//! Each sub-module implements thin handlers that parse requests, acquire the
//! service lock, delegate to [`ImpactService`](crate::service::ImpactService),
//! and return JSON responses. No business logic lives in handlers.

pub mod impact;
pub mod ingest;
pub mod queries;
pub mod topology;

use axum::Json;

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
