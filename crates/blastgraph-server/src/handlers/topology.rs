//! Endpoint, network-dependency and SERVES handlers.

use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::schema::common::{CreatedResponse, IdResponse};
use crate::schema::ingest::DependencyLink;
use crate::schema::topology::{EndpointRef, NetworkDependencyRequest, ServesRequest};
use crate::state::AppState;

/// `POST /endpoints`
pub async fn upsert_endpoint(
    State(state): State<AppState>,
    Json(req): Json<EndpointRef>,
) -> Result<Json<IdResponse>, ApiError> {
    let mut service = state.service.lock().await;
    let id = service.upsert_endpoint(&req)?;
    Ok(Json(IdResponse { id }))
}

/// Links a caller endpoint to its callees. Missing callees yield a 422 with
/// per-target details; the rest are linked.
///
/// `POST /dependencies/network`
pub async fn create_inter_component_dependency(
    State(state): State<AppState>,
    Json(req): Json<NetworkDependencyRequest>,
) -> Result<Json<DependencyLink>, ApiError> {
    let mut service = state.service.lock().await;
    Ok(Json(service.create_inter_component_dependency(&req)?))
}

/// `POST /serves`
pub async fn create_serves(
    State(state): State<AppState>,
    Json(req): Json<ServesRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let mut service = state.service.lock().await;
    let created = service.create_serves(&req)?;
    Ok(Json(CreatedResponse { created }))
}
