//! Ingestion handlers: libraries, components, assets, systems, hosting,
//! call graphs and whole-graph fixtures.

use axum::extract::State;
use axum::Json;

use blastgraph_core::ArtifactRef;

use crate::error::ApiError;
use crate::schema::common::{CreatedResponse, IdResponse};
use crate::schema::ingest::{
    CallGraphRequest, DependencyLink, FixtureSummary, GraphFixture, HostingRequest,
    LibraryRequest, LibraryUpsert, SystemRequest,
};
use crate::state::AppState;

/// `POST /libraries`
pub async fn upsert_library(
    State(state): State<AppState>,
    Json(req): Json<LibraryRequest>,
) -> Result<Json<LibraryUpsert>, ApiError> {
    let mut service = state.service.lock().await;
    Ok(Json(service.upsert_library(&req)?))
}

/// `POST /components`
pub async fn upsert_component(
    State(state): State<AppState>,
    Json(req): Json<ArtifactRef>,
) -> Result<Json<IdResponse>, ApiError> {
    let mut service = state.service.lock().await;
    let id = service.upsert_component(&req)?;
    Ok(Json(IdResponse { id }))
}

/// `POST /assets`
pub async fn upsert_asset(
    State(state): State<AppState>,
    Json(req): Json<ArtifactRef>,
) -> Result<Json<IdResponse>, ApiError> {
    let mut service = state.service.lock().await;
    let id = service.upsert_asset(&req)?;
    Ok(Json(IdResponse { id }))
}

/// `POST /systems`
pub async fn upsert_system(
    State(state): State<AppState>,
    Json(req): Json<SystemRequest>,
) -> Result<Json<IdResponse>, ApiError> {
    let mut service = state.service.lock().await;
    let id = service.upsert_system(&req)?;
    Ok(Json(IdResponse { id }))
}

/// `POST /hosting`
pub async fn host_component(
    State(state): State<AppState>,
    Json(req): Json<HostingRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let mut service = state.service.lock().await;
    let created = service.host_component(&req)?;
    Ok(Json(CreatedResponse { created }))
}

/// `POST /dependencies/call-graph`
pub async fn add_call_graph_dependencies(
    State(state): State<AppState>,
    Json(req): Json<CallGraphRequest>,
) -> Result<Json<DependencyLink>, ApiError> {
    let mut service = state.service.lock().await;
    Ok(Json(service.add_call_graph_dependencies(&req)?))
}

/// `POST /fixtures`
pub async fn load_fixture(
    State(state): State<AppState>,
    Json(fixture): Json<GraphFixture>,
) -> Result<Json<FixtureSummary>, ApiError> {
    let mut service = state.service.lock().await;
    Ok(Json(service.load_fixture(&fixture)?))
}
