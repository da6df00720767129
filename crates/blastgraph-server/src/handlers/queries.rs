//! Read-side handlers: marked nodes, blast radius, structural views and
//! Mermaid export.

use axum::extract::{Path, State};
use axum::Json;

use blastgraph_core::NodeKind;

use crate::error::ApiError;
use crate::schema::common::ArtifactPath;
use crate::schema::impact::{
    BlastRadius, CalleesResponse, ComponentView, Domain, LibraryView, MarkedResponse, RemovedNodes,
};
use crate::state::AppState;

/// `GET /marked/{kind}`
pub async fn marked(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<MarkedResponse>, ApiError> {
    let kind: NodeKind = kind
        .parse()
        .map_err(|e: blastgraph_core::CoreError| ApiError::BadRequest(e.to_string()))?;
    let service = state.service.lock().await;
    let nodes = service.marked(kind)?;
    Ok(Json(MarkedResponse { kind, nodes }))
}

/// `GET /blast-radius`
pub async fn blast_radius(
    State(state): State<AppState>,
) -> Result<Json<BlastRadius>, ApiError> {
    let service = state.service.lock().await;
    Ok(Json(service.blast_radius()?))
}

/// `GET /libraries/{name}/{version}`
pub async fn library(
    State(state): State<AppState>,
    Path(path): Path<ArtifactPath>,
) -> Result<Json<LibraryView>, ApiError> {
    let service = state.service.lock().await;
    Ok(Json(service.library(&path.into())?))
}

/// `GET /components/{name}/{version}`
pub async fn component(
    State(state): State<AppState>,
    Path(path): Path<ArtifactPath>,
) -> Result<Json<ComponentView>, ApiError> {
    let service = state.service.lock().await;
    Ok(Json(service.component(&path.into())?))
}

/// `GET /symbols/{identity}/callees`
pub async fn callees(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<CalleesResponse>, ApiError> {
    let service = state.service.lock().await;
    let callees = service.callees(&symbol)?;
    Ok(Json(CalleesResponse { symbol, callees }))
}

/// Returns the graph as Mermaid source, `text/plain`.
///
/// `GET /export/mermaid`
pub async fn export_mermaid(State(state): State<AppState>) -> Result<String, ApiError> {
    let service = state.service.lock().await;
    service.export_mermaid()
}

/// Deletes every node and edge.
///
/// `DELETE /graph`
pub async fn reset_graph(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut service = state.service.lock().await;
    service.reset()?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Deletes the nodes of one ingestion domain: `call-graph`, `topology` or
/// `assets`.
///
/// `DELETE /graph/{domain}`
pub async fn reset_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<RemovedNodes>, ApiError> {
    let domain: Domain = domain.parse()?;
    let mut service = state.service.lock().await;
    Ok(Json(service.reset_domain(domain)?))
}
