//! Binding, vulnerability and propagation handlers.

use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::schema::impact::{
    Binding, BindingRequest, PropagationReport, PropagationRequest, Registration,
    ResetMarksResponse, VulnerabilityRequest,
};
use crate::state::AppState;

/// `POST /bindings`
pub async fn create_binding(
    State(state): State<AppState>,
    Json(req): Json<BindingRequest>,
) -> Result<Json<Binding>, ApiError> {
    let mut service = state.service.lock().await;
    Ok(Json(service.create_binding(&req)?))
}

/// `POST /vulnerabilities`
pub async fn create_vulnerability(
    State(state): State<AppState>,
    Json(req): Json<VulnerabilityRequest>,
) -> Result<Json<Registration>, ApiError> {
    let mut service = state.service.lock().await;
    Ok(Json(service.create_vulnerability(&req)?))
}

/// Runs a full propagation. The service lock is held for the whole run.
///
/// `POST /propagations`
pub async fn run_propagation(
    State(state): State<AppState>,
    Json(req): Json<PropagationRequest>,
) -> Result<Json<PropagationReport>, ApiError> {
    let mut service = state.service.lock().await;
    Ok(Json(service.run_propagation(&req)?))
}

/// `DELETE /marks`
pub async fn reset_marks(
    State(state): State<AppState>,
) -> Result<Json<ResetMarksResponse>, ApiError> {
    let mut service = state.service.lock().await;
    let cleared = service.reset_marks()?;
    Ok(Json(ResetMarksResponse { cleared }))
}
