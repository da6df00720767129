//! Router assembly for the blastgraph HTTP API.
//!
//! [`build_router`] wires all handler functions to their routes with
//! CORS and tracing middleware layers.

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router with all API routes.
///
/// Routes use axum 0.8 `/{param}` path syntax.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Ingestion
        .route("/libraries", post(handlers::ingest::upsert_library))
        .route("/components", post(handlers::ingest::upsert_component))
        .route("/assets", post(handlers::ingest::upsert_asset))
        .route("/systems", post(handlers::ingest::upsert_system))
        .route("/hosting", post(handlers::ingest::host_component))
        .route(
            "/dependencies/call-graph",
            post(handlers::ingest::add_call_graph_dependencies),
        )
        .route("/fixtures", post(handlers::ingest::load_fixture))
        // Topology
        .route("/endpoints", post(handlers::topology::upsert_endpoint))
        .route(
            "/dependencies/network",
            post(handlers::topology::create_inter_component_dependency),
        )
        .route("/serves", post(handlers::topology::create_serves))
        // Impact
        .route("/bindings", post(handlers::impact::create_binding))
        .route(
            "/vulnerabilities",
            post(handlers::impact::create_vulnerability),
        )
        .route("/propagations", post(handlers::impact::run_propagation))
        .route("/marks", delete(handlers::impact::reset_marks))
        // Queries
        .route("/marked/{kind}", get(handlers::queries::marked))
        .route("/blast-radius", get(handlers::queries::blast_radius))
        .route(
            "/libraries/{name}/{version}",
            get(handlers::queries::library),
        )
        .route(
            "/components/{name}/{version}",
            get(handlers::queries::component),
        )
        .route(
            "/symbols/{identity}/callees",
            get(handlers::queries::callees),
        )
        .route("/export/mermaid", get(handlers::queries::export_mermaid))
        .route("/graph", delete(handlers::queries::reset_graph))
        .route("/graph/{domain}", delete(handlers::queries::reset_domain))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
