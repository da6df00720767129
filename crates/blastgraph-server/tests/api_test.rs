//! End-to-end tests for the blastgraph HTTP API.
//!
//! Requests go through the full stack (router, handler, service, impact
//! engine, SQLite) via `tower::ServiceExt::oneshot`, without starting a
//! network server.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use blastgraph_server::config::ServerConfig;
use blastgraph_server::router::build_router;
use blastgraph_server::state::AppState;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn test_app() -> Router {
    let state = AppState::in_memory().expect("failed to create in-memory AppState");
    build_router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or(json!(null));
    (status, json)
}

async fn post_json(app: &Router, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
    )
    .await
}

async fn get_json(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    send(app, Request::builder().uri(path).body(Body::empty()).unwrap()).await
}

async fn delete(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    send(
        app,
        Request::builder()
            .method("DELETE")
            .uri(path)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

fn art(name: &str) -> serde_json::Value {
    json!({"name": name, "version": "1"})
}

/// Library L provides g, f calls g, component C1 serves g on e1 and C2's e2
/// calls e1.
async fn seed_graph(app: &Router) {
    let (status, body) = post_json(app, "/libraries", json!({"name": "L", "version": "1", "symbols": ["f", "g"]})).await;
    assert_eq!(status, StatusCode::OK, "{body:?}");

    let (status, body) = post_json(app, "/dependencies/call-graph", json!({"caller": "f", "callees": ["g"]})).await;
    assert_eq!(status, StatusCode::OK, "{body:?}");
    assert_eq!(body["callees"].as_array().unwrap().len(), 1);

    for component in ["C1", "C2"] {
        let (status, _) = post_json(app, "/components", art(component)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = post_json(app, "/endpoints", json!({"component": art("C1"), "name": "e1"})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(app, "/endpoints", json!({"component": art("C2"), "name": "e2"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        app,
        "/serves",
        json!({"endpoint": {"component": art("C1"), "name": "e1"}, "symbol": "g"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], true);

    let (status, _) = post_json(
        app,
        "/dependencies/network",
        json!({
            "caller": {"component": art("C2"), "name": "e2"},
            "callees": [{"component": art("C1"), "name": "e1"}]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check() {
    let app = test_app();
    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn full_propagation_round_trip() {
    let app = test_app();
    seed_graph(&app).await;

    let (status, body) = post_json(&app, "/vulnerabilities", json!({"identity": "CVE-1", "symbol": "g"})).await;
    assert_eq!(status, StatusCode::OK, "{body:?}");
    assert_eq!(body["status"], "created");

    let (status, body) = post_json(&app, "/vulnerabilities", json!({"identity": "CVE-1", "symbol": "g"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "existing");

    let (status, report) = post_json(&app, "/propagations", json!({"identity": "CVE-1"})).await;
    assert_eq!(status, StatusCode::OK, "{report:?}");
    assert_eq!(report["stages"].as_array().unwrap().len(), 6);
    assert_eq!(report["rounds"], 1);

    let (status, marked) = get_json(&app, "/marked/symbol").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["nodes"].as_array().unwrap().len(), 2);

    let (_, radius) = get_json(&app, "/blast-radius").await;
    let groups = radius["groups"].as_array().unwrap();
    let kinds: Vec<&str> = groups.iter().map(|g| g["kind"].as_str().unwrap()).collect();
    assert!(kinds.contains(&"library"));
    assert!(kinds.contains(&"inter_component_dependency"));

    let (_, c1) = get_json(&app, "/components/C1/1").await;
    let (_, c2) = get_json(&app, "/components/C2/1").await;
    assert_eq!(c1["marked"], false);
    assert_eq!(c2["marked"], true);
    assert_eq!(c1["endpoints"], json!(["e1"]));

    let (status, cleared) = delete(&app, "/marks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["cleared"], report["total_marked"]);
}

#[tokio::test]
async fn structural_queries() {
    let app = test_app();
    seed_graph(&app).await;

    let (status, library) = get_json(&app, "/libraries/L/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(library["symbols"], json!(["f", "g"]));

    let (_, callees) = get_json(&app, "/symbols/f/callees").await;
    assert_eq!(callees["callees"], json!(["g"]));

    let app_response = app
        .clone()
        .oneshot(Request::builder().uri("/export/mermaid").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(app_response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(app_response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8(bytes.to_vec()).unwrap().starts_with("flowchart TD"));
}

#[tokio::test]
async fn bindings_are_deduplicated() {
    let app = test_app();
    seed_graph(&app).await;

    let request = json!({"library": art("L"), "component": art("C1")});
    let (status, first) = post_json(&app, "/bindings", request.clone()).await;
    assert_eq!(status, StatusCode::OK, "{first:?}");
    let (_, second) = post_json(&app, "/bindings", request).await;

    assert_eq!(first["created"], true);
    assert_eq!(second["created"], false);
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["library"]["name"], "L");
}

#[tokio::test]
async fn unknown_references_are_not_found() {
    let app = test_app();

    let (status, body) = post_json(&app, "/vulnerabilities", json!({"identity": "CVE-9", "symbol": "nope"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = post_json(&app, "/propagations", json!({"identity": "CVE-9"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = post_json(&app, "/endpoints", json!({"component": art("ghost"), "name": "e"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&app, "/libraries/ghost/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_callees_are_a_partial_failure() {
    let app = test_app();
    seed_graph(&app).await;

    let (status, body) = post_json(
        &app,
        "/dependencies/network",
        json!({
            "caller": {"component": art("C1"), "name": "e1"},
            "callees": [
                {"component": art("C2"), "name": "e2"},
                {"component": art("ghost"), "name": "e9"}
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "PARTIAL_FAILURE");
    assert_eq!(body["error"]["details"]["attempted"], 2);
    let failures = body["error"]["details"]["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0]["target"].as_str().unwrap().contains("ghost"));

    let (status, _) = get_json(&app, "/components/ghost/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the resolvable callee was still linked: a vulnerability served by e2
    // now reaches C1 through e1's dependency
    post_json(&app, "/libraries", json!({"name": "L", "version": "1", "symbols": ["h"]})).await;
    let (status, _) = post_json(
        &app,
        "/serves",
        json!({"endpoint": {"component": art("C2"), "name": "e2"}, "symbol": "h"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    post_json(&app, "/vulnerabilities", json!({"identity": "CVE-2", "symbol": "h"})).await;
    let (status, _) = post_json(&app, "/propagations", json!({"identity": "CVE-2"})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, c1) = get_json(&app, "/components/C1/1").await;
    assert_eq!(c1["marked"], true);
}

#[tokio::test]
async fn bad_requests() {
    let app = test_app();

    let (status, body) = get_json(&app, "/marked/widget").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = post_json(&app, "/libraries", json!({"name": "", "version": "1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_deadline_is_gateway_timeout() {
    let app = test_app();
    seed_graph(&app).await;
    post_json(&app, "/vulnerabilities", json!({"identity": "CVE-1", "symbol": "g"})).await;

    let (status, body) = post_json(&app, "/propagations", json!({"identity": "CVE-1", "deadline_ms": 0})).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["code"], "DEADLINE_EXCEEDED");

    // the seed mark persists
    let (_, marked) = get_json(&app, "/marked/symbol").await;
    assert_eq!(marked["nodes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn fixture_load_and_graph_reset() {
    let app = test_app();
    let (status, summary) = post_json(
        &app,
        "/fixtures",
        json!({
            "libraries": [{"name": "L", "version": "1", "symbols": ["g"]}],
            "components": [art("X")],
            "assets": [art("Y")],
            "hosting": [{"component": art("X"), "asset": art("Y")}],
            "bindings": [{"library": art("L"), "component": art("X")}],
            "vulnerabilities": [{"identity": "v1", "symbol": "g"}]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{summary:?}");
    assert_eq!(summary["nodes"], 6);

    let (_, report) = post_json(&app, "/propagations", json!({"identity": "v1", "converge": true})).await;
    assert!(report["rounds"].as_u64().unwrap() >= 2);
    let (_, assets) = get_json(&app, "/marked/asset").await;
    assert_eq!(assets["nodes"].as_array().unwrap().len(), 1);

    let (status, removed) = delete(&app, "/graph/assets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["total"], 1);
    let (status, _) = delete(&app, "/graph/widgets").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get_json(&app, "/components/X/1").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = delete(&app, "/graph").await;
    assert_eq!(status, StatusCode::OK);
    let (_, radius) = get_json(&app, "/blast-radius").await;
    assert_eq!(radius["total"], 0);
}

#[tokio::test]
async fn on_disk_state_is_shared_across_app_states() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        db_path: dir.path().join("api.db").to_str().unwrap().to_string(),
        ..ServerConfig::default()
    };

    {
        let app = build_router(AppState::new(&config).unwrap());
        seed_graph(&app).await;
    }

    let app = build_router(AppState::new(&config).unwrap());
    let (status, library) = get_json(&app, "/libraries/L/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(library["symbols"], json!(["f", "g"]));
}
