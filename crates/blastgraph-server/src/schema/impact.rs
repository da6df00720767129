//! Request/response types for bindings, vulnerabilities, propagation and
//! mark queries.

use serde::{Deserialize, Serialize};

use blastgraph_core::{NodeId, NodeKind};

pub use blastgraph_impact::query::{BlastRadius, ComponentView, Domain, LibraryView, RemovedNodes};
pub use blastgraph_impact::{Binding, BindingRequest, PropagationReport, Registration};

/// `POST /vulnerabilities`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityRequest {
    #[serde(default)]
    pub identity: Option<String>,
    pub symbol: String,
}

/// `POST /propagations`
///
/// Unset options fall back to the server's configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationRequest {
    /// Vulnerability to seed from, matched exactly.
    pub identity: Option<String>,
    /// Skip seeding and propagate from the current marks.
    pub from_current_marks: bool,
    pub converge: Option<bool>,
    pub deadline_ms: Option<u64>,
}

/// `GET /marked/{kind}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkedResponse {
    pub kind: NodeKind,
    pub nodes: Vec<NodeId>,
}

/// `DELETE /marks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetMarksResponse {
    pub cleared: usize,
}

/// `GET /symbols/{identity}/callees`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalleesResponse {
    pub symbol: String,
    pub callees: Vec<String>,
}
