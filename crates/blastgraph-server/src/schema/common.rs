//! Small response bodies shared by several endpoints.

use serde::{Deserialize, Serialize};

use blastgraph_core::{ArtifactRef, NodeId};

/// Response of an upsert that yields one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: NodeId,
}

/// Response of an edge-only upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    /// `false` when the edge already existed.
    pub created: bool,
}

/// `{name}/{version}` path segments naming an artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactPath {
    pub name: String,
    pub version: String,
}

impl From<ArtifactPath> for ArtifactRef {
    fn from(path: ArtifactPath) -> Self {
        ArtifactRef::new(path.name, path.version)
    }
}
