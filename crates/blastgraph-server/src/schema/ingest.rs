//! Request types for the ingestion endpoints.

use serde::{Deserialize, Serialize};

use blastgraph_core::ArtifactRef;

pub use blastgraph_impact::fixture::{FixtureSummary, GraphFixture};
pub use blastgraph_impact::ingest::LibraryUpsert;
pub use blastgraph_impact::DependencyLink;

/// `POST /libraries`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryRequest {
    #[serde(flatten)]
    pub library: ArtifactRef,
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// `POST /systems`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemRequest {
    pub name: String,
    #[serde(default)]
    pub components: Vec<ArtifactRef>,
}

/// `POST /hosting`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostingRequest {
    pub component: ArtifactRef,
    pub asset: ArtifactRef,
}

/// `POST /dependencies/call-graph`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphRequest {
    pub caller: String,
    pub callees: Vec<String>,
}
