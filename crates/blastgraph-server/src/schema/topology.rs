//! Request types for endpoints, network dependencies and SERVES links.

use serde::{Deserialize, Serialize};

pub use blastgraph_impact::EndpointRef;

/// `POST /dependencies/network`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDependencyRequest {
    pub caller: EndpointRef,
    pub callees: Vec<EndpointRef>,
}

/// `POST /serves`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServesRequest {
    pub endpoint: EndpointRef,
    pub symbol: String,
}
