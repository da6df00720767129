//! JSON graph fixtures.
//!
//! A [`GraphFixture`] describes a whole graph and is applied through the
//! ingestion contracts in dependency order, so a fixture can be loaded into
//! a non-empty store and replayed.

use serde::{Deserialize, Serialize};

use blastgraph_core::ArtifactRef;
use blastgraph_storage::GraphStore;

use crate::binding::{create_binding, BindingRequest};
use crate::error::ImpactError;
use crate::ingest;
use crate::topology::{create_inter_component_dependency, create_serves, upsert_endpoint, EndpointRef};
use crate::vulnerability::create_vulnerability;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryFixture {
    #[serde(flatten)]
    pub library: ArtifactRef,
    #[serde(default)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFixture {
    pub caller: String,
    pub callees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostingFixture {
    pub component: ArtifactRef,
    pub asset: ArtifactRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServesFixture {
    pub endpoint: EndpointRef,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFixture {
    pub caller: EndpointRef,
    pub callees: Vec<EndpointRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFixture {
    pub name: String,
    #[serde(default)]
    pub components: Vec<ArtifactRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityFixture {
    #[serde(default)]
    pub identity: Option<String>,
    pub symbol: String,
}

/// A complete graph description. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphFixture {
    pub symbols: Vec<String>,
    pub libraries: Vec<LibraryFixture>,
    pub calls: Vec<CallFixture>,
    pub components: Vec<ArtifactRef>,
    pub assets: Vec<ArtifactRef>,
    pub hosting: Vec<HostingFixture>,
    pub endpoints: Vec<EndpointRef>,
    pub serves: Vec<ServesFixture>,
    pub network: Vec<NetworkFixture>,
    pub bindings: Vec<BindingRequest>,
    pub systems: Vec<SystemFixture>,
    /// Registered last; each one marks its symbol.
    pub vulnerabilities: Vec<VulnerabilityFixture>,
}

impl GraphFixture {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Counts of what a fixture load touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Applies `fixture` through the ingestion contracts. Stops on the first
/// error; everything applied before it stays.
pub fn load_fixture<S: GraphStore>(
    store: &mut S,
    fixture: &GraphFixture,
) -> Result<FixtureSummary, ImpactError> {
    for symbol in &fixture.symbols {
        ingest::upsert_symbol(store, symbol)?;
    }
    for library in &fixture.libraries {
        ingest::upsert_library(store, &library.library, &library.symbols)?;
    }
    for call in &fixture.calls {
        ingest::add_call_graph_dependencies(store, &call.caller, &call.callees)?;
    }
    for component in &fixture.components {
        ingest::upsert_component(store, component)?;
    }
    for asset in &fixture.assets {
        ingest::upsert_asset(store, asset)?;
    }
    for hosting in &fixture.hosting {
        ingest::host_component(store, &hosting.component, &hosting.asset)?;
    }
    for endpoint in &fixture.endpoints {
        upsert_endpoint(store, endpoint)?;
    }
    for serves in &fixture.serves {
        create_serves(store, &serves.endpoint, &serves.symbol)?;
    }
    for network in &fixture.network {
        create_inter_component_dependency(store, &network.caller, &network.callees)?;
    }
    for binding in &fixture.bindings {
        create_binding(store, binding)?;
    }
    for system in &fixture.systems {
        ingest::upsert_system(store, &system.name, &system.components)?;
    }
    for vulnerability in &fixture.vulnerabilities {
        create_vulnerability(store, vulnerability.identity.as_deref(), &vulnerability.symbol)?;
    }

    let graph = store.load_graph()?;
    let summary = FixtureSummary {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
    };
    tracing::info!(nodes = summary.nodes, edges = summary.edges, "fixture loaded");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastgraph_core::NodeKind;
    use blastgraph_storage::InMemoryStore;

    const SAMPLE: &str = r#"{
        "libraries": [{"name": "L", "version": "1.0", "symbols": ["f", "g"]}],
        "calls": [{"caller": "f", "callees": ["g"]}],
        "components": [{"name": "api", "version": "2"}],
        "endpoints": [{"component": {"name": "api", "version": "2"}, "name": "/login"}],
        "serves": [{"endpoint": {"component": {"name": "api", "version": "2"}, "name": "/login"}, "symbol": "g"}],
        "bindings": [{"library": {"name": "L", "version": "1.0"}, "component": {"name": "api", "version": "2"}}],
        "vulnerabilities": [{"identity": "CVE-1", "symbol": "g"}]
    }"#;

    #[test]
    fn fixture_parses_with_missing_sections() {
        let fixture = GraphFixture::from_json(SAMPLE).unwrap();
        assert_eq!(fixture.libraries[0].library, ArtifactRef::new("L", "1.0"));
        assert!(fixture.assets.is_empty());
        assert_eq!(fixture.vulnerabilities[0].identity.as_deref(), Some("CVE-1"));
    }

    #[test]
    fn loading_twice_is_stable() {
        let fixture = GraphFixture::from_json(SAMPLE).unwrap();
        let mut store = InMemoryStore::new();
        let first = load_fixture(&mut store, &fixture).unwrap();
        let second = load_fixture(&mut store, &fixture).unwrap();

        assert_eq!(first, second);
        // L, f, g, cgd, api, /login, binding, vulnerability
        assert_eq!(first.nodes, 8);
        assert_eq!(store.marked_nodes(NodeKind::Symbol).unwrap().len(), 1);
    }
}
