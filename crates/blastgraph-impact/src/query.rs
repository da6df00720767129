//! Read-side queries over the graph and its marks.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use blastgraph_core::{to_mermaid, ArtifactRef, Node, NodeId, NodeKey, NodeKind, Relation};
use blastgraph_storage::GraphStore;

use crate::error::ImpactError;
use crate::topology::find_artifact;

/// Ids of every marked node of `kind`.
pub fn marked<S: GraphStore>(store: &S, kind: NodeKind) -> Result<Vec<NodeId>, ImpactError> {
    Ok(store.marked_nodes(kind)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkedNode {
    pub id: NodeId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindGroup {
    pub kind: NodeKind,
    pub nodes: Vec<MarkedNode>,
}

/// Every marked node, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlastRadius {
    pub total: usize,
    /// Non-empty groups only, in layer order.
    pub groups: Vec<KindGroup>,
}

impl BlastRadius {
    pub fn count(&self, kind: NodeKind) -> usize {
        self.groups
            .iter()
            .find(|g| g.kind == kind)
            .map_or(0, |g| g.nodes.len())
    }
}

pub fn blast_radius<S: GraphStore>(store: &S) -> Result<BlastRadius, ImpactError> {
    let mut radius = BlastRadius::default();
    for kind in NodeKind::ALL {
        let mut nodes = Vec::new();
        for id in store.marked_nodes(kind)? {
            let label = store.get_node(id)?.display_label();
            nodes.push(MarkedNode { id, label });
        }
        if !nodes.is_empty() {
            radius.total += nodes.len();
            radius.groups.push(KindGroup { kind, nodes });
        }
    }
    Ok(radius)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryView {
    pub id: NodeId,
    pub library: ArtifactRef,
    pub symbols: Vec<String>,
    pub marked: bool,
}

/// A library and the symbols it provides.
pub fn library<S: GraphStore>(store: &S, library: &ArtifactRef) -> Result<LibraryView, ImpactError> {
    let id = find_artifact(store, NodeKey::Library(library.clone()))?;
    let mut symbols = Vec::new();
    for symbol in store.targets(id, Relation::Provides)? {
        if let Node::Symbol { identity } = store.get_node(symbol)? {
            symbols.push(identity);
        }
    }
    symbols.sort();
    Ok(LibraryView {
        id,
        library: library.clone(),
        symbols,
        marked: store.is_marked(id)?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentView {
    pub id: NodeId,
    pub component: ArtifactRef,
    pub endpoints: Vec<String>,
    pub hosts: Vec<ArtifactRef>,
    pub marked: bool,
}

/// A component with its exposed endpoints and hosting assets.
pub fn component<S: GraphStore>(
    store: &S,
    component: &ArtifactRef,
) -> Result<ComponentView, ImpactError> {
    let id = find_artifact(store, NodeKey::Component(component.clone()))?;
    let mut endpoints = Vec::new();
    for endpoint in store.sources(id, Relation::Exposes)? {
        if let Node::Endpoint { name, .. } = store.get_node(endpoint)? {
            endpoints.push(name);
        }
    }
    endpoints.sort();
    let mut hosts = Vec::new();
    for asset in store.targets(id, Relation::HostedBy)? {
        if let Node::Asset(artifact) = store.get_node(asset)? {
            hosts.push(artifact);
        }
    }
    hosts.sort();
    Ok(ComponentView {
        id,
        component: component.clone(),
        endpoints,
        hosts,
        marked: store.is_marked(id)?,
    })
}

/// Identities of the symbols `symbol` calls.
pub fn callees<S: GraphStore>(store: &S, symbol: &str) -> Result<Vec<String>, ImpactError> {
    let id = store
        .find_node(&NodeKey::symbol(symbol))?
        .ok_or_else(|| ImpactError::not_found(NodeKind::Symbol, symbol))?;
    let mut out = Vec::new();
    for dependency in store.sources(id, Relation::Caller)? {
        for callee in store.targets(dependency, Relation::Callees)? {
            if let Node::Symbol { identity } = store.get_node(callee)? {
                out.push(identity);
            }
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

/// Clears every mark, returning how many were set.
pub fn reset_marks<S: GraphStore>(store: &mut S) -> Result<usize, ImpactError> {
    let cleared = store.clear_marks()?;
    tracing::info!(cleared, "marks cleared");
    Ok(cleared)
}

/// Deletes the whole graph.
pub fn reset<S: GraphStore>(store: &mut S) -> Result<(), ImpactError> {
    store.reset()?;
    tracing::info!("graph reset");
    Ok(())
}

/// A group of node kinds fed by one ingestion source, reset together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Libraries, their symbols and call-graph dependencies.
    CallGraph,
    /// Components, endpoints and inter-component dependencies.
    Topology,
    /// Hosting assets.
    Assets,
}

impl Domain {
    pub fn kinds(&self) -> &'static [NodeKind] {
        match self {
            Domain::CallGraph => &[
                NodeKind::Library,
                NodeKind::Symbol,
                NodeKind::CallGraphDependency,
            ],
            Domain::Topology => &[
                NodeKind::Component,
                NodeKind::Endpoint,
                NodeKind::InterComponentDependency,
            ],
            Domain::Assets => &[NodeKind::Asset],
        }
    }
}

impl FromStr for Domain {
    type Err = ImpactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "call_graph" | "call-graph" => Ok(Domain::CallGraph),
            "topology" => Ok(Domain::Topology),
            "assets" => Ok(Domain::Assets),
            other => Err(ImpactError::invalid(format!("unknown domain: {other}"))),
        }
    }
}

/// Per-kind counts of nodes removed by [`reset_kinds`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovedNodes {
    pub removed: Vec<(NodeKind, usize)>,
    pub total: usize,
}

/// Deletes every node of the given kinds with their edges, in one
/// transaction.
///
/// Endpoints are keyed by their component, so removing components removes
/// their endpoints as well.
pub fn reset_kinds<S: GraphStore>(store: &mut S, kinds: &[NodeKind]) -> Result<RemovedNodes, ImpactError> {
    let mut kinds = kinds.to_vec();
    if kinds.contains(&NodeKind::Component) && !kinds.contains(&NodeKind::Endpoint) {
        kinds.push(NodeKind::Endpoint);
    }
    let removed = store.atomically(|s| {
        let mut removed = Vec::with_capacity(kinds.len());
        for kind in &kinds {
            removed.push((*kind, s.remove_nodes_of_kind(*kind)?));
        }
        Ok(removed)
    })?;
    let total = removed.iter().map(|(_, n)| n).sum();
    tracing::info!(kinds = ?kinds, total, "node kinds reset");
    Ok(RemovedNodes { removed, total })
}

/// Deletes the node kinds of one ingestion domain.
pub fn reset_domain<S: GraphStore>(store: &mut S, domain: Domain) -> Result<RemovedNodes, ImpactError> {
    reset_kinds(store, domain.kinds())
}

/// The whole graph as a Mermaid flowchart, marked nodes highlighted.
pub fn export_mermaid<S: GraphStore>(store: &S) -> Result<String, ImpactError> {
    Ok(to_mermaid(&store.load_graph()?))
}
