//! Ingestion contracts called by the graph producers: code-analysis exports
//! (libraries, symbols, call graphs) and infrastructure exports
//! (components, assets, hosting, systems).
//!
//! Every operation is an upsert and can be replayed safely.

use serde::Serialize;

use blastgraph_core::{ArtifactRef, Node, NodeId, NodeKey, NodeKind, Relation};
use blastgraph_storage::GraphStore;

use crate::error::ImpactError;
use crate::outcome::Outcomes;
use crate::topology::{find_artifact, link_dependency, DependencyLink};

/// Result of [`upsert_library`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryUpsert {
    pub library: NodeId,
    /// Provided symbols, in request order.
    pub symbols: Vec<NodeId>,
}

fn require_artifact(artifact: &ArtifactRef, what: &str) -> Result<(), ImpactError> {
    if artifact.is_blank() {
        return Err(ImpactError::invalid(format!(
            "{what} needs a non-empty name and version"
        )));
    }
    Ok(())
}

/// Merges a library, each of its symbols, and the PROVIDES edges.
pub fn upsert_library<S: GraphStore>(
    store: &mut S,
    library: &ArtifactRef,
    symbols: &[String],
) -> Result<LibraryUpsert, ImpactError> {
    require_artifact(library, "library")?;
    if symbols.iter().any(String::is_empty) {
        return Err(ImpactError::invalid("symbol identity must not be empty"));
    }
    let node = Node::Library(library.clone());
    let result = store.atomically(|s| {
        let (library_id, _) = s.merge_node(&node)?;
        let mut ids = Vec::with_capacity(symbols.len());
        for identity in symbols {
            let (symbol_id, _) = s.merge_node(&Node::symbol(identity.as_str()))?;
            s.insert_edge(library_id, Relation::Provides, symbol_id)?;
            ids.push(symbol_id);
        }
        Ok(LibraryUpsert {
            library: library_id,
            symbols: ids,
        })
    })?;
    tracing::debug!(library = %library, symbols = symbols.len(), "library upserted");
    Ok(result)
}

/// Merges a standalone symbol.
pub fn upsert_symbol<S: GraphStore>(store: &mut S, identity: &str) -> Result<NodeId, ImpactError> {
    if identity.is_empty() {
        return Err(ImpactError::invalid("symbol identity must not be empty"));
    }
    Ok(store.merge_node(&Node::symbol(identity))?.0)
}

/// Records that `caller` calls every symbol in `callees`.
///
/// The caller must exist. Missing callees are reported together as one
/// partial failure after the existing ones have been linked.
pub fn add_call_graph_dependencies<S: GraphStore>(
    store: &mut S,
    caller: &str,
    callees: &[String],
) -> Result<DependencyLink, ImpactError> {
    let caller_id = store
        .find_node(&NodeKey::symbol(caller))?
        .ok_or_else(|| ImpactError::not_found(NodeKind::Symbol, caller))?;

    let mut outcomes = Outcomes::new();
    for callee in callees {
        let found = store
            .find_node(&NodeKey::symbol(callee.as_str()))
            .map_err(ImpactError::from)
            .and_then(|id| id.ok_or_else(|| ImpactError::not_found(NodeKind::Symbol, callee)));
        outcomes.record(format!("symbol '{callee}'"), found);
    }

    let link = link_dependency(
        store,
        caller_id,
        NodeKind::CallGraphDependency,
        outcomes.successes(),
    )?;
    outcomes.into_result()?;
    Ok(link)
}

pub fn upsert_component<S: GraphStore>(
    store: &mut S,
    component: &ArtifactRef,
) -> Result<NodeId, ImpactError> {
    require_artifact(component, "component")?;
    Ok(store.merge_node(&Node::Component(component.clone()))?.0)
}

pub fn upsert_asset<S: GraphStore>(store: &mut S, asset: &ArtifactRef) -> Result<NodeId, ImpactError> {
    require_artifact(asset, "asset")?;
    Ok(store.merge_node(&Node::Asset(asset.clone()))?.0)
}

/// Records that `component` runs on `asset`. Both must exist.
pub fn host_component<S: GraphStore>(
    store: &mut S,
    component: &ArtifactRef,
    asset: &ArtifactRef,
) -> Result<bool, ImpactError> {
    let component_id = find_artifact(store, NodeKey::Component(component.clone()))?;
    let asset_id = find_artifact(store, NodeKey::Asset(asset.clone()))?;
    Ok(store.insert_edge(component_id, Relation::HostedBy, asset_id)?)
}

/// Merges a system and links it to each of `components`.
///
/// Missing components are reported together as one partial failure; the
/// system and the links that succeeded are kept.
pub fn upsert_system<S: GraphStore>(
    store: &mut S,
    name: &str,
    components: &[ArtifactRef],
) -> Result<NodeId, ImpactError> {
    if name.is_empty() {
        return Err(ImpactError::invalid("system name must not be empty"));
    }
    let (system, _) = store.merge_node(&Node::System {
        name: name.to_string(),
    })?;

    let mut outcomes = Outcomes::new();
    for component in components {
        let linked = find_artifact(store, NodeKey::Component(component.clone())).and_then(|id| {
            store
                .insert_edge(system, Relation::ComposedOf, id)
                .map_err(ImpactError::from)
        });
        outcomes.record(format!("component {component}"), linked);
    }
    outcomes.into_result()?;
    Ok(system)
}
