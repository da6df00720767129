//! Network topology upserts: endpoints, inter-component dependencies and
//! SERVES links.
//!
//! Each caller owns a single reified dependency node (an
//! InterComponentDependency for endpoints, a CallGraphDependency for
//! symbols); repeated and overlapping calls only add missing CALLEES edges.

use std::fmt;

use serde::{Deserialize, Serialize};

use blastgraph_core::{ArtifactRef, Node, NodeId, NodeKey, NodeKind, Relation};
use blastgraph_storage::{GraphStore, StorageError};

use crate::error::ImpactError;
use crate::outcome::Outcomes;

/// An endpoint, identified by its name and exposing component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRef {
    pub component: ArtifactRef,
    pub name: String,
}

impl EndpointRef {
    pub fn new(component: ArtifactRef, name: impl Into<String>) -> Self {
        EndpointRef {
            component,
            name: name.into(),
        }
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint '{}' of {}", self.name, self.component)
    }
}

/// Result of linking a caller to its callees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyLink {
    pub caller: NodeId,
    /// The caller's dependency node; `None` when no callee could be linked.
    pub dependency: Option<NodeId>,
    /// Callees linked by this call, ascending.
    pub callees: Vec<NodeId>,
}

/// Ensures the endpoint exists and is exposed by its component.
///
/// The component must already exist.
pub fn upsert_endpoint<S: GraphStore>(
    store: &mut S,
    endpoint: &EndpointRef,
) -> Result<NodeId, ImpactError> {
    if endpoint.name.is_empty() {
        return Err(ImpactError::invalid("endpoint name must not be empty"));
    }
    let component = find_artifact(store, NodeKey::Component(endpoint.component.clone()))?;
    let node = Node::Endpoint {
        name: endpoint.name.clone(),
        component,
    };
    let (id, created) = store.atomically(|s| {
        let (id, created) = s.merge_node(&node)?;
        s.insert_edge(id, Relation::Exposes, component)?;
        Ok((id, created))
    })?;
    if created {
        tracing::debug!(endpoint = %id, name = %endpoint.name, "endpoint created");
    }
    Ok(id)
}

/// Records that `caller` calls every endpoint in `callees`.
///
/// The caller upsert must succeed. Callees are upserted best effort: every
/// callee that upserts is linked and stays committed, and any failures are
/// returned together as one [`PartialFailure`](crate::PartialFailure).
pub fn create_inter_component_dependency<S: GraphStore>(
    store: &mut S,
    caller: &EndpointRef,
    callees: &[EndpointRef],
) -> Result<DependencyLink, ImpactError> {
    let caller_id = upsert_endpoint(store, caller)?;

    let mut outcomes = Outcomes::new();
    for callee in callees {
        outcomes.record(callee.to_string(), upsert_endpoint(store, callee));
    }

    let link = link_dependency(
        store,
        caller_id,
        NodeKind::InterComponentDependency,
        outcomes.successes(),
    )?;
    if outcomes.failure_count() > 0 {
        tracing::warn!(
            caller = %caller,
            failed = outcomes.failure_count(),
            linked = link.callees.len(),
            "network dependency partially recorded"
        );
    }
    outcomes.into_result()?;
    Ok(link)
}

/// Links an existing endpoint to the symbol that implements it.
pub fn create_serves<S: GraphStore>(
    store: &mut S,
    endpoint: &EndpointRef,
    symbol: &str,
) -> Result<bool, ImpactError> {
    let endpoint_id = find_endpoint(store, endpoint)?;
    let symbol_id = store
        .find_node(&NodeKey::symbol(symbol))?
        .ok_or_else(|| ImpactError::not_found(NodeKind::Symbol, symbol))?;
    Ok(store.insert_edge(endpoint_id, Relation::Serves, symbol_id)?)
}

/// Looks up an existing endpoint.
pub fn find_endpoint<S: GraphStore>(store: &S, endpoint: &EndpointRef) -> Result<NodeId, ImpactError> {
    let component = find_artifact(store, NodeKey::Component(endpoint.component.clone()))?;
    let key = NodeKey::Endpoint {
        name: endpoint.name.clone(),
        component,
    };
    store
        .find_node(&key)?
        .ok_or_else(|| ImpactError::not_found(NodeKind::Endpoint, endpoint))
}

/// Looks up a keyed artifact node, reporting its key when missing.
pub(crate) fn find_artifact<S: GraphStore>(store: &S, key: NodeKey) -> Result<NodeId, ImpactError> {
    store
        .find_node(&key)?
        .ok_or_else(|| ImpactError::not_found(key.kind(), &key))
}

/// Merges `caller`'s single dependency node of `kind` and attaches a
/// CALLEES edge to each of `callees`, in one transaction.
///
/// Does nothing when `callees` is empty.
pub(crate) fn link_dependency<S: GraphStore>(
    store: &mut S,
    caller: NodeId,
    kind: NodeKind,
    callees: &[NodeId],
) -> Result<DependencyLink, StorageError> {
    if callees.is_empty() {
        return Ok(DependencyLink {
            caller,
            dependency: None,
            callees: Vec::new(),
        });
    }
    let mut linked: Vec<NodeId> = callees.to_vec();
    linked.sort();
    linked.dedup();

    let dependency = store.atomically(|s| {
        let dependency = match existing_dependency(s, caller, kind)? {
            Some(id) => id,
            None => {
                let node = match kind {
                    NodeKind::CallGraphDependency => Node::CallGraphDependency,
                    _ => Node::InterComponentDependency,
                };
                let id = s.insert_node(&node)?;
                s.insert_edge(id, Relation::Caller, caller)?;
                id
            }
        };
        for callee in &linked {
            s.insert_edge(dependency, Relation::Callees, *callee)?;
        }
        Ok(dependency)
    })?;

    Ok(DependencyLink {
        caller,
        dependency: Some(dependency),
        callees: linked,
    })
}

fn existing_dependency<S: GraphStore>(
    store: &S,
    caller: NodeId,
    kind: NodeKind,
) -> Result<Option<NodeId>, StorageError> {
    for candidate in store.sources(caller, Relation::Caller)? {
        if store.node_kind(candidate)? == kind {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
