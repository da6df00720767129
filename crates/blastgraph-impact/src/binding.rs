//! Binding resolution: recording that a library, a component and an asset
//! denote one deployed artifact.
//!
//! A binding is identified by its resolved SPECIALIZES_INTO target set. Refs
//! that are blank or do not resolve to an existing node are left out of that
//! set, so a binding created before its targets exist is reused rather than
//! duplicated. The check and the creation share one store transaction.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use blastgraph_core::{ArtifactRef, Node, NodeId, NodeKey, NodeKind, Relation};
use blastgraph_storage::{GraphStore, StorageError};

use crate::error::ImpactError;

/// Input of [`create_binding`]. Every ref is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingRequest {
    pub library: Option<ArtifactRef>,
    pub component: Option<ArtifactRef>,
    pub asset: Option<ArtifactRef>,
}

/// Result of [`create_binding`]: the input refs echoed back plus the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub id: NodeId,
    /// `false` when an equivalent binding already existed.
    pub created: bool,
    /// Resolved SPECIALIZES_INTO targets, ascending.
    pub targets: Vec<NodeId>,
    #[serde(flatten)]
    pub refs: BindingRequest,
}

/// Creates a binding for `request`, or returns the existing one with the
/// same resolved target set.
pub fn create_binding<S: GraphStore>(
    store: &mut S,
    request: &BindingRequest,
) -> Result<Binding, ImpactError> {
    let (id, created, targets) = store.atomically(|s| {
        let targets = resolve_targets(s, request)?;
        if let Some(id) = find_exact_binding(s, &targets)? {
            return Ok((id, false, targets));
        }
        let id = s.insert_node(&Node::Binding)?;
        for target in &targets {
            s.insert_edge(id, Relation::SpecializesInto, *target)?;
        }
        Ok((id, true, targets))
    })?;

    if created {
        tracing::info!(binding = %id, targets = targets.len(), "binding created");
    } else {
        tracing::debug!(binding = %id, "binding reused");
    }
    Ok(Binding {
        id,
        created,
        targets: targets.into_iter().collect(),
        refs: request.clone(),
    })
}

/// Resolves the present, non-blank refs of `request` to existing nodes.
fn resolve_targets<S: GraphStore>(
    store: &S,
    request: &BindingRequest,
) -> Result<BTreeSet<NodeId>, StorageError> {
    let keys = [
        request.library.clone().map(NodeKey::Library),
        request.component.clone().map(NodeKey::Component),
        request.asset.clone().map(NodeKey::Asset),
    ];
    let mut targets = BTreeSet::new();
    for key in keys.into_iter().flatten() {
        if is_blank(&key) {
            continue;
        }
        if let Some(id) = store.find_node(&key)? {
            targets.insert(id);
        }
    }
    Ok(targets)
}

fn is_blank(key: &NodeKey) -> bool {
    match key {
        NodeKey::Library(a) | NodeKey::Component(a) | NodeKey::Asset(a) => a.is_blank(),
        _ => false,
    }
}

/// Finds a binding whose whole SPECIALIZES_INTO set equals `targets`.
fn find_exact_binding<S: GraphStore>(
    store: &S,
    targets: &BTreeSet<NodeId>,
) -> Result<Option<NodeId>, StorageError> {
    let candidates = match targets.first() {
        Some(first) => store.sources(*first, Relation::SpecializesInto)?,
        None => store.nodes_of_kind(NodeKind::Binding)?,
    };
    for candidate in candidates {
        let existing: BTreeSet<NodeId> = store
            .targets(candidate, Relation::SpecializesInto)?
            .into_iter()
            .collect();
        if &existing == targets {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
