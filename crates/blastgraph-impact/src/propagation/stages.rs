//! The six propagation stages.
//!
//! Each function computes match sets from the current marks and commits
//! them through [`commit`], returning the number of newly marked nodes.

use std::collections::BTreeSet;

use blastgraph_core::{NodeId, NodeKind, Relation};
use blastgraph_storage::GraphStore;

use super::{Deadline, Interrupt};

/// Commits one sub-pass: checks the deadline, then marks `ids` atomically.
fn commit<S: GraphStore>(
    store: &mut S,
    deadline: &Deadline,
    ids: BTreeSet<NodeId>,
) -> Result<usize, Interrupt> {
    if deadline.expired() {
        return Err(Interrupt::Deadline);
    }
    if ids.is_empty() {
        return Ok(0);
    }
    let ids: Vec<NodeId> = ids.into_iter().collect();
    Ok(store.mark_nodes(&ids)?)
}

/// Stage A: backward closure over the call graph.
///
/// Each iteration marks every unmarked symbol that calls, through its
/// CallGraphDependency, a symbol marked so far, together with that
/// dependency node. Iterations after the first scan only the symbols marked
/// by the previous one. Stops on an iteration that marks nothing.
pub(super) fn all_reaching_symbols<S: GraphStore>(
    store: &mut S,
    deadline: &Deadline,
) -> Result<usize, Interrupt> {
    let mut frontier: BTreeSet<NodeId> = store.marked_nodes(NodeKind::Symbol)?.into_iter().collect();
    let mut total = 0;
    let mut iteration = 0u32;
    loop {
        iteration += 1;
        let mut callers = BTreeSet::new();
        let mut batch = BTreeSet::new();
        for symbol in &frontier {
            for dependency in store.sources(*symbol, Relation::Callees)? {
                if store.node_kind(dependency)? != NodeKind::CallGraphDependency {
                    continue;
                }
                for caller in store.targets(dependency, Relation::Caller)? {
                    if !store.is_marked(caller)? {
                        callers.insert(caller);
                        batch.insert(caller);
                        batch.insert(dependency);
                    }
                }
            }
        }
        let newly = commit(store, deadline, batch)?;
        tracing::debug!(iteration, frontier = frontier.len(), newly, "call-graph closure iteration");
        if newly == 0 {
            break;
        }
        total += newly;
        frontier = callers;
    }
    Ok(total)
}

/// Bindings that specialize into a marked `anchor`, each with its targets of
/// kind `sibling`. A binding without such a target is not matched.
fn sibling_specializations<S: GraphStore>(
    store: &S,
    anchor: NodeKind,
    sibling: NodeKind,
) -> Result<BTreeSet<NodeId>, Interrupt> {
    let mut matched = BTreeSet::new();
    for anchor_id in store.marked_nodes(anchor)? {
        for binding in store.sources(anchor_id, Relation::SpecializesInto)? {
            let mut siblings = Vec::new();
            for target in store.targets(binding, Relation::SpecializesInto)? {
                if store.node_kind(target)? == sibling {
                    siblings.push(target);
                }
            }
            if !siblings.is_empty() {
                matched.insert(binding);
                matched.extend(siblings);
            }
        }
    }
    Ok(matched)
}

/// Stage B: providing libraries and their specializations, four sub-passes.
pub(super) fn all_providing_libraries<S: GraphStore>(
    store: &mut S,
    deadline: &Deadline,
) -> Result<usize, Interrupt> {
    let mut libraries = BTreeSet::new();
    for symbol in store.marked_nodes(NodeKind::Symbol)? {
        libraries.extend(store.sources(symbol, Relation::Provides)?);
    }
    let mut total = commit(store, deadline, libraries)?;

    let components = sibling_specializations(store, NodeKind::Library, NodeKind::Component)?;
    total += commit(store, deadline, components)?;

    let assets = sibling_specializations(store, NodeKind::Library, NodeKind::Asset)?;
    total += commit(store, deadline, assets)?;

    let component_assets = sibling_specializations(store, NodeKind::Component, NodeKind::Asset)?;
    total += commit(store, deadline, component_assets)?;
    Ok(total)
}

/// Stage C: components reaching a marked symbol over the network.
///
/// Follows SERVES, then CALLEES back to each InterComponentDependency, then
/// its CALLER endpoint and the component that endpoint EXPOSES. The
/// component exposing the serving endpoint is left alone.
pub(super) fn all_reaching_components<S: GraphStore>(
    store: &mut S,
    deadline: &Deadline,
) -> Result<usize, Interrupt> {
    let mut matched = BTreeSet::new();
    for symbol in store.marked_nodes(NodeKind::Symbol)? {
        for endpoint in store.sources(symbol, Relation::Serves)? {
            matched.insert(endpoint);
            for dependency in store.sources(endpoint, Relation::Callees)? {
                if store.node_kind(dependency)? != NodeKind::InterComponentDependency {
                    continue;
                }
                matched.insert(dependency);
                for caller in store.targets(dependency, Relation::Caller)? {
                    matched.insert(caller);
                    matched.extend(store.targets(caller, Relation::Exposes)?);
                }
            }
        }
    }
    commit(store, deadline, matched)
}

/// Stage D: assets hosting a marked component.
pub(super) fn all_hosting_assets<S: GraphStore>(
    store: &mut S,
    deadline: &Deadline,
) -> Result<usize, Interrupt> {
    let mut assets = BTreeSet::new();
    for component in store.marked_nodes(NodeKind::Component)? {
        assets.extend(store.targets(component, Relation::HostedBy)?);
    }
    commit(store, deadline, assets)
}

/// Stage E: lateral movement to every component sharing a marked asset.
pub(super) fn lateral_movement<S: GraphStore>(
    store: &mut S,
    deadline: &Deadline,
) -> Result<usize, Interrupt> {
    let mut components = BTreeSet::new();
    for asset in store.marked_nodes(NodeKind::Asset)? {
        components.extend(store.sources(asset, Relation::HostedBy)?);
    }
    commit(store, deadline, components)
}

/// Stage F: systems composed of a marked component.
pub(super) fn all_systems<S: GraphStore>(
    store: &mut S,
    deadline: &Deadline,
) -> Result<usize, Interrupt> {
    let mut systems = BTreeSet::new();
    for component in store.marked_nodes(NodeKind::Component)? {
        systems.extend(store.sources(component, Relation::ComposedOf)?);
    }
    commit(store, deadline, systems)
}
