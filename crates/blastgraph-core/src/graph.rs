//! DependencyGraph: the in-memory System-of-Systems graph container.
//!
//! [`DependencyGraph`] wraps a petgraph `StableGraph` of [`NodeRecord`]s
//! connected by typed [`Relation`] edges. It enforces the structural
//! invariants shared by every store backend:
//!
//! - nodes with a [`NodeKey`] are unique over the key's canonical form,
//! - every edge is validated against the relation schema,
//! - edges are merged, so re-adding `(source, relation, target)` is a no-op,
//! - marks are kept beside the node and never alter its identity.
//!
//! The storage crate uses it directly as the in-memory backend and as the
//! materialized form returned by `load_graph`.

use std::collections::HashMap;

use petgraph::stable_graph::StableGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::edge::Relation;
use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::{Node, NodeKey, NodeKind};

/// A node plus its transient propagation mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node: Node,
    pub marked: bool,
}

impl NodeRecord {
    pub fn new(node: Node) -> Self {
        NodeRecord {
            node,
            marked: false,
        }
    }
}

/// The heterogeneous dependency graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    graph: StableGraph<NodeRecord, Relation, Directed, u32>,
    /// Canonical key -> node, for every keyed node.
    keys: HashMap<String, NodeId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Rebuilds a graph from stored rows, preserving node ids.
    ///
    /// Ids may be sparse. Gaps are filled with placeholder slots that are
    /// removed again, so every stored id maps to the same `NodeIndex`.
    pub fn from_parts(
        mut nodes: Vec<(NodeId, NodeRecord)>,
        edges: Vec<(NodeId, Relation, NodeId)>,
    ) -> Result<Self, CoreError> {
        nodes.sort_by_key(|(id, _)| *id);

        let mut out = DependencyGraph::new();
        let mut placeholders = Vec::new();
        for (id, record) in nodes {
            while out.graph.node_count() < id.0 as usize {
                let slot = out.graph.add_node(NodeRecord::new(Node::Binding));
                placeholders.push(slot);
            }
            if let Some(key) = record.node.key() {
                let canonical = key.canonical();
                if out.keys.contains_key(&canonical) {
                    return Err(CoreError::DuplicateKey { key: canonical });
                }
                out.keys.insert(canonical, id);
            }
            let idx = out.graph.add_node(record);
            debug_assert_eq!(NodeId::from(idx), id);
        }
        for slot in placeholders {
            out.graph.remove_node(slot);
        }

        for (source, relation, target) in edges {
            out.add_edge(source, relation, target)?;
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Adds a node, rejecting a keyed node whose key is already taken.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, CoreError> {
        let canonical = node.key().map(|key| key.canonical());
        if let Some(canonical) = &canonical {
            if self.keys.contains_key(canonical) {
                return Err(CoreError::DuplicateKey {
                    key: canonical.clone(),
                });
            }
        }
        let id = NodeId::from(self.graph.add_node(NodeRecord::new(node)));
        if let Some(canonical) = canonical {
            self.keys.insert(canonical, id);
        }
        Ok(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.graph.contains_node(id.into())
    }

    pub fn record(&self, id: NodeId) -> Option<&NodeRecord> {
        self.graph.node_weight(id.into())
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, CoreError> {
        self.record(id)
            .map(|record| &record.node)
            .ok_or(CoreError::NodeNotFound { id })
    }

    pub fn find(&self, key: &NodeKey) -> Option<NodeId> {
        self.keys.get(&key.canonical()).copied()
    }

    /// All nodes of `kind`, in ascending id order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.ids_where(|record| record.node.kind() == kind)
    }

    /// Every node with its record, in ascending id order.
    pub fn nodes(&self) -> Vec<(NodeId, &NodeRecord)> {
        let mut out: Vec<(NodeId, &NodeRecord)> = self
            .graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).map(|r| (NodeId::from(idx), r)))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Removes every node of `kind` with all its edges. Returns how many
    /// nodes were removed.
    pub fn remove_kind(&mut self, kind: NodeKind) -> usize {
        let ids = self.nodes_of_kind(kind);
        for id in &ids {
            if let Some(record) = self.graph.remove_node((*id).into()) {
                if let Some(key) = record.node.key() {
                    self.keys.remove(&key.canonical());
                }
            }
        }
        ids.len()
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Adds a validated edge. Returns `false` if the edge already existed.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        relation: Relation,
        target: NodeId,
    ) -> Result<bool, CoreError> {
        let from = self.node(source)?.kind();
        let to = self.node(target)?.kind();
        relation.check(from, to)?;

        let exists = self
            .graph
            .edges_directed(source.into(), Direction::Outgoing)
            .any(|e| *e.weight() == relation && NodeId::from(e.target()) == target);
        if exists {
            return Ok(false);
        }
        self.graph.add_edge(source.into(), target.into(), relation);
        Ok(true)
    }

    /// Nodes reached from `source` over `relation`, ascending.
    pub fn targets(&self, source: NodeId, relation: Relation) -> Result<Vec<NodeId>, CoreError> {
        self.neighbors(source, relation, Direction::Outgoing)
    }

    /// Nodes reaching `target` over `relation`, ascending.
    pub fn sources(&self, target: NodeId, relation: Relation) -> Result<Vec<NodeId>, CoreError> {
        self.neighbors(target, relation, Direction::Incoming)
    }

    /// Every edge as `(source, relation, target)`, sorted.
    pub fn edges(&self) -> Vec<(NodeId, Relation, NodeId)> {
        let mut out: Vec<(NodeId, Relation, NodeId)> = self
            .graph
            .edge_references()
            .map(|e| (NodeId::from(e.source()), *e.weight(), NodeId::from(e.target())))
            .collect();
        out.sort();
        out
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // -----------------------------------------------------------------------
    // Marks
    // -----------------------------------------------------------------------

    pub fn is_marked(&self, id: NodeId) -> Result<bool, CoreError> {
        self.record(id)
            .map(|record| record.marked)
            .ok_or(CoreError::NodeNotFound { id })
    }

    /// Marks every node in `ids` and returns how many were newly marked.
    ///
    /// All ids are validated before any mark is written.
    pub fn set_marks(&mut self, ids: &[NodeId]) -> Result<usize, CoreError> {
        if let Some(&missing) = ids.iter().find(|id| !self.contains(**id)) {
            return Err(CoreError::NodeNotFound { id: missing });
        }
        let mut newly = 0;
        for id in ids {
            if let Some(record) = self.graph.node_weight_mut((*id).into()) {
                if !record.marked {
                    record.marked = true;
                    newly += 1;
                }
            }
        }
        Ok(newly)
    }

    /// Clears every mark, returning how many nodes were marked.
    pub fn clear_marks(&mut self) -> usize {
        let mut cleared = 0;
        for record in self.graph.node_weights_mut() {
            if record.marked {
                record.marked = false;
                cleared += 1;
            }
        }
        cleared
    }

    /// Marked nodes of `kind`, ascending.
    pub fn marked(&self, kind: NodeKind) -> Vec<NodeId> {
        self.ids_where(|record| record.marked && record.node.kind() == kind)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn ids_where(&self, pred: impl Fn(&NodeRecord) -> bool) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .graph
            .node_indices()
            .filter(|idx| self.graph.node_weight(*idx).is_some_and(&pred))
            .map(NodeId::from)
            .collect();
        out.sort();
        out
    }

    fn neighbors(
        &self,
        id: NodeId,
        relation: Relation,
        direction: Direction,
    ) -> Result<Vec<NodeId>, CoreError> {
        if !self.contains(id) {
            return Err(CoreError::NodeNotFound { id });
        }
        let mut out: Vec<NodeId> = self
            .graph
            .edges_directed(id.into(), direction)
            .filter(|e| *e.weight() == relation)
            .map(|e| match direction {
                Direction::Outgoing => NodeId::from(e.target()),
                Direction::Incoming => NodeId::from(e.source()),
            })
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }
}
