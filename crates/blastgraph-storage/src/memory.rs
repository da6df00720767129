//! In-memory implementation of [`GraphStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests, the CLI's dry runs,
//! and anywhere persistence isn't needed. It holds a [`DependencyGraph`]
//! directly and implements nested transactions with a stack of snapshots,
//! giving the same observable semantics as the SQLite backend.

use blastgraph_core::{DependencyGraph, Node, NodeId, NodeKey, NodeKind, Relation};

use crate::error::StorageError;
use crate::traits::GraphStore;

/// In-memory graph store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    graph: DependencyGraph,
    /// One snapshot per open transaction level, innermost last.
    snapshots: Vec<DependencyGraph>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// Wraps an existing graph.
    pub fn from_graph(graph: DependencyGraph) -> Self {
        InMemoryStore {
            graph,
            snapshots: Vec::new(),
        }
    }

    /// Read-only view of the current graph state.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Number of open transaction levels.
    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }
}

impl GraphStore for InMemoryStore {
    fn begin(&mut self) -> Result<(), StorageError> {
        self.snapshots.push(self.graph.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.snapshots
            .pop()
            .map(|_| ())
            .ok_or(StorageError::NoTransaction)
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        let snapshot = self.snapshots.pop().ok_or(StorageError::NoTransaction)?;
        self.graph = snapshot;
        Ok(())
    }

    fn insert_node(&mut self, node: &Node) -> Result<NodeId, StorageError> {
        Ok(self.graph.add_node(node.clone())?)
    }

    fn get_node(&self, id: NodeId) -> Result<Node, StorageError> {
        Ok(self.graph.node(id)?.clone())
    }

    fn find_node(&self, key: &NodeKey) -> Result<Option<NodeId>, StorageError> {
        Ok(self.graph.find(key))
    }

    fn nodes_of_kind(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError> {
        Ok(self.graph.nodes_of_kind(kind))
    }

    fn insert_edge(
        &mut self,
        source: NodeId,
        relation: Relation,
        target: NodeId,
    ) -> Result<bool, StorageError> {
        Ok(self.graph.add_edge(source, relation, target)?)
    }

    fn targets(&self, source: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError> {
        Ok(self.graph.targets(source, relation)?)
    }

    fn sources(&self, target: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError> {
        Ok(self.graph.sources(target, relation)?)
    }

    fn is_marked(&self, id: NodeId) -> Result<bool, StorageError> {
        Ok(self.graph.is_marked(id)?)
    }

    fn marked_nodes(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError> {
        Ok(self.graph.marked(kind))
    }

    fn mark_nodes(&mut self, ids: &[NodeId]) -> Result<usize, StorageError> {
        Ok(self.graph.set_marks(ids)?)
    }

    fn clear_marks(&mut self) -> Result<usize, StorageError> {
        Ok(self.graph.clear_marks())
    }

    fn load_graph(&self) -> Result<DependencyGraph, StorageError> {
        Ok(self.graph.clone())
    }

    fn remove_nodes_of_kind(&mut self, kind: NodeKind) -> Result<usize, StorageError> {
        Ok(self.graph.remove_kind(kind))
    }

    fn reset(&mut self) -> Result<(), StorageError> {
        self.graph = DependencyGraph::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastgraph_core::ArtifactRef;

    #[test]
    fn rollback_restores_snapshot() {
        let mut store = InMemoryStore::new();
        let f = store.insert_node(&Node::symbol("f")).unwrap();

        store.begin().unwrap();
        store.insert_node(&Node::symbol("g")).unwrap();
        store.mark_nodes(&[f]).unwrap();
        store.rollback().unwrap();

        assert_eq!(store.nodes_of_kind(NodeKind::Symbol).unwrap(), vec![f]);
        assert!(!store.is_marked(f).unwrap());
        assert_eq!(store.depth(), 0);
    }

    #[test]
    fn nested_rollback_keeps_outer_work() {
        let mut store = InMemoryStore::new();
        store.begin().unwrap();
        let f = store.insert_node(&Node::symbol("f")).unwrap();
        store.begin().unwrap();
        store.insert_node(&Node::symbol("g")).unwrap();
        store.rollback().unwrap();
        store.commit().unwrap();

        assert_eq!(store.nodes_of_kind(NodeKind::Symbol).unwrap(), vec![f]);
    }

    #[test]
    fn commit_without_begin_fails() {
        let mut store = InMemoryStore::new();
        assert!(matches!(store.commit(), Err(StorageError::NoTransaction)));
        assert!(matches!(store.rollback(), Err(StorageError::NoTransaction)));
    }

    #[test]
    fn atomically_rolls_back_on_error() {
        let mut store = InMemoryStore::new();
        let result: Result<(), StorageError> = store.atomically(|s| {
            s.insert_node(&Node::symbol("f"))?;
            s.insert_node(&Node::symbol("f"))?;
            Ok(())
        });
        assert!(result.unwrap_err().is_unique_violation());
        assert!(store.nodes_of_kind(NodeKind::Symbol).unwrap().is_empty());
    }

    #[test]
    fn merge_node_reuses_keyed_nodes() {
        let mut store = InMemoryStore::new();
        let lib = Node::Library(ArtifactRef::new("L", "1"));
        let (a, created) = store.merge_node(&lib).unwrap();
        assert!(created);
        let (b, created) = store.merge_node(&lib).unwrap();
        assert!(!created);
        assert_eq!(a, b);

        let (x, _) = store.merge_node(&Node::Binding).unwrap();
        let (y, _) = store.merge_node(&Node::Binding).unwrap();
        assert_ne!(x, y);
    }

    #[test]
    fn reset_empties_the_graph() {
        let mut store = InMemoryStore::new();
        store.insert_node(&Node::symbol("f")).unwrap();
        store.reset().unwrap();
        assert_eq!(store.graph().node_count(), 0);
        assert_eq!(store.find_node(&NodeKey::symbol("f")).unwrap(), None);
    }
}
