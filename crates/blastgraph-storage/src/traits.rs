//! The [`GraphStore`] trait defining the storage contract for the
//! dependency graph.
//!
//! The contract has three layers:
//! - **Transactions**: `begin`/`commit`/`rollback` primitives that nest, plus
//!   the provided [`atomically`](GraphStore::atomically) wrapper.
//! - **Structure**: keyed node insert/lookup, kind listing, merged edge
//!   insert, and traversal by relation in either direction.
//! - **Marks**: bulk marking with a newly-marked count, listing and clearing.
//!
//! Backends ([`InMemoryStore`](crate::InMemoryStore),
//! [`SqliteStore`](crate::SqliteStore)) are fully swappable; the impact
//! engine only ever talks to this trait.

use blastgraph_core::{DependencyGraph, Node, NodeId, NodeKey, NodeKind, Relation};

use crate::error::StorageError;

/// The storage contract for the dependency graph.
///
/// The trait is synchronous. Mutations take `&mut self`, so one handle can
/// never run two mutations at once.
pub trait GraphStore {
    // -------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------

    /// Opens a transaction, or a nested savepoint if one is already open.
    fn begin(&mut self) -> Result<(), StorageError>;

    /// Commits the innermost open transaction.
    fn commit(&mut self) -> Result<(), StorageError>;

    /// Rolls back the innermost open transaction.
    fn rollback(&mut self) -> Result<(), StorageError>;

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back
    /// on `Err`.
    ///
    /// Wrappers may override this to re-run the whole closure, so `f` must
    /// be safe to call more than once.
    fn atomically<T, F>(&mut self, f: F) -> Result<T, StorageError>
    where
        Self: Sized,
        F: FnMut(&mut Self) -> Result<T, StorageError>,
    {
        run_in_transaction(self, f)
    }

    // -------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------

    /// Inserts a node.
    ///
    /// Fails with [`StorageError::UniqueViolation`] if a node with the same
    /// [`NodeKey`] exists.
    fn insert_node(&mut self, node: &Node) -> Result<NodeId, StorageError>;

    /// Retrieves a node by id.
    fn get_node(&self, id: NodeId) -> Result<Node, StorageError>;

    /// Returns the kind of a node.
    fn node_kind(&self, id: NodeId) -> Result<NodeKind, StorageError> {
        Ok(self.get_node(id)?.kind())
    }

    /// Looks up a keyed node.
    fn find_node(&self, key: &NodeKey) -> Result<Option<NodeId>, StorageError>;

    /// Lists every node of a kind, ascending by id.
    fn nodes_of_kind(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError>;

    /// Returns the existing node for `node`'s key, or inserts it.
    ///
    /// The boolean is `true` when the node was created. A uniqueness
    /// conflict raised by a concurrent writer counts as "already exists".
    /// Keyless nodes are always inserted.
    fn merge_node(&mut self, node: &Node) -> Result<(NodeId, bool), StorageError> {
        let Some(key) = node.key() else {
            return Ok((self.insert_node(node)?, true));
        };
        if let Some(id) = self.find_node(&key)? {
            return Ok((id, false));
        }
        match self.insert_node(node) {
            Ok(id) => Ok((id, true)),
            Err(err) if err.is_unique_violation() => match self.find_node(&key)? {
                Some(id) => Ok((id, false)),
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    // -------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------

    /// Inserts a validated edge. Returns `false` if it already existed.
    fn insert_edge(
        &mut self,
        source: NodeId,
        relation: Relation,
        target: NodeId,
    ) -> Result<bool, StorageError>;

    /// Nodes reached from `source` over `relation`, ascending.
    fn targets(&self, source: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError>;

    /// Nodes reaching `target` over `relation`, ascending.
    fn sources(&self, target: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError>;

    // -------------------------------------------------------------------
    // Marks
    // -------------------------------------------------------------------

    fn is_marked(&self, id: NodeId) -> Result<bool, StorageError>;

    /// Marked nodes of a kind, ascending by id.
    fn marked_nodes(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError>;

    /// Marks every listed node as one atomic mutation.
    ///
    /// Returns the number of nodes that were not marked before. Fails without
    /// marking anything if any id is unknown.
    fn mark_nodes(&mut self, ids: &[NodeId]) -> Result<usize, StorageError>;

    /// Clears every mark. Returns how many nodes were marked.
    fn clear_marks(&mut self) -> Result<usize, StorageError>;

    // -------------------------------------------------------------------
    // Whole-graph operations
    // -------------------------------------------------------------------

    /// Materializes the full graph, marks included.
    fn load_graph(&self) -> Result<DependencyGraph, StorageError>;

    /// Deletes every node of `kind` and every edge touching one. Returns
    /// how many nodes were deleted.
    fn remove_nodes_of_kind(&mut self, kind: NodeKind) -> Result<usize, StorageError>;

    /// Deletes every node and edge.
    fn reset(&mut self) -> Result<(), StorageError>;
}

/// Begin, run `f`, then commit or roll back.
///
/// This is the default body of [`GraphStore::atomically`], exposed so that
/// wrappers overriding `atomically` can reuse it per attempt. A failing
/// rollback is logged and the original error is returned.
pub fn run_in_transaction<S, T, F>(store: &mut S, mut f: F) -> Result<T, StorageError>
where
    S: GraphStore,
    F: FnMut(&mut S) -> Result<T, StorageError>,
{
    store.begin()?;
    match f(store) {
        Ok(value) => match store.commit() {
            Ok(()) => Ok(value),
            Err(err) => {
                if let Err(rollback_err) = store.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback after failed commit failed");
                }
                Err(err)
            }
        },
        Err(err) => {
            if let Err(rollback_err) = store.rollback() {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
