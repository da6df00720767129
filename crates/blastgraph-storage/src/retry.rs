//! Retry with exponential backoff at the store boundary.
//!
//! [`RetryingStore`] wraps any backend and re-runs operations that fail with
//! a transient error (see [`StorageError::is_transient`]). Outside a
//! transaction each call is retried on its own. Inside a transaction single
//! statements are never retried; instead [`GraphStore::atomically`] re-runs
//! the whole transaction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use blastgraph_core::{DependencyGraph, Node, NodeId, NodeKey, NodeKind, Relation};

use crate::error::StorageError;
use crate::traits::{run_in_transaction, GraphStore};

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles each retry.
    pub initial_backoff_ms: u64,
    /// Upper bound on a single backoff.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_backoff_ms: 300,
            max_backoff_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        }
    }

    /// Backoff before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Runs `op`, retrying transient failures.
    ///
    /// Non-transient errors are returned immediately. A transient error that
    /// outlives every retry is wrapped in [`StorageError::RetriesExhausted`].
    pub fn run<T, F>(&self, mut op: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Result<T, StorageError>,
    {
        let mut retry = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if retry >= self.max_retries => {
                    return Err(StorageError::RetriesExhausted {
                        attempts: retry + 1,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let wait = self.backoff(retry);
                    retry += 1;
                    tracing::warn!(
                        attempt = retry,
                        backoff_ms = wait.as_millis() as u64,
                        error = %err,
                        "transient store failure, retrying"
                    );
                    std::thread::sleep(wait);
                }
            }
        }
    }
}

/// A [`GraphStore`] that retries transient failures of its inner store.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
    depth: usize,
}

impl<S: GraphStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        RetryingStore {
            inner,
            policy,
            depth: 0,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn retry_mut<T>(
        &mut self,
        mut op: impl FnMut(&mut S) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        if self.depth > 0 {
            return op(&mut self.inner);
        }
        let inner = &mut self.inner;
        self.policy.run(|| op(inner))
    }

    fn retry_ref<T>(&self, op: impl Fn(&S) -> Result<T, StorageError>) -> Result<T, StorageError> {
        if self.depth > 0 {
            return op(&self.inner);
        }
        self.policy.run(|| op(&self.inner))
    }
}

impl<S: GraphStore> GraphStore for RetryingStore<S> {
    fn begin(&mut self) -> Result<(), StorageError> {
        self.inner.begin()?;
        self.depth += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.inner.commit()?;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.depth = self.depth.saturating_sub(1);
        self.inner.rollback()
    }

    fn atomically<T, F>(&mut self, mut f: F) -> Result<T, StorageError>
    where
        Self: Sized,
        F: FnMut(&mut Self) -> Result<T, StorageError>,
    {
        if self.depth > 0 {
            return run_in_transaction(self, f);
        }
        let policy = self.policy.clone();
        policy.run(|| run_in_transaction(self, &mut f))
    }

    fn insert_node(&mut self, node: &Node) -> Result<NodeId, StorageError> {
        self.retry_mut(|s| s.insert_node(node))
    }

    fn get_node(&self, id: NodeId) -> Result<Node, StorageError> {
        self.retry_ref(|s| s.get_node(id))
    }

    fn node_kind(&self, id: NodeId) -> Result<NodeKind, StorageError> {
        self.retry_ref(|s| s.node_kind(id))
    }

    fn find_node(&self, key: &NodeKey) -> Result<Option<NodeId>, StorageError> {
        self.retry_ref(|s| s.find_node(key))
    }

    fn nodes_of_kind(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError> {
        self.retry_ref(|s| s.nodes_of_kind(kind))
    }

    fn insert_edge(
        &mut self,
        source: NodeId,
        relation: Relation,
        target: NodeId,
    ) -> Result<bool, StorageError> {
        self.retry_mut(|s| s.insert_edge(source, relation, target))
    }

    fn targets(&self, source: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError> {
        self.retry_ref(|s| s.targets(source, relation))
    }

    fn sources(&self, target: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError> {
        self.retry_ref(|s| s.sources(target, relation))
    }

    fn is_marked(&self, id: NodeId) -> Result<bool, StorageError> {
        self.retry_ref(|s| s.is_marked(id))
    }

    fn marked_nodes(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError> {
        self.retry_ref(|s| s.marked_nodes(kind))
    }

    fn mark_nodes(&mut self, ids: &[NodeId]) -> Result<usize, StorageError> {
        self.retry_mut(|s| s.mark_nodes(ids))
    }

    fn clear_marks(&mut self) -> Result<usize, StorageError> {
        self.retry_mut(|s| s.clear_marks())
    }

    fn load_graph(&self) -> Result<DependencyGraph, StorageError> {
        self.retry_ref(|s| s.load_graph())
    }

    fn remove_nodes_of_kind(&mut self, kind: NodeKind) -> Result<usize, StorageError> {
        self.retry_mut(|s| s.remove_nodes_of_kind(kind))
    }

    fn reset(&mut self) -> Result<(), StorageError> {
        self.retry_mut(|s| s.reset())
    }
}
