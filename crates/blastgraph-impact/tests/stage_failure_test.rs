//! Propagation against a store that fails one sub-pass commit.

use std::cell::Cell;

use serde_json::json;

use blastgraph_core::{ArtifactRef, DependencyGraph, Node, NodeId, NodeKey, NodeKind, Relation};
use blastgraph_impact::query::blast_radius;
use blastgraph_impact::{load_fixture, GraphFixture, ImpactError, PropagationConfig, Propagator, Stage};
use blastgraph_storage::{GraphStore, InMemoryStore, StorageError};

/// Delegates to an InMemoryStore. While armed, the first `mark_nodes` call
/// that touches a node of `fail_on` fails, and the store disarms itself.
struct FailingStore {
    inner: InMemoryStore,
    fail_on: Cell<Option<NodeKind>>,
}

impl FailingStore {
    fn new(inner: InMemoryStore) -> Self {
        FailingStore {
            inner,
            fail_on: Cell::new(None),
        }
    }

    fn arm(&self, kind: NodeKind) {
        self.fail_on.set(Some(kind));
    }
}

impl GraphStore for FailingStore {
    fn begin(&mut self) -> Result<(), StorageError> {
        self.inner.begin()
    }
    fn commit(&mut self) -> Result<(), StorageError> {
        self.inner.commit()
    }
    fn rollback(&mut self) -> Result<(), StorageError> {
        self.inner.rollback()
    }
    fn insert_node(&mut self, node: &Node) -> Result<NodeId, StorageError> {
        self.inner.insert_node(node)
    }
    fn get_node(&self, id: NodeId) -> Result<Node, StorageError> {
        self.inner.get_node(id)
    }
    fn find_node(&self, key: &NodeKey) -> Result<Option<NodeId>, StorageError> {
        self.inner.find_node(key)
    }
    fn nodes_of_kind(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError> {
        self.inner.nodes_of_kind(kind)
    }
    fn insert_edge(
        &mut self,
        source: NodeId,
        relation: Relation,
        target: NodeId,
    ) -> Result<bool, StorageError> {
        self.inner.insert_edge(source, relation, target)
    }
    fn targets(&self, source: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError> {
        self.inner.targets(source, relation)
    }
    fn sources(&self, target: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError> {
        self.inner.sources(target, relation)
    }
    fn is_marked(&self, id: NodeId) -> Result<bool, StorageError> {
        self.inner.is_marked(id)
    }
    fn marked_nodes(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError> {
        self.inner.marked_nodes(kind)
    }
    fn mark_nodes(&mut self, ids: &[NodeId]) -> Result<usize, StorageError> {
        if let Some(kind) = self.fail_on.get() {
            for id in ids {
                if self.inner.node_kind(*id)? == kind {
                    self.fail_on.set(None);
                    return Err(StorageError::Unavailable {
                        reason: "injected".into(),
                    });
                }
            }
        }
        self.inner.mark_nodes(ids)
    }
    fn clear_marks(&mut self) -> Result<usize, StorageError> {
        self.inner.clear_marks()
    }
    fn load_graph(&self) -> Result<DependencyGraph, StorageError> {
        self.inner.load_graph()
    }
    fn remove_nodes_of_kind(&mut self, kind: NodeKind) -> Result<usize, StorageError> {
        self.inner.remove_nodes_of_kind(kind)
    }
    fn reset(&mut self) -> Result<(), StorageError> {
        self.inner.reset()
    }
}

fn art(name: &str) -> serde_json::Value {
    json!({"name": name, "version": "1"})
}

/// f calls g from library L; C1's e1 serves g, C2's e2 calls e1, and C2 is
/// hosted on Y.
fn network_fixture() -> GraphFixture {
    serde_json::from_value(json!({
        "libraries": [{"name": "L", "version": "1", "symbols": ["g"]}],
        "symbols": ["f"],
        "calls": [{"caller": "f", "callees": ["g"]}],
        "components": [art("C1"), art("C2")],
        "assets": [art("Y")],
        "hosting": [{"component": art("C2"), "asset": art("Y")}],
        "endpoints": [
            {"component": art("C1"), "name": "e1"},
            {"component": art("C2"), "name": "e2"}
        ],
        "serves": [{"endpoint": {"component": art("C1"), "name": "e1"}, "symbol": "g"}],
        "network": [{
            "caller": {"component": art("C2"), "name": "e2"},
            "callees": [{"component": art("C1"), "name": "e1"}]
        }],
        "vulnerabilities": [{"identity": "v1", "symbol": "g"}]
    }))
    .unwrap()
}

fn loaded() -> FailingStore {
    let mut store = InMemoryStore::new();
    load_fixture(&mut store, &network_fixture()).unwrap();
    FailingStore::new(store)
}

fn is_marked(store: &FailingStore, key: NodeKey) -> bool {
    let id = store.find_node(&key).unwrap().unwrap();
    store.is_marked(id).unwrap()
}

#[test]
fn failed_stage_is_named_and_earlier_marks_persist() {
    let mut store = loaded();
    store.arm(NodeKind::Endpoint);

    let err = Propagator::new(&mut store, PropagationConfig::default())
        .run(Some("v1"))
        .unwrap_err();

    match err {
        ImpactError::StageFailed { stage, error } => {
            assert_eq!(stage, Stage::AllReachingComponents);
            assert!(error.is_transient());
        }
        other => panic!("expected StageFailed, got {other:?}"),
    }

    // stages A and B committed
    assert!(is_marked(&store, NodeKey::symbol("f")));
    assert!(is_marked(&store, NodeKey::symbol("g")));
    assert!(is_marked(&store, NodeKey::Library(ArtifactRef::new("L", "1"))));
    assert_eq!(store.marked_nodes(NodeKind::CallGraphDependency).unwrap().len(), 1);

    // stage C onwards did not
    assert!(store.marked_nodes(NodeKind::Endpoint).unwrap().is_empty());
    assert!(!is_marked(&store, NodeKey::Component(ArtifactRef::new("C2", "1"))));
    assert!(!is_marked(&store, NodeKey::Asset(ArtifactRef::new("Y", "1"))));
}

#[test]
fn rerun_after_a_stage_failure_completes() {
    let mut store = loaded();
    store.arm(NodeKind::Endpoint);
    assert!(Propagator::new(&mut store, PropagationConfig::default())
        .run(Some("v1"))
        .is_err());

    let report = Propagator::new(&mut store, PropagationConfig::default())
        .run(Some("v1"))
        .unwrap();

    assert!(is_marked(&store, NodeKey::Component(ArtifactRef::new("C2", "1"))));
    assert!(is_marked(&store, NodeKey::Asset(ArtifactRef::new("Y", "1"))));
    assert!(!is_marked(&store, NodeKey::Component(ArtifactRef::new("C1", "1"))));

    let mut clean = loaded();
    let expected = Propagator::new(&mut clean, PropagationConfig::default())
        .run(Some("v1"))
        .unwrap();
    assert_eq!(report.total_marked, expected.total_marked);
    assert_eq!(report.stages, expected.stages);
    assert_eq!(blast_radius(&store).unwrap(), blast_radius(&clean).unwrap());
}
