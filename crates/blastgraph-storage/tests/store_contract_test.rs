//! The same workload run against every backend must be observably identical.

use blastgraph_core::{ArtifactRef, Node, NodeKey, NodeKind, Relation};
use blastgraph_storage::{GraphStore, InMemoryStore, SqliteStore, StorageError};

fn exercise<S: GraphStore>(store: &mut S) -> Vec<String> {
    let mut log = Vec::new();

    let lib = store
        .insert_node(&Node::Library(ArtifactRef::new("L", "1.0")))
        .unwrap();
    let f = store.insert_node(&Node::symbol("f")).unwrap();
    let g = store.insert_node(&Node::symbol("g")).unwrap();
    let cgd = store.insert_node(&Node::CallGraphDependency).unwrap();
    store.insert_edge(lib, Relation::Provides, f).unwrap();
    store.insert_edge(lib, Relation::Provides, g).unwrap();
    store.insert_edge(cgd, Relation::Caller, f).unwrap();
    store.insert_edge(cgd, Relation::Callees, g).unwrap();
    log.push(format!(
        "dup edge created: {}",
        store.insert_edge(cgd, Relation::Callees, g).unwrap()
    ));

    let result: Result<(), StorageError> = store.atomically(|s| {
        s.insert_node(&Node::symbol("h"))?;
        s.insert_node(&Node::symbol("h"))?;
        Ok(())
    });
    log.push(format!("dup in tx unique: {}", result.unwrap_err().is_unique_violation()));
    log.push(format!(
        "h after rollback: {:?}",
        store.find_node(&NodeKey::symbol("h")).unwrap()
    ));

    log.push(format!("newly marked: {}", store.mark_nodes(&[g, g]).unwrap()));
    log.push(format!("marked symbols: {}", store.marked_nodes(NodeKind::Symbol).unwrap().len()));
    log.push(format!("callees of cgd: {}", store.targets(cgd, Relation::Callees).unwrap().len()));
    log.push(format!("providers of g: {}", store.sources(g, Relation::Provides).unwrap().len()));

    let graph = store.load_graph().unwrap();
    log.push(format!("graph: {} nodes, {} edges", graph.node_count(), graph.edge_count()));

    log.push(format!("cleared: {}", store.clear_marks().unwrap()));
    log
}

#[test]
fn memory_and_sqlite_backends_agree() {
    let mut memory = InMemoryStore::new();
    let mut sqlite = SqliteStore::in_memory().unwrap();

    let a = exercise(&mut memory);
    let b = exercise(&mut sqlite);
    assert_eq!(a, b);
    assert!(a.contains(&"dup edge created: false".to_string()));
    assert!(a.contains(&"newly marked: 1".to_string()));
    assert!(a.contains(&"graph: 4 nodes, 4 edges".to_string()));
}

#[test]
fn sqlite_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");
    let path = path.to_str().unwrap();

    let f = {
        let mut store = SqliteStore::new(path).unwrap();
        let f = store.insert_node(&Node::symbol("f")).unwrap();
        store.mark_nodes(&[f]).unwrap();
        f
    };

    let store = SqliteStore::new(path).unwrap();
    assert_eq!(store.find_node(&NodeKey::symbol("f")).unwrap(), Some(f));
    assert!(store.is_marked(f).unwrap());
}

#[test]
fn uncommitted_sqlite_transaction_is_discarded_on_rollback() {
    let mut store = SqliteStore::in_memory().unwrap();
    store.begin().unwrap();
    store.insert_node(&Node::symbol("f")).unwrap();
    store.rollback().unwrap();
    assert!(store.nodes_of_kind(NodeKind::Symbol).unwrap().is_empty());
}
