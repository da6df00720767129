//! Core error types for blastgraph-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the dependency graph data model.

use thiserror::Error;

use crate::edge::Relation;
use crate::id::NodeId;
use crate::node::NodeKind;

/// Core errors produced by the blastgraph-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node id was not found in the graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A node with the same uniqueness key already exists.
    #[error("duplicate node key: {key}")]
    DuplicateKey { key: String },

    /// The relation does not connect these node kinds.
    #[error("invalid relation: {from} -[{relation}]-> {to}")]
    InvalidRelation {
        relation: Relation,
        from: NodeKind,
        to: NodeKind,
    },

    /// A node kind name could not be parsed.
    #[error("unknown node kind: '{name}'")]
    UnknownNodeKind { name: String },

    /// A relation name could not be parsed.
    #[error("unknown relation: '{name}'")]
    UnknownRelation { name: String },
}
