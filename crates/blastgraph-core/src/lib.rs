//! Data model of the blastgraph System-of-Systems dependency graph.
//!
//! - [`node`]: node kinds, artifact references and uniqueness keys
//! - [`edge`]: typed relations and their allowed endpoints
//! - [`graph`]: the in-memory [`DependencyGraph`] container
//! - [`render`]: Mermaid export

pub mod edge;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod render;

pub use edge::Relation;
pub use error::CoreError;
pub use graph::{DependencyGraph, NodeRecord};
pub use id::NodeId;
pub use node::{ArtifactRef, Node, NodeKey, NodeKind};
pub use render::to_mermaid;
