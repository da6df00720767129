//! Node types for the System-of-Systems dependency graph.
//!
//! Every entity of the model is one [`Node`] variant. Nodes with a natural
//! identity expose a [`NodeKey`]; the store enforces uniqueness over the
//! key's [`canonical`](NodeKey::canonical) form. Reified dependency nodes and
//! bindings are keyless and deduplicated structurally by the impact layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::NodeId;

/// The kind (label) of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Symbol,
    CallGraphDependency,
    Library,
    Component,
    Asset,
    Binding,
    Endpoint,
    InterComponentDependency,
    Vulnerability,
    System,
}

impl NodeKind {
    /// Every node kind, in layer order.
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Symbol,
        NodeKind::CallGraphDependency,
        NodeKind::Library,
        NodeKind::Component,
        NodeKind::Asset,
        NodeKind::Binding,
        NodeKind::Endpoint,
        NodeKind::InterComponentDependency,
        NodeKind::Vulnerability,
        NodeKind::System,
    ];

    /// Stable snake_case name, used for storage and URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Symbol => "symbol",
            NodeKind::CallGraphDependency => "call_graph_dependency",
            NodeKind::Library => "library",
            NodeKind::Component => "component",
            NodeKind::Asset => "asset",
            NodeKind::Binding => "binding",
            NodeKind::Endpoint => "endpoint",
            NodeKind::InterComponentDependency => "inter_component_dependency",
            NodeKind::Vulnerability => "vulnerability",
            NodeKind::System => "system",
        }
    }

    /// Graph label, as written in relation diagrams.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Symbol => "Symbol",
            NodeKind::CallGraphDependency => "CallGraphDependency",
            NodeKind::Library => "Library",
            NodeKind::Component => "Component",
            NodeKind::Asset => "Asset",
            NodeKind::Binding => "Binding",
            NodeKind::Endpoint => "Endpoint",
            NodeKind::InterComponentDependency => "InterComponentDependency",
            NodeKind::Vulnerability => "Vulnerability",
            NodeKind::System => "System",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NodeKind {
    type Err = CoreError;

    /// Accepts either the snake_case name or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s) || kind.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownNodeKind {
                name: s.to_string(),
            })
    }
}

/// A versioned artifact reference: the identity of a Library, Component or
/// Asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub name: String,
    pub version: String,
}

impl ArtifactRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        ArtifactRef {
            name: name.into(),
            version: version.into(),
        }
    }

    /// A reference with an empty name or version names no artifact.
    pub fn is_blank(&self) -> bool {
        self.name.is_empty() || self.version.is_empty()
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A node of the dependency graph.
///
/// The transient propagation mark is not part of the node; it lives beside
/// it in the store so that clearing marks never rewrites structural data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// A callable unit of code.
    Symbol { identity: String },
    /// Reified "caller calls into these symbols" record, one per caller.
    CallGraphDependency,
    /// A versioned, reusable code artifact.
    Library(ArtifactRef),
    /// A versioned deployable service artifact.
    Component(ArtifactRef),
    /// A versioned hosting/infrastructure unit.
    Asset(ArtifactRef),
    /// States that its SPECIALIZES_INTO targets denote one deployed thing.
    Binding,
    /// A named network operation exposed by exactly one component.
    Endpoint { name: String, component: NodeId },
    /// Reified "endpoint calls these endpoints" record, one per caller.
    InterComponentDependency,
    /// A discovered flaw threatening one symbol.
    Vulnerability { identity: Option<String> },
    /// A named aggregate of components.
    System { name: String },
}

impl Node {
    pub fn symbol(identity: impl Into<String>) -> Self {
        Node::Symbol {
            identity: identity.into(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Symbol { .. } => NodeKind::Symbol,
            Node::CallGraphDependency => NodeKind::CallGraphDependency,
            Node::Library(_) => NodeKind::Library,
            Node::Component(_) => NodeKind::Component,
            Node::Asset(_) => NodeKind::Asset,
            Node::Binding => NodeKind::Binding,
            Node::Endpoint { .. } => NodeKind::Endpoint,
            Node::InterComponentDependency => NodeKind::InterComponentDependency,
            Node::Vulnerability { .. } => NodeKind::Vulnerability,
            Node::System { .. } => NodeKind::System,
        }
    }

    /// The uniqueness key of this node, or `None` for keyless nodes.
    ///
    /// A vulnerability without an identity is keyless: the registrar decides
    /// whether one may be created.
    pub fn key(&self) -> Option<NodeKey> {
        match self {
            Node::Symbol { identity } => Some(NodeKey::Symbol {
                identity: identity.clone(),
            }),
            Node::Library(artifact) => Some(NodeKey::Library(artifact.clone())),
            Node::Component(artifact) => Some(NodeKey::Component(artifact.clone())),
            Node::Asset(artifact) => Some(NodeKey::Asset(artifact.clone())),
            Node::Endpoint { name, component } => Some(NodeKey::Endpoint {
                name: name.clone(),
                component: *component,
            }),
            Node::Vulnerability {
                identity: Some(identity),
            } => Some(NodeKey::Vulnerability {
                identity: identity.clone(),
            }),
            Node::System { name } => Some(NodeKey::System { name: name.clone() }),
            Node::CallGraphDependency
            | Node::Binding
            | Node::InterComponentDependency
            | Node::Vulnerability { identity: None } => None,
        }
    }

    /// Short human-readable label, e.g. `Library: serde@1.0`.
    pub fn display_label(&self) -> String {
        match self {
            Node::Symbol { identity } => format!("Symbol: {identity}"),
            Node::Library(a) => format!("Library: {a}"),
            Node::Component(a) => format!("Component: {a}"),
            Node::Asset(a) => format!("Asset: {a}"),
            Node::Endpoint { name, .. } => format!("Endpoint: {name}"),
            Node::Vulnerability { identity } => format!(
                "Vulnerability: {}",
                identity.as_deref().unwrap_or("<unidentified>")
            ),
            Node::System { name } => format!("System: {name}"),
            other => other.kind().label().to_string(),
        }
    }
}

/// Uniqueness key of a node with a natural identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKey {
    Symbol { identity: String },
    Library(ArtifactRef),
    Component(ArtifactRef),
    Asset(ArtifactRef),
    Endpoint { name: String, component: NodeId },
    Vulnerability { identity: String },
    System { name: String },
}

impl NodeKey {
    pub fn symbol(identity: impl Into<String>) -> Self {
        NodeKey::Symbol {
            identity: identity.into(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeKey::Symbol { .. } => NodeKind::Symbol,
            NodeKey::Library(_) => NodeKind::Library,
            NodeKey::Component(_) => NodeKind::Component,
            NodeKey::Asset(_) => NodeKind::Asset,
            NodeKey::Endpoint { .. } => NodeKind::Endpoint,
            NodeKey::Vulnerability { .. } => NodeKind::Vulnerability,
            NodeKey::System { .. } => NodeKind::System,
        }
    }

    /// Unambiguous string form used as the store's unique index value.
    ///
    /// Every part is length-prefixed, so `("a:b", "c")` and `("a", "b:c")`
    /// never collide.
    pub fn canonical(&self) -> String {
        let component_id;
        let parts: Vec<&str> = match self {
            NodeKey::Symbol { identity } => vec![identity.as_str()],
            NodeKey::Library(a) | NodeKey::Component(a) | NodeKey::Asset(a) => {
                vec![a.name.as_str(), a.version.as_str()]
            }
            NodeKey::Endpoint { name, component } => {
                component_id = component.0.to_string();
                vec![name.as_str(), component_id.as_str()]
            }
            NodeKey::Vulnerability { identity } => vec![identity.as_str()],
            NodeKey::System { name } => vec![name.as_str()],
        };
        let mut out = String::from(self.kind().as_str());
        for part in parts {
            out.push(':');
            out.push_str(&part.len().to_string());
            out.push('#');
            out.push_str(part);
        }
        out
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Symbol { identity } => write!(f, "symbol '{identity}'"),
            NodeKey::Library(a) => write!(f, "library {a}"),
            NodeKey::Component(a) => write!(f, "component {a}"),
            NodeKey::Asset(a) => write!(f, "asset {a}"),
            NodeKey::Endpoint { name, component } => {
                write!(f, "endpoint '{name}' of node {component}")
            }
            NodeKey::Vulnerability { identity } => write!(f, "vulnerability '{identity}'"),
            NodeKey::System { name } => write!(f, "system '{name}'"),
        }
    }
}
