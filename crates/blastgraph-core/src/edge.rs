//! Typed, directed relations between graph nodes.
//!
//! Each [`Relation`] admits a fixed set of (source kind, target kind) pairs.
//! The graph and every store reject edges outside that schema with
//! [`CoreError::InvalidRelation`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::node::NodeKind;

/// Edge types of the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// Library provides a symbol.
    Provides,
    /// Dependency record points at its calling symbol or endpoint.
    Caller,
    /// Dependency record points at a called symbol or endpoint.
    Callees,
    /// Binding refines into a library, component or asset.
    SpecializesInto,
    /// Endpoint is exposed by a component.
    Exposes,
    /// Endpoint is implemented by a symbol.
    Serves,
    /// Component runs on an asset.
    HostedBy,
    /// System aggregates a component.
    ComposedOf,
    /// Vulnerability threatens a symbol.
    Threatens,
}

impl Relation {
    pub const ALL: [Relation; 9] = [
        Relation::Provides,
        Relation::Caller,
        Relation::Callees,
        Relation::SpecializesInto,
        Relation::Exposes,
        Relation::Serves,
        Relation::HostedBy,
        Relation::ComposedOf,
        Relation::Threatens,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Provides => "PROVIDES",
            Relation::Caller => "CALLER",
            Relation::Callees => "CALLEES",
            Relation::SpecializesInto => "SPECIALIZES_INTO",
            Relation::Exposes => "EXPOSES",
            Relation::Serves => "SERVES",
            Relation::HostedBy => "HOSTED_BY",
            Relation::ComposedOf => "COMPOSED_OF",
            Relation::Threatens => "THREATENS",
        }
    }

    /// Returns `true` if this relation may connect `from` to `to`.
    pub fn permits(&self, from: NodeKind, to: NodeKind) -> bool {
        use NodeKind::*;
        match self {
            Relation::Provides => from == Library && to == Symbol,
            Relation::Caller | Relation::Callees => matches!(
                (from, to),
                (CallGraphDependency, Symbol) | (InterComponentDependency, Endpoint)
            ),
            Relation::SpecializesInto => {
                from == Binding && matches!(to, Library | Component | Asset)
            }
            Relation::Exposes => from == Endpoint && to == Component,
            Relation::Serves => from == Endpoint && to == Symbol,
            Relation::HostedBy => from == Component && to == Asset,
            Relation::ComposedOf => from == System && to == Component,
            Relation::Threatens => from == Vulnerability && to == Symbol,
        }
    }

    /// Validates an edge against the schema.
    pub fn check(&self, from: NodeKind, to: NodeKind) -> Result<(), CoreError> {
        if self.permits(from, to) {
            Ok(())
        } else {
            Err(CoreError::InvalidRelation {
                relation: *self,
                from,
                to,
            })
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Relation::ALL
            .into_iter()
            .find(|relation| relation.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownRelation {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_and_callees_span_both_dependency_layers() {
        for relation in [Relation::Caller, Relation::Callees] {
            assert!(relation.permits(NodeKind::CallGraphDependency, NodeKind::Symbol));
            assert!(relation.permits(NodeKind::InterComponentDependency, NodeKind::Endpoint));
            assert!(!relation.permits(NodeKind::CallGraphDependency, NodeKind::Endpoint));
            assert!(!relation.permits(NodeKind::InterComponentDependency, NodeKind::Symbol));
        }
    }

    #[test]
    fn specializes_into_targets() {
        let r = Relation::SpecializesInto;
        assert!(r.permits(NodeKind::Binding, NodeKind::Library));
        assert!(r.permits(NodeKind::Binding, NodeKind::Component));
        assert!(r.permits(NodeKind::Binding, NodeKind::Asset));
        assert!(!r.permits(NodeKind::Binding, NodeKind::Symbol));
        assert!(!r.permits(NodeKind::Library, NodeKind::Component));
    }

    #[test]
    fn hosted_by_is_component_to_asset_only() {
        assert!(Relation::HostedBy.permits(NodeKind::Component, NodeKind::Asset));
        assert!(!Relation::HostedBy.permits(NodeKind::Asset, NodeKind::Component));
    }

    #[test]
    fn check_reports_the_offending_pair() {
        let err = Relation::Threatens
            .check(NodeKind::Vulnerability, NodeKind::Library)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid relation: Vulnerability -[THREATENS]-> Library"
        );
    }

    #[test]
    fn relation_names_roundtrip() {
        for relation in Relation::ALL {
            assert_eq!(relation.as_str().parse::<Relation>().unwrap(), relation);
        }
        let json = serde_json::to_string(&Relation::SpecializesInto).unwrap();
        assert_eq!(json, "\"SPECIALIZES_INTO\"");
    }
}
