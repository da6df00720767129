//! Vulnerability registration and propagation seeding.
//!
//! This is the only code that marks a Symbol directly: registering a new
//! vulnerability marks its threatened symbol, and [`seed`] starts a run by
//! clearing every mark and re-marking only that symbol.

use serde::Serialize;

use blastgraph_core::{Node, NodeId, NodeKey, NodeKind, Relation};
use blastgraph_storage::{GraphStore, StorageError};

use crate::error::ImpactError;

/// Outcome of [`create_vulnerability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Registration {
    /// A new vulnerability was recorded and its symbol marked.
    Created { vulnerability: NodeId, symbol: NodeId },
    /// A matching vulnerability already existed; nothing changed.
    Existing { vulnerability: NodeId },
}

impl Registration {
    pub fn vulnerability(&self) -> NodeId {
        match self {
            Registration::Created { vulnerability, .. } | Registration::Existing { vulnerability } => {
                *vulnerability
            }
        }
    }
}

/// The marked starting point of a propagation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Seed {
    pub vulnerability: NodeId,
    pub symbol: NodeId,
    /// Marks left by earlier runs, cleared before seeding.
    pub cleared: usize,
}

/// Existence rule for vulnerabilities: identities match when equal, or when
/// either side has no identity.
pub fn identity_matches(existing: Option<&str>, given: Option<&str>) -> bool {
    match (existing, given) {
        (Some(existing), Some(given)) => existing == given,
        _ => true,
    }
}

/// An empty identity is treated as no identity.
fn normalize(identity: Option<&str>) -> Option<&str> {
    identity.filter(|id| !id.is_empty())
}

/// Records that a vulnerability threatens `symbol` and marks the symbol.
///
/// A no-op when any existing vulnerability matches under
/// [`identity_matches`]. The symbol must exist; if it does not, nothing is
/// created or marked.
pub fn create_vulnerability<S: GraphStore>(
    store: &mut S,
    identity: Option<&str>,
    symbol: &str,
) -> Result<Registration, ImpactError> {
    let identity = normalize(identity);
    let registered = store.atomically(|s| {
        if let Some(vulnerability) = find_vulnerability(s, |existing| identity_matches(existing, identity))? {
            return Ok(Some(Registration::Existing { vulnerability }));
        }
        let Some(symbol_id) = s.find_node(&NodeKey::symbol(symbol))? else {
            return Ok(None);
        };
        s.mark_nodes(&[symbol_id])?;
        let vulnerability = s.insert_node(&Node::Vulnerability {
            identity: identity.map(str::to_string),
        })?;
        s.insert_edge(vulnerability, Relation::Threatens, symbol_id)?;
        Ok(Some(Registration::Created {
            vulnerability,
            symbol: symbol_id,
        }))
    })?;

    let registration = registered.ok_or_else(|| ImpactError::not_found(NodeKind::Symbol, symbol))?;
    match registration {
        Registration::Created { vulnerability, symbol: seed } => tracing::info!(
            vulnerability = %vulnerability,
            identity = identity.unwrap_or("<none>"),
            seed = %seed,
            "vulnerability registered"
        ),
        Registration::Existing { vulnerability } => tracing::debug!(
            vulnerability = %vulnerability,
            "matching vulnerability exists"
        ),
    }
    Ok(registration)
}

/// Clears every mark, then marks the threatened symbol of the vulnerability
/// with exactly this identity (no identity matches only no identity).
///
/// Both happen in one transaction. An unknown vulnerability leaves the
/// marks untouched.
pub fn seed<S: GraphStore>(store: &mut S, identity: Option<&str>) -> Result<Seed, ImpactError> {
    let identity = normalize(identity);
    let vulnerability = find_vulnerability(store, |existing| existing == identity)?
        .ok_or_else(|| {
            ImpactError::not_found(NodeKind::Vulnerability, identity.unwrap_or("<unidentified>"))
        })?;
    let symbol = store
        .targets(vulnerability, Relation::Threatens)?
        .first()
        .copied()
        .ok_or_else(|| {
            ImpactError::invalid(format!("vulnerability {vulnerability} threatens no symbol"))
        })?;
    let cleared = store.atomically(|s| {
        let cleared = s.clear_marks()?;
        s.mark_nodes(&[symbol])?;
        Ok(cleared)
    })?;
    tracing::debug!(vulnerability = %vulnerability, seed = %symbol, cleared, "propagation seeded");
    Ok(Seed {
        vulnerability,
        symbol,
        cleared,
    })
}

/// First vulnerability, by id, whose identity satisfies `pred`.
fn find_vulnerability<S: GraphStore>(
    store: &S,
    pred: impl Fn(Option<&str>) -> bool,
) -> Result<Option<NodeId>, StorageError> {
    for id in store.nodes_of_kind(NodeKind::Vulnerability)? {
        if let Node::Vulnerability { identity } = store.get_node(id)? {
            if pred(identity.as_deref()) {
                return Ok(Some(id));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastgraph_storage::InMemoryStore;

    #[test]
    fn three_way_match() {
        assert!(identity_matches(Some("CVE-1"), Some("CVE-1")));
        assert!(!identity_matches(Some("CVE-1"), Some("CVE-2")));
        assert!(identity_matches(None, Some("CVE-2")));
        assert!(identity_matches(Some("CVE-1"), None));
        assert!(identity_matches(None, None));
    }

    #[test]
    fn registering_twice_creates_one_node_and_one_mark() {
        let mut store = InMemoryStore::new();
        let g = store.insert_node(&Node::symbol("g")).unwrap();

        let first = create_vulnerability(&mut store, Some("CVE-1"), "g").unwrap();
        let second = create_vulnerability(&mut store, Some("CVE-1"), "g").unwrap();

        assert!(matches!(first, Registration::Created { symbol, .. } if symbol == g));
        assert_eq!(second, Registration::Existing { vulnerability: first.vulnerability() });
        assert_eq!(store.nodes_of_kind(NodeKind::Vulnerability).unwrap().len(), 1);
        assert!(store.is_marked(g).unwrap());
    }

    #[test]
    fn unidentified_vulnerability_blocks_every_other() {
        let mut store = InMemoryStore::new();
        store.insert_node(&Node::symbol("g")).unwrap();
        store.insert_node(&Node::symbol("h")).unwrap();

        create_vulnerability(&mut store, None, "g").unwrap();
        let other = create_vulnerability(&mut store, Some("CVE-9"), "h").unwrap();
        assert!(matches!(other, Registration::Existing { .. }));
        assert!(!store.is_marked(store.find_node(&NodeKey::symbol("h")).unwrap().unwrap()).unwrap());
    }

    #[test]
    fn missing_symbol_creates_nothing() {
        let mut store = InMemoryStore::new();
        let err = create_vulnerability(&mut store, Some("CVE-1"), "nope").unwrap_err();
        assert!(matches!(
            err,
            ImpactError::NotFound {
                kind: NodeKind::Symbol,
                ..
            }
        ));
        assert!(store.nodes_of_kind(NodeKind::Vulnerability).unwrap().is_empty());
    }

    #[test]
    fn seed_uses_exact_identity() {
        let mut store = InMemoryStore::new();
        let g = store.insert_node(&Node::symbol("g")).unwrap();
        create_vulnerability(&mut store, Some("CVE-1"), "g").unwrap();
        store.clear_marks().unwrap();

        assert!(matches!(
            seed(&mut store, None),
            Err(ImpactError::NotFound {
                kind: NodeKind::Vulnerability,
                ..
            })
        ));
        let s = seed(&mut store, Some("CVE-1")).unwrap();
        assert_eq!(s.symbol, g);
        assert_eq!(s.cleared, 0);
        assert!(store.is_marked(g).unwrap());
    }

    #[test]
    fn seed_clears_marks_of_earlier_runs() {
        let mut store = InMemoryStore::new();
        let g = store.insert_node(&Node::symbol("g")).unwrap();
        let h = store.insert_node(&Node::symbol("h")).unwrap();
        create_vulnerability(&mut store, Some("CVE-1"), "g").unwrap();
        store.mark_nodes(&[h]).unwrap();

        let s = seed(&mut store, Some("CVE-1")).unwrap();
        assert_eq!(s.cleared, 2);
        assert!(store.is_marked(g).unwrap());
        assert!(!store.is_marked(h).unwrap());

        // an unknown identity leaves the marks alone
        assert!(seed(&mut store, Some("CVE-404")).is_err());
        assert!(store.is_marked(g).unwrap());
    }
}
