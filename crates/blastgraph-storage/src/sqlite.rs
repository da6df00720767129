//! SQLite implementation of [`GraphStore`].
//!
//! [`SqliteStore`] persists the graph in two tables, `nodes` and `edges`.
//! Node payloads are stored as JSON TEXT via serde_json; the canonical
//! [`NodeKey`] sits in a UNIQUE column so the database itself enforces node
//! identity. The outermost transaction is opened with `BEGIN IMMEDIATE`,
//! taking the write lock up front so concurrent writers cannot interleave a
//! check-then-create. Nested levels are savepoints.

use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use blastgraph_core::{DependencyGraph, Node, NodeId, NodeKey, NodeKind, NodeRecord, Relation};

use crate::error::StorageError;
use crate::traits::GraphStore;

/// SQLite-backed implementation of [`GraphStore`].
pub struct SqliteStore {
    conn: Connection,
    /// Open transaction levels: 0 = none, 1 = BEGIN, n > 1 = savepoints.
    depth: usize,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn, depth: 0 })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn, depth: 0 })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn exists(&self, id: NodeId) -> Result<bool, StorageError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM nodes WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn assert_exists(&self, id: NodeId) -> Result<(), StorageError> {
        if self.exists(id)? {
            Ok(())
        } else {
            Err(StorageError::NodeNotFound { id })
        }
    }

    fn id_list(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<NodeId>, StorageError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, u32>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(NodeId(row?));
        }
        Ok(out)
    }
}

impl GraphStore for SqliteStore {
    fn begin(&mut self) -> Result<(), StorageError> {
        if self.depth == 0 {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
        } else {
            self.conn
                .execute_batch(&format!("SAVEPOINT sp_{}", self.depth))?;
        }
        self.depth += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let level = self.depth.checked_sub(1).ok_or(StorageError::NoTransaction)?;
        if level == 0 {
            self.conn.execute_batch("COMMIT")?;
        } else {
            self.conn.execute_batch(&format!("RELEASE sp_{level}"))?;
        }
        self.depth = level;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        let level = self.depth.checked_sub(1).ok_or(StorageError::NoTransaction)?;
        // The level is closed even if the statement fails.
        self.depth = level;
        if level == 0 {
            self.conn.execute_batch("ROLLBACK")?;
        } else {
            self.conn
                .execute_batch(&format!("ROLLBACK TO sp_{level}; RELEASE sp_{level}"))?;
        }
        Ok(())
    }

    fn insert_node(&mut self, node: &Node) -> Result<NodeId, StorageError> {
        let key = node.key().map(|k| k.canonical());
        let node_json = serde_json::to_string(node)?;
        let changed = self.conn.execute(
            "INSERT INTO nodes (kind, unique_key, node_json) VALUES (?1, ?2, ?3)
             ON CONFLICT(unique_key) DO NOTHING",
            params![node.kind().as_str(), key, node_json],
        )?;
        if changed == 0 {
            return Err(StorageError::UniqueViolation {
                key: key.unwrap_or_default(),
            });
        }
        let rowid = self.conn.last_insert_rowid();
        match u32::try_from(rowid) {
            Ok(id) => Ok(NodeId(id)),
            Err(_) => {
                self.conn
                    .execute("DELETE FROM nodes WHERE id = ?1", params![rowid])?;
                Err(StorageError::IdOverflow { rowid })
            }
        }
    }

    fn get_node(&self, id: NodeId) -> Result<Node, StorageError> {
        let node_json: Option<String> = self
            .conn
            .query_row(
                "SELECT node_json FROM nodes WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        let node_json = node_json.ok_or(StorageError::NodeNotFound { id })?;
        Ok(serde_json::from_str(&node_json)?)
    }

    fn node_kind(&self, id: NodeId) -> Result<NodeKind, StorageError> {
        let kind: Option<String> = self
            .conn
            .query_row("SELECT kind FROM nodes WHERE id = ?1", params![id.0], |row| {
                row.get(0)
            })
            .optional()?;
        let kind = kind.ok_or(StorageError::NodeNotFound { id })?;
        Ok(NodeKind::from_str(&kind)?)
    }

    fn find_node(&self, key: &NodeKey) -> Result<Option<NodeId>, StorageError> {
        let id: Option<u32> = self
            .conn
            .query_row(
                "SELECT id FROM nodes WHERE unique_key = ?1",
                params![key.canonical()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(NodeId))
    }

    fn nodes_of_kind(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError> {
        self.id_list(
            "SELECT id FROM nodes WHERE kind = ?1 ORDER BY id",
            params![kind.as_str()],
        )
    }

    fn insert_edge(
        &mut self,
        source: NodeId,
        relation: Relation,
        target: NodeId,
    ) -> Result<bool, StorageError> {
        let from = self.node_kind(source)?;
        let to = self.node_kind(target)?;
        relation.check(from, to)?;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO edges (source_id, relation, target_id) VALUES (?1, ?2, ?3)",
            params![source.0, relation.as_str(), target.0],
        )?;
        Ok(changed == 1)
    }

    fn targets(&self, source: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError> {
        self.assert_exists(source)?;
        self.id_list(
            "SELECT target_id FROM edges WHERE source_id = ?1 AND relation = ?2 ORDER BY target_id",
            params![source.0, relation.as_str()],
        )
    }

    fn sources(&self, target: NodeId, relation: Relation) -> Result<Vec<NodeId>, StorageError> {
        self.assert_exists(target)?;
        self.id_list(
            "SELECT source_id FROM edges WHERE target_id = ?1 AND relation = ?2 ORDER BY source_id",
            params![target.0, relation.as_str()],
        )
    }

    fn is_marked(&self, id: NodeId) -> Result<bool, StorageError> {
        let mark: Option<bool> = self
            .conn
            .query_row("SELECT mark FROM nodes WHERE id = ?1", params![id.0], |row| {
                row.get(0)
            })
            .optional()?;
        mark.ok_or(StorageError::NodeNotFound { id })
    }

    fn marked_nodes(&self, kind: NodeKind) -> Result<Vec<NodeId>, StorageError> {
        self.id_list(
            "SELECT id FROM nodes WHERE kind = ?1 AND mark = 1 ORDER BY id",
            params![kind.as_str()],
        )
    }

    fn mark_nodes(&mut self, ids: &[NodeId]) -> Result<usize, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.atomically(|store| {
            let mut newly = 0;
            for id in ids {
                let changed = store.conn.execute(
                    "UPDATE nodes SET mark = 1 WHERE id = ?1 AND mark = 0",
                    params![id.0],
                )?;
                if changed == 0 {
                    store.assert_exists(*id)?;
                }
                newly += changed;
            }
            Ok(newly)
        })
    }

    fn clear_marks(&mut self) -> Result<usize, StorageError> {
        Ok(self
            .conn
            .execute("UPDATE nodes SET mark = 0 WHERE mark = 1", [])?)
    }

    fn load_graph(&self) -> Result<DependencyGraph, StorageError> {
        let nodes = {
            let mut stmt = self
                .conn
                .prepare_cached("SELECT id, node_json, mark FROM nodes ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                let id: u32 = row.get(0)?;
                let node_json: String = row.get(1)?;
                let marked: bool = row.get(2)?;
                Ok((id, node_json, marked))
            })?;
            let mut result = Vec::new();
            for row in rows {
                let (id, node_json, marked) = row?;
                let node: Node = serde_json::from_str(&node_json)?;
                result.push((NodeId(id), NodeRecord { node, marked }));
            }
            result
        };

        let edges = {
            let mut stmt = self.conn.prepare_cached(
                "SELECT source_id, relation, target_id FROM edges ORDER BY source_id, relation, target_id",
            )?;
            let rows = stmt.query_map([], |row| {
                let source: u32 = row.get(0)?;
                let relation: String = row.get(1)?;
                let target: u32 = row.get(2)?;
                Ok((source, relation, target))
            })?;
            let mut result = Vec::new();
            for row in rows {
                let (source, relation, target) = row?;
                let relation = Relation::from_str(&relation)?;
                result.push((NodeId(source), relation, NodeId(target)));
            }
            result
        };

        Ok(DependencyGraph::from_parts(nodes, edges)?)
    }

    fn remove_nodes_of_kind(&mut self, kind: NodeKind) -> Result<usize, StorageError> {
        self.atomically(|store| {
            store.conn.execute(
                "DELETE FROM edges
                 WHERE source_id IN (SELECT id FROM nodes WHERE kind = ?1)
                    OR target_id IN (SELECT id FROM nodes WHERE kind = ?1)",
                params![kind.as_str()],
            )?;
            Ok(store
                .conn
                .execute("DELETE FROM nodes WHERE kind = ?1", params![kind.as_str()])?)
        })
    }

    fn reset(&mut self) -> Result<(), StorageError> {
        self.atomically(|store| {
            store.conn.execute("DELETE FROM edges", [])?;
            store.conn.execute("DELETE FROM nodes", [])?;
            Ok(())
        })
    }
}
