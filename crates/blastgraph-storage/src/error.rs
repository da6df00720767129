//! Storage error types for blastgraph-storage.
//!
//! [`StorageError`] covers the failure modes of every backend: SQLite and
//! serialization failures, missing nodes, uniqueness conflicts, transaction
//! misuse, and transient unavailability that the retry boundary may absorb.

use blastgraph_core::{CoreError, NodeId};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A node id was not found.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// A node with the same uniqueness key already exists.
    #[error("unique constraint violated: {key}")]
    UniqueViolation { key: String },

    /// A data model rule was violated.
    #[error(transparent)]
    Core(CoreError),

    /// The store is temporarily unable to serve the request.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// SQLite assigned a row id that does not fit a [`NodeId`].
    #[error("node id {rowid} exceeds the supported range")]
    IdOverflow { rowid: i64 },

    /// `commit` or `rollback` was called with no open transaction.
    #[error("no open transaction")]
    NoTransaction,

    /// A transient failure persisted through every retry.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<StorageError>,
    },
}

impl StorageError {
    /// Returns `true` for failures worth retrying: explicit unavailability
    /// and SQLite busy/locked conditions.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Unavailable { .. } => true,
            StorageError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StorageError::UniqueViolation { .. })
    }
}

impl From<CoreError> for StorageError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DuplicateKey { key } => StorageError::UniqueViolation { key },
            CoreError::NodeNotFound { id } => StorageError::NodeNotFound { id },
            other => StorageError::Core(other),
        }
    }
}
