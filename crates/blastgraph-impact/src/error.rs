//! Error types for the impact layer.
//!
//! [`ImpactError`] is what every public operation returns. Best-effort
//! operations collect per-target failures and report them together as one
//! [`PartialFailure`]; the targets that succeeded stay committed.

use std::fmt;

use thiserror::Error;

use blastgraph_core::NodeKind;
use blastgraph_storage::StorageError;

use crate::propagation::Stage;

/// Errors produced by impact-layer operations.
#[derive(Debug, Error)]
pub enum ImpactError {
    /// A referenced node must already exist but does not.
    #[error("{kind} not found: {key}")]
    NotFound { kind: NodeKind, key: String },

    /// The request itself is malformed.
    #[error("invalid request: {reason}")]
    Invalid { reason: String },

    /// Some targets of a multi-target operation failed.
    #[error(transparent)]
    PartialFailure(#[from] PartialFailure),

    /// The store failed outside a propagation stage.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A propagation stage failed. Marks committed earlier persist.
    #[error("propagation stage {stage} failed: {error}")]
    StageFailed {
        stage: Stage,
        #[source]
        error: StorageError,
    },

    /// The run deadline expired before the named stage could commit.
    #[error("propagation deadline exceeded before stage {stage}")]
    DeadlineExceeded { stage: Stage },
}

impl ImpactError {
    pub fn not_found(kind: NodeKind, key: impl fmt::Display) -> Self {
        ImpactError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        ImpactError::Invalid {
            reason: reason.into(),
        }
    }
}

/// One failed target of a best-effort operation.
#[derive(Debug)]
pub struct TargetFailure {
    /// Human-readable description of the target, e.g. `endpoint /login of api@1`.
    pub target: String,
    pub error: ImpactError,
}

/// Aggregate of every failed target of a best-effort operation.
#[derive(Debug, Error)]
#[error("{}", self.render())]
pub struct PartialFailure {
    /// How many targets were attempted in total.
    pub attempted: usize,
    pub failures: Vec<TargetFailure>,
}

impl PartialFailure {
    /// `"<failed> of <attempted> targets failed: <target>: <error>; ..."`
    fn render(&self) -> String {
        let targets: Vec<String> = self
            .failures
            .iter()
            .map(|failure| format!("{}: {}", failure.target, failure.error))
            .collect();
        let summary = format!("{} of {} targets failed", self.failures.len(), self.attempted);
        if targets.is_empty() {
            summary
        } else {
            format!("{summary}: {}", targets.join("; "))
        }
    }
}
