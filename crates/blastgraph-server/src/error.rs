//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the unified error type for all API endpoints. It implements
//! `axum::response::IntoResponse` to produce structured JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use blastgraph_impact::{ImpactError, PartialFailure};
use blastgraph_storage::StorageError;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "PARTIAL_FAILURE").
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// One failed target of a partially applied request.
#[derive(Debug, Clone, Serialize)]
pub struct FailedTarget {
    pub target: String,
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Referenced entity does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Some targets failed; the others were applied (422).
    #[error("partial failure: {message}")]
    PartialFailure {
        message: String,
        attempted: usize,
        failures: Vec<FailedTarget>,
    },

    /// The propagation deadline expired (504). Earlier marks persist.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, details) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", None),
            ApiError::PartialFailure {
                attempted,
                failures,
                ..
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PARTIAL_FAILURE",
                Some(serde_json::json!({
                    "attempted": attempted,
                    "failures": failures,
                })),
            ),
            ApiError::DeadlineExceeded(_) => {
                (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED", None)
            }
            ApiError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None)
            }
        };

        let message = match &self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::DeadlineExceeded(msg)
            | ApiError::InternalError(msg) => msg.clone(),
            ApiError::PartialFailure { message, .. } => message.clone(),
        };

        let body = serde_json::json!({
            "success": false,
            "error": ApiErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<PartialFailure> for ApiError {
    fn from(err: PartialFailure) -> Self {
        ApiError::PartialFailure {
            message: err.to_string(),
            attempted: err.attempted,
            failures: err
                .failures
                .iter()
                .map(|f| FailedTarget {
                    target: f.target.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

impl From<ImpactError> for ApiError {
    fn from(err: ImpactError) -> Self {
        match err {
            ImpactError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            ImpactError::Invalid { .. } => ApiError::BadRequest(err.to_string()),
            ImpactError::PartialFailure(partial) => partial.into(),
            ImpactError::DeadlineExceeded { .. } => ApiError::DeadlineExceeded(err.to_string()),
            ImpactError::Storage(storage) => storage.into(),
            ImpactError::StageFailed { .. } => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NodeNotFound { .. } => ApiError::NotFound(err.to_string()),
            StorageError::Core(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::InternalError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastgraph_core::NodeKind;
    use blastgraph_impact::{Stage, TargetFailure};

    #[test]
    fn impact_errors_map_to_statuses() {
        let cases = [
            (ImpactError::not_found(NodeKind::Symbol, "g"), StatusCode::NOT_FOUND),
            (ImpactError::invalid("empty"), StatusCode::BAD_REQUEST),
            (
                ImpactError::DeadlineExceeded {
                    stage: Stage::LateralMovement,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ImpactError::StageFailed {
                    stage: Stage::AllSystems,
                    error: StorageError::NoTransaction,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn partial_failure_keeps_per_target_details() {
        let err = ApiError::from(ImpactError::PartialFailure(PartialFailure {
            attempted: 2,
            failures: vec![TargetFailure {
                target: "symbol 'x'".into(),
                error: ImpactError::not_found(NodeKind::Symbol, "x"),
            }],
        }));
        match &err {
            ApiError::PartialFailure {
                attempted,
                failures,
                ..
            } => {
                assert_eq!(*attempted, 2);
                assert_eq!(failures[0].target, "symbol 'x'");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
