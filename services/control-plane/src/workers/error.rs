//! Worker operation errors.

use std::time::Duration;

use fleet_reconcile::{StoreError, TemplateError};
use thiserror::Error;

use crate::model::cloud::CloudSpecError;
use crate::version::VersionError;

/// Errors surfaced by worker operations.
///
/// Each variant maps to one stable client-facing code, see [`WorkerError::code`].
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The requested worker, cluster or record does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// A write collided with a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request is malformed. Never retried.
    #[error("{0}")]
    Validation(String),

    /// A backing store failed.
    #[error("upstream store failure: {0}")]
    Upstream(#[source] StoreError),

    /// The machine could not be built from the request.
    #[error("failed to create machine from template: {0}")]
    Templating(#[from] TemplateError),

    /// The request deadline passed before the operation finished.
    #[error("operation did not complete within {0:?}")]
    Timeout(Duration),
}

impl WorkerError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Stable taxonomy code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation_failed",
            Self::Upstream(_) => "upstream_unavailable",
            Self::Templating(_) => "templating_failed",
            Self::Timeout(_) => "deadline_exceeded",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Upstream(_) | Self::Timeout(_))
    }
}

impl From<StoreError> for WorkerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, key } => Self::NotFound {
                kind,
                name: key.name,
            },
            StoreError::AlreadyExists { .. } | StoreError::Conflict { .. } => {
                Self::Conflict(err.to_string())
            }
            StoreError::Unavailable(_) => Self::Upstream(err),
        }
    }
}

impl From<CloudSpecError> for WorkerError {
    fn from(err: CloudSpecError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<VersionError> for WorkerError {
    fn from(err: VersionError) -> Self {
        Self::Validation(err.to_string())
    }
}
