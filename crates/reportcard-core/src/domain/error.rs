//! Domain-level error taxonomy for reportcard.

use std::time::Duration;

use reportcard_state::StorageError;

/// Errors from resolving a repository reference or its current revision.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("invalid repository reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("repository not found or not accessible: {reference} ({reason})")]
    Unreachable { reference: String, reason: String },
}

/// Errors from materializing or removing a workspace.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("clone of {reference} timed out after {timeout:?}")]
    CloneTimeout { reference: String, timeout: Duration },

    #[error("clone of {reference} failed: {reason}")]
    CloneFailed { reference: String, reason: String },

    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level errors. None of these produce a report or a cache write.
#[derive(Debug, thiserror::Error)]
pub enum ReportCardError {
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("report document error: {0}")]
    Document(String),

    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReportCardError {
    /// Whether the caller should be told "repository not found/accessible".
    pub fn is_inaccessible(&self) -> bool {
        matches!(
            self,
            ReportCardError::Fingerprint(FingerprintError::Unreachable { .. })
                | ReportCardError::Workspace(WorkspaceError::CloneTimeout { .. })
                | ReportCardError::Workspace(WorkspaceError::CloneFailed { .. })
        )
    }
}

/// Result type for reportcard domain operations.
pub type Result<T> = std::result::Result<T, ReportCardError>;
