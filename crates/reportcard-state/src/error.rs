//! Error types for reportcard-state

use thiserror::Error;

/// Errors raised while connecting to or preparing a backend
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),

    /// Filesystem error while preparing a store directory
    #[error("Store directory unavailable: {0}")]
    Io(#[from] std::io::Error),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Connection(err.to_string())
    }
}

/// Errors returned by [`crate::ReportStore`] operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure (query, connection, I/O)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored document could not be encoded or decoded
    #[error("report document is malformed for {reference}: {reason}")]
    Malformed { reference: String, reason: String },

    /// A storage key that is not a SHA-256 hex digest
    #[error("invalid report key: {key}")]
    InvalidKey { key: String },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
