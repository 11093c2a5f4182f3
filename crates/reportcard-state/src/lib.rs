//! reportcard-state: report cache persistence
//!
//! This crate is the persistence layer of reportcard. It stores one graded
//! report per repository identity and hands it back for staleness checks.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: wholesale replacement of documents, never partial merges.
//!
//! ## Key Components
//!
//! - `ReportStore`: async key-value contract (get/put/delete by identity)
//! - `FsReportStore`: one JSON document per identity on disk
//! - `SurrealReportStore`: `repositories` table in SurrealDB
//! - `fakes::MemoryReportStore`: in-memory store for tests

mod error;
pub mod fakes;
mod fs_store;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use fs_store::FsReportStore;
pub use schema::RepositoryRow;
pub use storage_traits::{
    CachedReport, ReportDocument, ReportKey, ReportStore, RepositoryIdentity, RevisionMarker,
    StorageResult,
};
pub use surreal_store::{SurrealConfig, SurrealCredentials, SurrealReportStore};

/// Result type for reportcard-state setup operations
pub type Result<T> = std::result::Result<T, StateError>;
