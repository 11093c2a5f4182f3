//! reportcard core library
//!
//! Domain types, repository fingerprints, transient workspaces and the
//! report cache gateway.

pub mod cache;
pub mod domain;
pub mod fakes;
pub mod fingerprint;
pub mod git;
pub mod obs;
pub mod telemetry;
pub mod workspace;

pub use cache::{CacheGateway, CacheStatus};
pub use domain::{
    FingerprintError, Grade, Report, ReportCardError, Result, WorkspaceError,
};
pub use domain::report::GRADE_KEY;
pub use fingerprint::{resolve, RemoteRepository};
pub use git::GitRemote;
pub use telemetry::init_tracing;
pub use workspace::{remove_tree, Workspace, WorkspaceManager};

pub use reportcard_state::{
    CachedReport, ReportDocument, ReportStore, RepositoryIdentity, RevisionMarker,
};
