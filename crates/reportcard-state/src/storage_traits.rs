//! Storage trait definitions for reportcard
//!
//! The report cache is a key-value store: one [`CachedReport`] per
//! [`RepositoryIdentity`], replaced wholesale on every write.
//!
//! Backends are async and interchangeable. An in-memory fake is provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Flat report mapping: section name → section document, plus `report_grade`.
pub type ReportDocument = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// RepositoryIdentity
// ---------------------------------------------------------------------------

/// Canonical identity of a remote repository.
///
/// Construction normalizes the parts so that two spellings of the same
/// remote compare equal: the host is lowercased and a trailing `.git` is
/// dropped from the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    host: String,
    owner: String,
    name: String,
}

impl RepositoryIdentity {
    pub fn new(host: impl Into<String>, owner: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.strip_suffix(".git").map(str::to_string).unwrap_or(name);
        Self {
            host: host.into().to_ascii_lowercase(),
            owner: owner.into(),
            name,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical `host/owner/name` form.
    pub fn reference(&self) -> String {
        format!("{}/{}/{}", self.host, self.owner, self.name)
    }

    /// Storage key for this identity.
    pub fn key(&self) -> ReportKey {
        ReportKey::for_reference(&self.reference())
    }
}

impl std::fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// ReportKey
// ---------------------------------------------------------------------------

/// SHA-256 hex digest of a canonical repository reference.
///
/// Backends use it as a record id or file name, so it never contains path
/// separators or characters that need escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportKey(String);

impl ReportKey {
    pub fn for_reference(reference: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(reference.as_bytes());
        ReportKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReportKey {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidKey { key: s });
        }
        Ok(ReportKey(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ReportKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RevisionMarker
// ---------------------------------------------------------------------------

/// Opaque revision (commit hash) of a repository at resolution time.
///
/// Only equality is meaningful; there is no ordering between revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionMarker(String);

impl RevisionMarker {
    pub fn new(value: impl Into<String>) -> Self {
        RevisionMarker(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RevisionMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CachedReport
// ---------------------------------------------------------------------------

/// A persisted report: the analysis document of one repository at one
/// revision.
///
/// The report document is flattened so the stored shape is
/// `{identity, last_revision, cached_at, count, <analyzer>..., report_grade}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedReport {
    pub identity: RepositoryIdentity,
    pub last_revision: RevisionMarker,
    pub cached_at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: ReportDocument,
}

impl CachedReport {
    pub fn new(
        identity: RepositoryIdentity,
        last_revision: RevisionMarker,
        report: ReportDocument,
    ) -> Self {
        Self {
            identity,
            last_revision,
            cached_at: Utc::now(),
            report,
        }
    }
}

// ---------------------------------------------------------------------------
// ReportStore
// ---------------------------------------------------------------------------

/// Report cache keyed by repository identity.
///
/// Guarantees:
/// - `put` is an upsert: any prior entry for the same identity is replaced
///   wholesale, no keys of the old document survive.
/// - `get` returns exactly what the last `put` stored, or `None`.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Fetch the stored report for an identity, if any.
    async fn get(&self, identity: &RepositoryIdentity) -> StorageResult<Option<CachedReport>>;

    /// Insert or fully replace the report for `report.identity`.
    async fn put(&self, report: &CachedReport) -> StorageResult<()>;

    /// Remove the stored report. No-op if absent.
    async fn delete(&self, identity: &RepositoryIdentity) -> StorageResult<()>;
}
