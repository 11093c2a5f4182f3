//! SurrealDB row types for the report cache
//!
//! These map the backend's row layout; [`crate::storage_traits`] types are
//! converted at the boundary in [`crate::surreal_store`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{CachedReport, RepositoryIdentity, RevisionMarker};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// One row of the `repositories` table.
///
/// The report document is kept as a JSON string so the backend never
/// reinterprets analyzer payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRow {
    /// Canonical `host/owner/name`
    pub reference: String,
    pub identity: RepositoryIdentity,
    pub last_revision: String,
    #[serde(with = "surreal_datetime")]
    pub cached_at: DateTime<Utc>,
    pub document: String,
}

impl RepositoryRow {
    pub fn from_report(report: &CachedReport) -> Result<Self, StorageError> {
        let document =
            serde_json::to_string(&report.report).map_err(|e| StorageError::Malformed {
                reference: report.identity.reference(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            reference: report.identity.reference(),
            identity: report.identity.clone(),
            last_revision: report.last_revision.as_str().to_string(),
            cached_at: report.cached_at,
            document,
        })
    }

    pub fn into_report(self) -> Result<CachedReport, StorageError> {
        let report =
            serde_json::from_str(&self.document).map_err(|e| StorageError::Malformed {
                reference: self.reference.clone(),
                reason: e.to_string(),
            })?;
        Ok(CachedReport {
            identity: self.identity,
            last_revision: RevisionMarker::new(self.last_revision),
            cached_at: self.cached_at,
            report,
        })
    }
}
