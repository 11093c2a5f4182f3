//! Cache gateway: revision-keyed lookups and wholesale writes of reports.

use std::sync::Arc;

use reportcard_state::{CachedReport, ReportStore, RepositoryIdentity, RevisionMarker};

use crate::domain::error::{ReportCardError, Result};
use crate::domain::report::Report;
use crate::obs;

/// State of the cache for one identity at one revision.
#[derive(Debug, Clone)]
pub enum CacheStatus {
    /// Stored report matches the current revision.
    Fresh(CachedReport),
    /// A report exists but for an older revision.
    Stale(CachedReport),
    Missing,
}

pub struct CacheGateway {
    store: Arc<dyn ReportStore>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    pub async fn lookup(&self, identity: &RepositoryIdentity) -> Result<Option<CachedReport>> {
        Ok(self.store.get(identity).await?)
    }

    /// A cached report is fresh iff it was computed at `current`.
    pub fn is_fresh(cached: &CachedReport, current: &RevisionMarker) -> bool {
        cached.last_revision == *current
    }

    /// Look up `identity` and classify it against `current`.
    pub async fn check(
        &self,
        identity: &RepositoryIdentity,
        current: &RevisionMarker,
    ) -> Result<CacheStatus> {
        let reference = identity.reference();
        let status = match self.lookup(identity).await? {
            Some(cached) if Self::is_fresh(&cached, current) => {
                obs::emit_cache_hit(&reference, current.as_str());
                CacheStatus::Fresh(cached)
            }
            Some(cached) => {
                obs::emit_cache_miss(
                    &reference,
                    current.as_str(),
                    Some(cached.last_revision.as_str()),
                );
                CacheStatus::Stale(cached)
            }
            None => {
                obs::emit_cache_miss(&reference, current.as_str(), None);
                CacheStatus::Missing
            }
        };
        Ok(status)
    }

    /// Replace whatever is stored for `identity` with `report` at `revision`.
    pub async fn store(
        &self,
        identity: &RepositoryIdentity,
        revision: &RevisionMarker,
        report: &Report,
    ) -> Result<CachedReport> {
        let record = CachedReport::new(identity.clone(), revision.clone(), report.to_document());
        self.store.put(&record).await?;
        obs::emit_report_stored(
            &identity.reference(),
            revision.as_str(),
            report.grade().as_str(),
        );
        Ok(record)
    }

    pub async fn evict(&self, identity: &RepositoryIdentity) -> Result<()> {
        Ok(self.store.delete(identity).await?)
    }

    /// Parse the report portion of a cached record.
    pub fn decode(cached: &CachedReport) -> Result<Report> {
        Report::try_from(cached.report.clone()).map_err(|reason| {
            ReportCardError::Document(format!("{}: {reason}", cached.identity))
        })
    }
}
