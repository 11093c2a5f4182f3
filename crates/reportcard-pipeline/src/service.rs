//! End-to-end grading of remote repositories with revision-keyed caching.

use std::sync::Arc;

use reportcard_core::obs::request_span;
use reportcard_core::{
    resolve, CacheGateway, CacheStatus, CachedReport, RemoteRepository, Report, ReportCardError,
    ReportStore, RepositoryIdentity, Result, WorkspaceManager,
};
use tracing::{info, Instrument};

use crate::config::Settings;
use crate::pipeline::AnalysisPipeline;

/// Result of one grading request.
#[derive(Debug, Clone)]
pub struct GradeOutcome {
    /// The stored record, exactly as persisted.
    pub record: CachedReport,
    pub report: Report,
    /// `true` when no clone and no analysis happened.
    pub cache_hit: bool,
}

/// Resolve → fetch revision → cache check → clone → analyze → store.
pub struct ReportCard {
    remote: Arc<dyn RemoteRepository>,
    cache: CacheGateway,
    workspaces: WorkspaceManager,
    pipeline: AnalysisPipeline,
}

impl ReportCard {
    pub fn new(
        remote: Arc<dyn RemoteRepository>,
        store: Arc<dyn ReportStore>,
        workspaces: WorkspaceManager,
        pipeline: AnalysisPipeline,
    ) -> Self {
        Self {
            remote,
            cache: CacheGateway::new(store),
            workspaces,
            pipeline,
        }
    }

    /// Wire a service from settings and an opened store.
    pub fn from_settings(settings: &Settings, store: Arc<dyn ReportStore>) -> Self {
        let remote = settings.git_remote();
        let workspaces = WorkspaceManager::new(&settings.workspace.root, remote.clone())
            .with_clone_timeout(settings.clone_timeout());
        Self::new(
            remote,
            store,
            workspaces,
            AnalysisPipeline::new(settings.analysis.clone()),
        )
    }

    pub fn cache(&self) -> &CacheGateway {
        &self.cache
    }

    /// Grade `raw_reference`, reusing the cached report when the remote
    /// head has not moved.
    pub async fn grade(&self, raw_reference: &str) -> Result<GradeOutcome> {
        let identity = resolve(raw_reference)?;
        let span = request_span(&identity.reference());
        self.grade_identity(&identity, false).instrument(span).await
    }

    /// Grade `raw_reference` from a fresh clone even if the cache is fresh.
    pub async fn refresh(&self, raw_reference: &str) -> Result<GradeOutcome> {
        let identity = resolve(raw_reference)?;
        let span = request_span(&identity.reference());
        self.grade_identity(&identity, true).instrument(span).await
    }

    /// Stored report for `raw_reference`, without contacting the remote.
    pub async fn cached(&self, raw_reference: &str) -> Result<Option<CachedReport>> {
        let identity = resolve(raw_reference)?;
        self.cache.lookup(&identity).await
    }

    /// Drop the stored report for `raw_reference`.
    pub async fn evict(&self, raw_reference: &str) -> Result<()> {
        let identity = resolve(raw_reference)?;
        self.cache.evict(&identity).await
    }

    async fn grade_identity(
        &self,
        identity: &RepositoryIdentity,
        refresh: bool,
    ) -> Result<GradeOutcome> {
        let revision = self.remote.fetch_revision(identity).await?;

        if !refresh {
            if let CacheStatus::Fresh(record) = self.cache.check(identity, &revision).await? {
                let report = CacheGateway::decode(&record)?;
                return Ok(GradeOutcome {
                    record,
                    report,
                    cache_hit: true,
                });
            }
        }

        let workspace = self.workspaces.materialize(identity).await?;
        let outcome = async {
            let analysis = self.pipeline.analyze_path(workspace.path()).await?;
            let record = self
                .cache
                .store(identity, &revision, &analysis.report)
                .await?;
            Ok::<_, ReportCardError>(GradeOutcome {
                record,
                report: analysis.report,
                cache_hit: false,
            })
        }
        .await;
        workspace.teardown();

        if let Ok(outcome) = &outcome {
            info!(grade = %outcome.report.grade(), revision = %revision, "graded");
        }
        outcome
    }
}
