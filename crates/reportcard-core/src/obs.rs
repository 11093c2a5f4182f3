//! Structured lifecycle events.
//!
//! Every event carries an `event` field naming it, so log pipelines can
//! filter on e.g. `event = "report.cache_hit"` regardless of format.

use std::path::Path;

use tracing::{info, warn};

/// Request-scoped span tagged with the repository reference. Attach with
/// `tracing::Instrument::instrument`.
pub fn request_span(reference: &str) -> tracing::Span {
    tracing::info_span!("reportcard.request", reference = %reference)
}

pub fn emit_cache_hit(reference: &str, revision: &str) {
    info!(event = "report.cache_hit", reference = %reference, revision = %revision);
}

/// `cached_revision` is `None` when nothing was stored yet.
pub fn emit_cache_miss(reference: &str, revision: &str, cached_revision: Option<&str>) {
    info!(
        event = "report.cache_miss",
        reference = %reference,
        revision = %revision,
        cached_revision = cached_revision.unwrap_or("none"),
    );
}

pub fn emit_workspace_materialized(reference: &str, path: &Path, duration_ms: u64) {
    info!(
        event = "workspace.materialized",
        reference = %reference,
        path = %path.display(),
        duration_ms = duration_ms,
    );
}

pub fn emit_workspace_teardown_failed(path: &Path, error: &dyn std::fmt::Display) {
    warn!(event = "workspace.teardown_failed", path = %path.display(), error = %error);
}

pub fn emit_analyzer_degraded(analyzer: &str, error: &dyn std::fmt::Display) {
    warn!(event = "analyzer.degraded", analyzer = %analyzer, error = %error);
}

pub fn emit_report_stored(reference: &str, revision: &str, grade: &str) {
    info!(
        event = "report.stored",
        reference = %reference,
        revision = %revision,
        grade = %grade,
    );
}

pub fn emit_weights_unbalanced(total_weight: f64) {
    warn!(event = "grade.weights_unbalanced", total_weight = total_weight);
}
