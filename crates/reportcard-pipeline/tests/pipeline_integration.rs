//! Integration tests for the ReportCard service with a fake remote and an
//! in-memory store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reportcard_core::fakes::{CloneBehaviour, FakeRemote};
use reportcard_core::{Grade, ReportCardError, WorkspaceError, WorkspaceManager};
use reportcard_pipeline::config::AnalysisSettings;
use reportcard_pipeline::{AnalysisPipeline, LintSpec, ReportCard};
use reportcard_state::fakes::MemoryReportStore;
use serde_json::json;

/// Three python files, 40 lines each.
fn widgets_files() -> Vec<(PathBuf, String)> {
    let body = "x = 1\n".repeat(40);
    vec![
        (PathBuf::from("widgets/__init__.py"), body.clone()),
        (PathBuf::from("widgets/core.py"), body.clone()),
        (PathBuf::from("setup.py"), body),
    ]
}

/// A lint tool that reports two findings regardless of input.
fn two_finding_linter() -> LintSpec {
    LintSpec::custom(
        "pep8",
        vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf './widgets/core.py:3:80: E501 line too long (88 > 79 characters)\\nsetup.py:1:1: W391 blank line at end of file\\n'; exit 1".to_string(),
            "sh".to_string(),
        ],
        3,
        0.5,
    )
}

fn widgets_settings() -> AnalysisSettings {
    AnalysisSettings {
        linters: vec![two_finding_linter()],
        license_weight: 0.01,
        readme_weight: 0.01,
        ..Default::default()
    }
}

struct Harness {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    remote: Arc<FakeRemote>,
    store: Arc<MemoryReportStore>,
    card: ReportCard,
}

fn harness(remote: FakeRemote, clone_timeout: Duration) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("workspaces");
    let remote = Arc::new(remote);
    let store = Arc::new(MemoryReportStore::new());
    let workspaces =
        WorkspaceManager::new(&root, remote.clone()).with_clone_timeout(clone_timeout);
    let card = ReportCard::new(
        remote.clone(),
        store.clone(),
        workspaces,
        AnalysisPipeline::new(widgets_settings()),
    );
    Harness {
        _tmp: tmp,
        root,
        remote,
        store,
        card,
    }
}

fn workspace_entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}

/// Test: widgets scenario, cold cache
#[tokio::test]
async fn test_widgets_scenario_grades_e() {
    let h = harness(
        FakeRemote::new("abc123").with_clone(CloneBehaviour::Files(widgets_files())),
        Duration::from_secs(15),
    );

    let outcome = h
        .card
        .grade("github.com/acme/widgets")
        .await
        .expect("grading failed");

    assert!(!outcome.cache_hit);
    assert_eq!(outcome.report.grade(), Grade::E);
    assert_eq!(outcome.record.last_revision.as_str(), "abc123");

    let doc = &outcome.record.report;
    assert_eq!(
        doc["count"],
        json!({ "file_count": 3, "line_count": 120, "avg_line_count": 40 })
    );
    assert_eq!(doc["pep8_lint"]["score"], 98);
    assert_eq!(doc["pep8_lint"]["error_list"][0]["location"], "widgets/core.py");
    assert_eq!(doc["pep8_lint"]["error_list"][0]["line"], 3);
    assert_eq!(doc["license"], json!({ "has_license": false }));
    assert_eq!(doc["readme"], json!({ "has_readme": false }));
    assert_eq!(doc["report_grade"], "E");

    assert_eq!(h.store.put_count(), 1);
    assert_eq!(workspace_entries(&h.root), 0, "workspace not torn down");
}

/// Test: unchanged revision is a pure cache hit
#[tokio::test]
async fn test_second_run_is_pure_cache_hit() {
    let h = harness(
        FakeRemote::new("abc123").with_clone(CloneBehaviour::Files(widgets_files())),
        Duration::from_secs(15),
    );

    let first = h.card.grade("github.com/acme/widgets").await.unwrap();
    let second = h
        .card
        .grade("https://github.com/acme/widgets.git")
        .await
        .unwrap();

    assert!(second.cache_hit);
    assert_eq!(h.remote.clone_calls(), 1, "second run must not clone");
    assert_eq!(h.store.put_count(), 1, "second run must not write");
    assert_eq!(second.record.report, first.record.report);
    assert_eq!(second.report, first.report);
    assert_eq!(
        serde_json::to_value(&second.report).unwrap(),
        serde_json::Value::Object(first.record.report.clone())
    );
}

/// Test: a new remote head invalidates the cached report
#[tokio::test]
async fn test_new_revision_replaces_cached_report() {
    let h = harness(
        FakeRemote::new("abc123").with_clone(CloneBehaviour::Files(widgets_files())),
        Duration::from_secs(15),
    );

    h.card.grade("github.com/acme/widgets").await.unwrap();
    h.remote.set_revision("def456");
    let outcome = h.card.grade("github.com/acme/widgets").await.unwrap();

    assert!(!outcome.cache_hit);
    assert_eq!(h.remote.clone_calls(), 2);
    assert_eq!(h.store.len(), 1);
    let cached = h.card.cached("github.com/acme/widgets").await.unwrap().unwrap();
    assert_eq!(cached.last_revision.as_str(), "def456");
}

/// Test: clone timeout aborts without a cache write
#[tokio::test]
async fn test_clone_timeout_writes_nothing() {
    let h = harness(
        FakeRemote::new("abc123").with_clone(CloneBehaviour::Hang(Duration::from_secs(30))),
        Duration::from_millis(200),
    );

    let err = h.card.grade("github.com/acme/widgets").await.unwrap_err();

    assert!(matches!(
        err,
        ReportCardError::Workspace(WorkspaceError::CloneTimeout { .. })
    ));
    assert!(err.is_inaccessible());
    assert_eq!(h.store.put_count(), 0);
    assert!(h.card.cached("github.com/acme/widgets").await.unwrap().is_none());
    assert_eq!(workspace_entries(&h.root), 0, "partial workspace left behind");
}

/// Test: clone failure aborts without a cache write
#[tokio::test]
async fn test_clone_failure_writes_nothing() {
    let h = harness(
        FakeRemote::new("abc123").with_clone(CloneBehaviour::Fail),
        Duration::from_secs(15),
    );

    let err = h.card.grade("github.com/acme/widgets").await.unwrap_err();
    assert!(matches!(
        err,
        ReportCardError::Workspace(WorkspaceError::CloneFailed { .. })
    ));
    assert_eq!(h.store.put_count(), 0);
    assert_eq!(workspace_entries(&h.root), 0);
}

/// Test: a missing lint tool degrades but the report is still stored
#[tokio::test]
async fn test_missing_tool_still_produces_complete_report() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = Arc::new(
        FakeRemote::new("abc123").with_clone(CloneBehaviour::Files(widgets_files())),
    );
    let store = Arc::new(MemoryReportStore::new());
    let settings = AnalysisSettings {
        linters: vec![
            two_finding_linter(),
            LintSpec::custom("mypy", vec!["reportcard-no-such-tool".to_string()], 2, 0.2),
        ],
        license_weight: 0.01,
        readme_weight: 0.01,
        ..Default::default()
    };
    let card = ReportCard::new(
        remote.clone(),
        store.clone(),
        WorkspaceManager::new(tmp.path(), remote.clone()),
        AnalysisPipeline::new(settings),
    );

    let outcome = card.grade("github.com/acme/widgets").await.unwrap();
    let doc = &outcome.record.report;

    assert_eq!(doc["pep8_lint"]["score"], 98);
    assert_eq!(doc["mypy_lint"]["score"], 0);
    assert_eq!(doc["mypy_lint"]["error_list"], json!([]));
    assert!(doc["mypy_lint"]["error"].is_string());
    assert_eq!(outcome.report.grade(), Grade::E);
    assert_eq!(store.put_count(), 1);
}

/// Test: an analysis failure after cloning writes nothing and tears down
#[tokio::test]
async fn test_analysis_failure_after_clone_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("workspaces");
    let remote = Arc::new(
        FakeRemote::new("abc123").with_clone(CloneBehaviour::Files(widgets_files())),
    );
    let store = Arc::new(MemoryReportStore::new());
    let settings = AnalysisSettings {
        linters: vec![two_finding_linter(), two_finding_linter()],
        ..widgets_settings()
    };
    let card = ReportCard::new(
        remote.clone(),
        store.clone(),
        WorkspaceManager::new(&root, remote.clone()),
        AnalysisPipeline::new(settings),
    );

    let err = card.grade("github.com/acme/widgets").await.unwrap_err();

    assert!(matches!(err, ReportCardError::Analysis(_)));
    assert!(!err.is_inaccessible());
    assert_eq!(remote.clone_calls(), 1);
    assert_eq!(store.put_count(), 0);
    assert!(card.cached("github.com/acme/widgets").await.unwrap().is_none());
    assert_eq!(workspace_entries(&root), 0, "workspace left behind after failure");
}
