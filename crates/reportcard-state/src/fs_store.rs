use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StateError, StorageError};
use crate::storage_traits::{CachedReport, RepositoryIdentity, ReportStore, StorageResult};

/// Filesystem-backed report store, one JSON document per identity.
///
/// Layout: `<root>/reports/<sha256 of host/owner/name>.json`
pub struct FsReportStore {
    reports_dir: PathBuf,
}

impl FsReportStore {
    /// Create a new `FsReportStore` rooted at `root`. Creates `root/reports/` if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StateError> {
        let reports_dir = root.as_ref().join("reports");
        fs::create_dir_all(&reports_dir)?;
        Ok(Self { reports_dir })
    }

    fn report_path(&self, identity: &RepositoryIdentity) -> PathBuf {
        self.reports_dir
            .join(format!("{}.json", identity.key().as_str()))
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn get(&self, identity: &RepositoryIdentity) -> StorageResult<Option<CachedReport>> {
        let path = self.report_path(identity);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let report = serde_json::from_slice(&bytes).map_err(|e| StorageError::Malformed {
            reference: identity.reference(),
            reason: e.to_string(),
        })?;
        Ok(Some(report))
    }

    async fn put(&self, report: &CachedReport) -> StorageResult<()> {
        let path = self.report_path(&report.identity);
        let bytes = serde_json::to_vec_pretty(report).map_err(|e| StorageError::Malformed {
            reference: report.identity.reference(),
            reason: e.to_string(),
        })?;

        // Write to a temp file in the same directory, then rename over the
        // previous document so readers never see a partial write.
        let mut tmp = NamedTempFile::new_in(&self.reports_dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(path = %path.display(), "report written");
        Ok(())
    }

    async fn delete(&self, identity: &RepositoryIdentity) -> StorageResult<()> {
        match fs::remove_file(self.report_path(identity)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_traits::{ReportDocument, RevisionMarker};
    use serde_json::json;

    fn make_store() -> (tempfile::TempDir, FsReportStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsReportStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn report(revision: &str) -> CachedReport {
        let mut doc = ReportDocument::new();
        doc.insert("report_grade".to_string(), json!("C"));
        CachedReport::new(
            RepositoryIdentity::new("github.com", "acme", "widgets"),
            RevisionMarker::new(revision),
            doc,
        )
    }

    #[tokio::test]
    async fn single_file_per_identity() {
        let (dir, store) = make_store();
        store.put(&report("abc123")).await.unwrap();
        store.put(&report("def456")).await.unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path().join("reports"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);

        let identity = RepositoryIdentity::new("github.com", "acme", "widgets");
        let got = store.get(&identity).await.unwrap().unwrap();
        assert_eq!(got.last_revision.as_str(), "def456");
    }

    #[tokio::test]
    async fn corrupt_document_is_malformed() {
        let (dir, store) = make_store();
        let identity = RepositoryIdentity::new("github.com", "acme", "widgets");
        let path = dir
            .path()
            .join("reports")
            .join(format!("{}.json", identity.key()));
        fs::write(&path, b"{ not json").unwrap();

        match store.get(&identity).await {
            Err(StorageError::Malformed { reference, .. }) => {
                assert_eq!(reference, "github.com/acme/widgets")
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }
}
