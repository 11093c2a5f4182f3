//! The common analyzer contract.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use walkdir::{DirEntry, WalkDir};

use crate::error::{AnalyzerError, PipelineError};

/// Normalized output of one analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerResult {
    /// Report section key, e.g. `pep8_lint` or `license`.
    pub name: String,

    /// 0..=100.
    pub score: u8,

    /// Contribution to the weighted sum.
    pub weight: f64,

    /// Section document stored in the report.
    pub document: Value,
}

/// Inputs to scoring computed before any weighted analyzer runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreContext {
    pub file_count: u64,
    pub line_count: u64,
}

impl ScoreContext {
    /// No source files matched: line-derived scores are undefined.
    pub fn has_no_source_files(&self) -> bool {
        self.file_count == 0
    }
}

/// The tree under analysis and the source files selected from it.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
    /// Paths relative to `root`, sorted.
    files: Vec<PathBuf>,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files,
        }
    }

    /// Collect every file under `root` with the given extension.
    pub async fn scan(root: &Path, extension: &str) -> Result<Self, PipelineError> {
        let root = root.to_path_buf();
        let extension = extension.trim_start_matches('.').to_string();
        tokio::task::spawn_blocking(move || {
            let mut files: Vec<PathBuf> = walk(&root)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    entry
                        .path()
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension.as_str()))
                })
                .filter_map(|entry| entry.path().strip_prefix(&root).ok().map(Path::to_path_buf))
                .collect();
            files.sort();
            Self { root, files }
        })
        .await
        .map_err(|e| PipelineError::Scan(e.to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Recursive walk that skips hidden directories and never follows links.
pub(crate) fn walk(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && is_hidden(entry)))
        .flatten()
}

/// A weighted analyzer. Instances are single-use: built fresh for every run.
#[async_trait]
pub trait Analyzer: Send {
    /// Report section key.
    fn name(&self) -> &str;

    fn weight(&self) -> f64;

    /// Collect raw findings from the tree.
    async fn run(&mut self, tree: &SourceTree) -> Result<(), AnalyzerError>;

    /// Turn findings into a score.
    fn calculate_score(&mut self, context: &ScoreContext);

    /// Replace findings with a zero-score result noting `error`.
    fn degrade(&mut self, error: &AnalyzerError);

    fn to_result(&self) -> AnalyzerResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_selects_extension_recursively_and_skips_hidden() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("pkg/sub")).unwrap();
        std::fs::create_dir_all(root.join(".git/hooks")).unwrap();
        std::fs::create_dir_all(root.join(".venv/lib")).unwrap();
        std::fs::write(root.join("setup.py"), "").unwrap();
        std::fs::write(root.join("pkg/sub/mod.py"), "").unwrap();
        std::fs::write(root.join("pkg/notes.txt"), "").unwrap();
        std::fs::write(root.join(".git/hooks/hook.py"), "").unwrap();
        std::fs::write(root.join(".venv/lib/site.py"), "").unwrap();

        let tree = SourceTree::scan(root, "py").await.unwrap();
        assert_eq!(
            tree.files(),
            &[PathBuf::from("pkg/sub/mod.py"), PathBuf::from("setup.py")]
        );
    }

    #[tokio::test]
    async fn scan_does_not_follow_directory_links() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("escape.py"), "").unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("linked")).unwrap();

        let tree = SourceTree::scan(tmp.path(), ".py").await.unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn empty_context_has_no_source_files() {
        assert!(ScoreContext::default().has_no_source_files());
        let ctx = ScoreContext {
            file_count: 1,
            line_count: 0,
        };
        assert!(!ctx.has_no_source_files());
    }
}
