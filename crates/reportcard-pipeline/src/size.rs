//! Size analyzer: source file and line counts.
//!
//! Unweighted. Its counts feed every line-normalized score through
//! [`ScoreContext`] and its document is the report's `count` section.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyzer::{ScoreContext, SourceTree};
use crate::error::PipelineError;

/// Section key of the size document.
pub const COUNT_SECTION: &str = "count";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSummary {
    pub file_count: u64,
    pub line_count: u64,
    pub avg_line_count: u64,
}

#[derive(Debug, Default)]
pub struct SizeAnalyzer {
    summary: SizeSummary,
}

impl SizeAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count lines of every file in `tree`.
    pub async fn run(&mut self, tree: &SourceTree) -> Result<(), PipelineError> {
        let root = tree.root().to_path_buf();
        let files = tree.files().to_vec();
        let line_count = tokio::task::spawn_blocking(move || -> std::io::Result<u64> {
            let mut total = 0;
            for file in &files {
                total += count_lines(&root.join(file))?;
            }
            Ok(total)
        })
        .await
        .map_err(|e| PipelineError::Scan(e.to_string()))??;

        self.summary.file_count = tree.files().len() as u64;
        self.summary.line_count = line_count;
        Ok(())
    }

    /// Average lines per file, rounded. Zero files gives zero.
    pub fn calculate_score(&mut self) {
        self.summary.avg_line_count = if self.summary.file_count == 0 {
            0
        } else {
            (self.summary.line_count as f64 / self.summary.file_count as f64).round() as u64
        };
    }

    pub fn summary(&self) -> SizeSummary {
        self.summary
    }

    pub fn context(&self) -> ScoreContext {
        ScoreContext {
            file_count: self.summary.file_count,
            line_count: self.summary.line_count,
        }
    }

    pub fn to_document(&self) -> Value {
        serde_json::to_value(self.summary).unwrap_or(Value::Null)
    }
}

/// Number of `\n` bytes in the file, as `wc -l` counts.
pub fn count_lines(path: &Path) -> std::io::Result<u64> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; 8192];
    let mut lines = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            return Ok(lines);
        }
        lines += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
    }
}
