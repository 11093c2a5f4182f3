//! Presence analyzers: is there a license file, is there a readme.

use async_trait::async_trait;
use serde_json::json;

use crate::analyzer::{walk, Analyzer, AnalyzerResult, ScoreContext, SourceTree};
use crate::error::AnalyzerError;

/// Which file to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceKind {
    License,
    Readme,
}

impl PresenceKind {
    pub fn section(&self) -> &'static str {
        match self {
            PresenceKind::License => "license",
            PresenceKind::Readme => "readme",
        }
    }

    /// Key of the boolean inside the section document.
    pub fn flag(&self) -> &'static str {
        match self {
            PresenceKind::License => "has_license",
            PresenceKind::Readme => "has_readme",
        }
    }

    /// Accepted lowercase file names.
    pub fn candidates(&self) -> [&'static str; 4] {
        match self {
            PresenceKind::License => ["license", "license.md", "license.rst", "license.txt"],
            PresenceKind::Readme => ["readme", "readme.md", "readme.rst", "readme.txt"],
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        self.candidates().contains(&lower.as_str())
    }
}

pub struct PresenceAnalyzer {
    kind: PresenceKind,
    weight: f64,
    found: bool,
    error: Option<String>,
}

impl PresenceAnalyzer {
    pub fn new(kind: PresenceKind, weight: f64) -> Self {
        Self {
            kind,
            weight,
            found: false,
            error: None,
        }
    }

    pub fn found(&self) -> bool {
        self.found
    }
}

#[async_trait]
impl Analyzer for PresenceAnalyzer {
    fn name(&self) -> &str {
        self.kind.section()
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    async fn run(&mut self, tree: &SourceTree) -> Result<(), AnalyzerError> {
        let root = tree.root().to_path_buf();
        let kind = self.kind;
        self.found = tokio::task::spawn_blocking(move || {
            walk(&root).any(|entry| {
                entry.file_type().is_file()
                    && entry.file_name().to_str().is_some_and(|n| kind.matches(n))
            })
        })
        .await
        .map_err(|e| AnalyzerError::Io(std::io::Error::other(e.to_string())))?;
        Ok(())
    }

    fn calculate_score(&mut self, _context: &ScoreContext) {}

    fn degrade(&mut self, error: &AnalyzerError) {
        self.found = false;
        self.error = Some(error.to_string());
    }

    fn to_result(&self) -> AnalyzerResult {
        let mut document = json!({ (self.kind.flag()): self.found });
        if let Some(error) = &self.error {
            document["error"] = json!(error);
        }
        AnalyzerResult {
            name: self.kind.section().to_string(),
            score: if self.found { 100 } else { 0 },
            weight: self.weight,
            document,
        }
    }
}
