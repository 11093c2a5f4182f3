//! Lint-style analyzers: one external tool, line-oriented findings.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::analyzer::{Analyzer, AnalyzerResult, ScoreContext, SourceTree};
use crate::error::AnalyzerError;
use crate::tool::ToolRunner;

/// Linters configured out of the box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinLinter {
    /// pycodestyle (formerly pep8)
    Pep8,

    /// pyflakes
    Pyflakes,

    /// mypy
    Mypy,
}

impl BuiltinLinter {
    pub const ALL: [BuiltinLinter; 3] = [
        BuiltinLinter::Pep8,
        BuiltinLinter::Pyflakes,
        BuiltinLinter::Mypy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinLinter::Pep8 => "pep8",
            BuiltinLinter::Pyflakes => "pyflakes",
            BuiltinLinter::Mypy => "mypy",
        }
    }

    pub fn command(&self) -> Vec<String> {
        match self {
            BuiltinLinter::Pep8 => vec!["pycodestyle".to_string()],
            BuiltinLinter::Pyflakes => vec!["pyflakes".to_string()],
            BuiltinLinter::Mypy => vec![
                "mypy".to_string(),
                "--no-error-summary".to_string(),
                "--no-color-output".to_string(),
                "--ignore-missing-imports".to_string(),
            ],
        }
    }

    /// Index of the first `:`-separated field holding the message.
    ///
    /// `path:line:col: CODE text` for pycodestyle and pyflakes,
    /// `path:line: severity: text` for mypy.
    pub fn message_column(&self) -> usize {
        match self {
            BuiltinLinter::Pep8 | BuiltinLinter::Pyflakes => 3,
            BuiltinLinter::Mypy => 2,
        }
    }

    pub fn default_weight(&self) -> f64 {
        match self {
            BuiltinLinter::Pep8 => 0.4,
            BuiltinLinter::Pyflakes => 0.3,
            BuiltinLinter::Mypy => 0.2,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Configuration for one lint analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintSpec {
    /// Analyzer name; the report section is `<name>_lint`.
    pub name: String,

    /// Command to execute (first element is executable). Source files are
    /// appended as further arguments.
    pub command: Vec<String>,

    pub message_column: usize,

    pub weight: f64,

    /// Overrides the analysis-wide tool timeout. 0 means unbounded.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl LintSpec {
    pub fn from_builtin(linter: BuiltinLinter) -> Self {
        Self {
            name: linter.name().to_string(),
            command: linter.command(),
            message_column: linter.message_column(),
            weight: linter.default_weight(),
            timeout_secs: None,
            enabled: true,
        }
    }

    pub fn custom(name: &str, command: Vec<String>, message_column: usize, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            command,
            message_column,
            weight,
            timeout_secs: None,
            enabled: true,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn section(&self) -> String {
        format!("{}_lint", self.name)
    }
}

/// One parsed finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintFinding {
    pub location: String,
    pub line: u64,
    pub message: String,
}

/// Parse `location:line[:col]:message`. Fields from `message_column` on are
/// rejoined, so messages may themselves contain `:`. mypy `note:` lines
/// annotate a preceding error and are not findings.
pub fn parse_lint_line(line: &str, message_column: usize) -> Option<LintFinding> {
    let fields: Vec<&str> = line.trim_end().split(':').collect();
    if message_column < 2 || fields.len() <= message_column {
        return None;
    }

    let location = fields[0].trim();
    let location = location.strip_prefix("./").unwrap_or(location);
    if location.is_empty() {
        return None;
    }
    let line_number = fields[1].trim().parse::<u64>().ok()?;
    let message = fields[message_column..].join(":").trim().to_string();
    if message.starts_with("note:") {
        return None;
    }

    Some(LintFinding {
        location: location.to_string(),
        line: line_number,
        message,
    })
}

/// `round(100 * (lines - errors) / lines)` clamped to 0..=100.
pub fn lint_score(line_count: u64, error_count: usize) -> u8 {
    if line_count == 0 {
        return 100;
    }
    let lines = line_count as f64;
    let raw = 100.0 * (lines - error_count as f64) / lines;
    raw.round().clamp(0.0, 100.0) as u8
}

/// Runs one lint tool over every source file.
pub struct LintAnalyzer {
    spec: LintSpec,
    section: String,
    timeout: Duration,
    findings: Vec<LintFinding>,
    score: u8,
    error: Option<String>,
}

impl LintAnalyzer {
    /// `default_timeout` applies when `LintSpec::timeout_secs` is unset.
    pub fn new(spec: LintSpec, default_timeout: Duration) -> Self {
        let timeout = spec
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(default_timeout);
        Self {
            section: spec.section(),
            spec,
            timeout,
            findings: Vec::new(),
            score: 0,
            error: None,
        }
    }

    pub fn findings(&self) -> &[LintFinding] {
        &self.findings
    }
}

#[async_trait]
impl Analyzer for LintAnalyzer {
    fn name(&self) -> &str {
        &self.section
    }

    fn weight(&self) -> f64 {
        self.spec.weight
    }

    async fn run(&mut self, tree: &SourceTree) -> Result<(), AnalyzerError> {
        if tree.is_empty() {
            debug!(analyzer = %self.section, "no source files, tool not invoked");
            return Ok(());
        }

        let output = ToolRunner::execute(
            &self.spec.name,
            &self.spec.command,
            tree.files(),
            tree.root(),
            self.timeout,
        )
        .await?;

        // pyflakes reports syntax errors on stderr.
        let findings: Vec<LintFinding> = output
            .stdout
            .lines()
            .chain(output.stderr.lines())
            .filter_map(|line| parse_lint_line(line, self.spec.message_column))
            .collect();

        if findings.is_empty() && output.is_crash() {
            return Err(AnalyzerError::ToolFailed {
                tool: self.spec.name.clone(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        self.findings = findings;
        debug!(
            analyzer = %self.section,
            findings = self.findings.len(),
            duration_ms = output.duration_ms,
            "lint tool finished"
        );
        Ok(())
    }

    fn calculate_score(&mut self, context: &ScoreContext) {
        self.score = if context.has_no_source_files() {
            100
        } else {
            lint_score(context.line_count, self.findings.len())
        };
    }

    fn degrade(&mut self, error: &AnalyzerError) {
        self.findings.clear();
        self.score = 0;
        self.error = Some(error.to_string());
    }

    fn to_result(&self) -> AnalyzerResult {
        let mut document = json!({
            "error_list": self.findings,
            "score": self.score,
        });
        if let Some(error) = &self.error {
            document["error"] = json!(error);
        }
        AnalyzerResult {
            name: self.section.clone(),
            score: self.score,
            weight: self.spec.weight,
            document,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builtin_names_and_columns() {
        assert_eq!(BuiltinLinter::Pep8.name(), "pep8");
        assert_eq!(BuiltinLinter::Pep8.command()[0], "pycodestyle");
        assert_eq!(BuiltinLinter::Pyflakes.message_column(), 3);
        assert_eq!(BuiltinLinter::Mypy.message_column(), 2);
        let total: f64 = BuiltinLinter::ALL.iter().map(|l| l.default_weight()).sum();
        assert!((total - 0.9).abs() < 1e-9);
    }

    #[test]
    fn spec_section_and_disable() {
        let spec = LintSpec::from_builtin(BuiltinLinter::Pyflakes);
        assert_eq!(spec.section(), "pyflakes_lint");
        assert!(spec.enabled);
        assert!(!spec.disabled().enabled);
    }

    #[test]
    fn parses_pycodestyle_line() {
        let f = parse_lint_line("./pkg/app.py:12:80: E501 line too long (88 > 79 characters)", 3)
            .unwrap();
        assert_eq!(f.location, "pkg/app.py");
        assert_eq!(f.line, 12);
        assert_eq!(f.message, "E501 line too long (88 > 79 characters)");
    }

    #[test]
    fn parses_mypy_line_and_keeps_colons_in_message() {
        let f = parse_lint_line(
            "app.py:3: error: Incompatible types (expression has type \"str\", variable has type \"int\"): x",
            2,
        )
        .unwrap();
        assert_eq!(f.line, 3);
        assert!(f.message.starts_with("error: Incompatible types"));
        assert!(f.message.ends_with("): x"));
    }

    #[test]
    fn skips_unparsable_lines() {
        assert!(parse_lint_line("Found 2 errors in 1 file (checked 3 source files)", 2).is_none());
        assert!(parse_lint_line("Success: no issues found in 1 source file", 2).is_none());
        assert!(parse_lint_line("app.py:abc:1: E1 x", 3).is_none());
        assert!(parse_lint_line("app.py:1", 3).is_none());
        assert!(parse_lint_line("", 3).is_none());
    }

    #[test]
    fn skips_mypy_notes() {
        assert!(parse_lint_line(
            "app.py:3: note: See https://mypy.readthedocs.io/en/stable/running_mypy.html",
            2
        )
        .is_none());
        assert!(parse_lint_line("app.py:7: error: Name \"y\" is not defined", 2).is_some());
    }

    #[test]
    fn score_rounds_and_clamps() {
        assert_eq!(lint_score(120, 2), 98);
        assert_eq!(lint_score(120, 0), 100);
        assert_eq!(lint_score(3, 1), 67);
        assert_eq!(lint_score(10, 50), 0);
        assert_eq!(lint_score(0, 5), 100);
    }

    fn tree_with_files(dir: &tempfile::TempDir, names: &[&str]) -> SourceTree {
        for name in names {
            std::fs::write(dir.path().join(name), "x = 1\n").unwrap();
        }
        SourceTree::new(dir.path(), names.iter().map(PathBuf::from).collect())
    }

    fn printf_tool(output: &str) -> Vec<String> {
        vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("printf '{output}'"),
            "sh".to_string(),
        ]
    }

    #[tokio::test]
    async fn run_parses_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        let tree = tree_with_files(&dir, &["a.py", "b.py"]);
        let spec = LintSpec::custom(
            "pep8",
            printf_tool("./a.py:1:1: E101 indent\\nb.py:4:2: W291 trailing whitespace\\n"),
            3,
            0.5,
        );
        let mut analyzer = LintAnalyzer::new(spec, Duration::from_secs(10));
        analyzer.run(&tree).await.unwrap();
        analyzer.calculate_score(&ScoreContext {
            file_count: 2,
            line_count: 100,
        });

        let result = analyzer.to_result();
        assert_eq!(result.name, "pep8_lint");
        assert_eq!(result.score, 98);
        assert_eq!(result.document["error_list"][0]["location"], "a.py");
        assert_eq!(result.document["error_list"][1]["line"], 4);
        assert!(result.document.get("error").is_none());
    }

    #[tokio::test]
    async fn empty_tree_scores_full_without_invoking_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tree = SourceTree::new(dir.path(), Vec::new());
        let spec = LintSpec::custom(
            "mypy",
            vec!["reportcard-no-such-tool".to_string()],
            2,
            0.2,
        );
        let mut analyzer = LintAnalyzer::new(spec, Duration::from_secs(10));
        analyzer.run(&tree).await.unwrap();
        analyzer.calculate_score(&ScoreContext::default());
        assert_eq!(analyzer.to_result().score, 100);
    }

    #[tokio::test]
    async fn missing_tool_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let tree = tree_with_files(&dir, &["a.py"]);
        let spec = LintSpec::custom(
            "ghost",
            vec!["reportcard-no-such-tool".to_string()],
            3,
            0.3,
        );
        let mut analyzer = LintAnalyzer::new(spec, Duration::from_secs(10));
        let err = analyzer.run(&tree).await.unwrap_err();
        analyzer.degrade(&err);

        let result = analyzer.to_result();
        assert_eq!(result.score, 0);
        assert_eq!(result.document["error_list"], json!([]));
        assert!(result.document["error"]
            .as_str()
            .unwrap()
            .contains("not available"));
    }

    #[tokio::test]
    async fn findings_on_stderr_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let tree = tree_with_files(&dir, &["old.py"]);
        let spec = LintSpec::custom(
            "pyflakes",
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo \"old.py:1:7: Missing parentheses in call to 'print'\" >&2; exit 1"
                    .to_string(),
                "sh".to_string(),
            ],
            3,
            0.3,
        );
        let mut analyzer = LintAnalyzer::new(spec, Duration::from_secs(10));
        analyzer.run(&tree).await.unwrap();
        analyzer.calculate_score(&ScoreContext {
            file_count: 1,
            line_count: 10,
        });

        assert_eq!(analyzer.findings().len(), 1);
        assert_eq!(analyzer.findings()[0].location, "old.py");
        let result = analyzer.to_result();
        assert_eq!(result.score, 90);
        assert!(result.document.get("error").is_none());
    }

    #[tokio::test]
    async fn stderr_only_crash_is_tool_failed() {
        let dir = tempfile::tempdir().unwrap();
        let tree = tree_with_files(&dir, &["a.py"]);
        let spec = LintSpec::custom(
            "broken",
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo 'Traceback: boom' >&2; exit 3".to_string(),
                "sh".to_string(),
            ],
            3,
            0.3,
        );
        let mut analyzer = LintAnalyzer::new(spec, Duration::from_secs(10));
        let err = analyzer.run(&tree).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::ToolFailed { exit_code: 3, .. }));
    }
}
