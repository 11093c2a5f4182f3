//! Pipeline error types.

use std::time::Duration;

use reportcard_core::ReportCardError;

/// Failure of a single analyzer. Contained: folded into a degraded result.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("tool '{tool}' is not available: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    #[error("tool '{tool}' timed out after {timeout:?}")]
    ToolTimeout { tool: String, timeout: Duration },

    #[error("tool '{tool}' failed with exit code {exit_code}: {stderr}")]
    ToolFailed {
        tool: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a whole analysis run. No report is produced.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("source tree scan failed: {0}")]
    Scan(String),

    #[error("duplicate report section '{0}'")]
    DuplicateSection(String),

    #[error("report is missing sections: {}", .0.join(", "))]
    IncompleteReport(Vec<String>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PipelineError> for ReportCardError {
    fn from(err: PipelineError) -> Self {
        ReportCardError::Analysis(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failed_display() {
        let err = AnalyzerError::ToolFailed {
            tool: "mypy".to_string(),
            exit_code: 2,
            stderr: "mypy: can't read file".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("mypy"));
        assert!(msg.contains("exit code 2"));
    }

    #[test]
    fn incomplete_report_lists_sections() {
        let err = PipelineError::IncompleteReport(vec!["license".into(), "readme".into()]);
        assert_eq!(err.to_string(), "report is missing sections: license, readme");
    }

    #[test]
    fn pipeline_error_converts_to_analysis() {
        let err: ReportCardError = PipelineError::DuplicateSection("count".into()).into();
        assert!(matches!(err, ReportCardError::Analysis(_)));
        assert!(!err.is_inaccessible());
    }
}
