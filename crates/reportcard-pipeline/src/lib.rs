//! reportcard pipeline
//!
//! Provides the analysis side of reportcard:
//! - Size, lint and presence analyzers under one scoring contract
//! - Weighted grading and report assembly
//! - Layered configuration
//! - The `ReportCard` service tying fingerprinting, caching, workspaces
//!   and analysis together

pub mod analyzer;
pub mod config;
pub mod error;
pub mod grade;
pub mod lint;
pub mod pipeline;
pub mod presence;
pub mod report;
pub mod service;
pub mod size;
pub mod tool;

// Re-export key types
pub use analyzer::{Analyzer, AnalyzerResult, ScoreContext, SourceTree};
pub use config::{open_store, ConfigError, Settings, StoreBackend};
pub use error::{AnalyzerError, PipelineError};
pub use lint::{BuiltinLinter, LintAnalyzer, LintFinding, LintSpec};
pub use pipeline::{Analysis, AnalysisPipeline};
pub use presence::{PresenceAnalyzer, PresenceKind};
pub use service::{GradeOutcome, ReportCard};
pub use size::{SizeAnalyzer, SizeSummary};
pub use tool::{ToolOutput, ToolRunner};
