//! Analysis pipeline orchestration.

use std::path::Path;
use std::time::Instant;

use futures::future::join_all;
use reportcard_core::{obs, Report};
use tracing::{info, instrument};

use crate::analyzer::{Analyzer, AnalyzerResult, SourceTree};
use crate::config::AnalysisSettings;
use crate::error::PipelineError;
use crate::grade::{grade, weight_balance};
use crate::lint::LintAnalyzer;
use crate::presence::{PresenceAnalyzer, PresenceKind};
use crate::report::{assemble, ensure_complete};
use crate::size::{SizeAnalyzer, SizeSummary, COUNT_SECTION};

/// Result of analyzing one tree.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: Report,

    /// Weighted results in registry order.
    pub results: Vec<AnalyzerResult>,

    pub size: SizeSummary,

    pub duration_ms: u64,
}

/// Runs the configured analyzers over a directory.
pub struct AnalysisPipeline {
    settings: AnalysisSettings,
}

impl AnalysisPipeline {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Fresh analyzer instances in report order: enabled linters, then
    /// license, then readme.
    pub fn registry(&self) -> Vec<Box<dyn Analyzer>> {
        let tool_timeout = std::time::Duration::from_secs(self.settings.tool_timeout_secs);
        let mut analyzers: Vec<Box<dyn Analyzer>> = self
            .settings
            .linters
            .iter()
            .filter(|spec| spec.enabled)
            .map(|spec| {
                Box::new(LintAnalyzer::new(spec.clone(), tool_timeout)) as Box<dyn Analyzer>
            })
            .collect();
        analyzers.push(Box::new(PresenceAnalyzer::new(
            PresenceKind::License,
            self.settings.license_weight,
        )));
        analyzers.push(Box::new(PresenceAnalyzer::new(
            PresenceKind::Readme,
            self.settings.readme_weight,
        )));
        analyzers
    }

    /// Every section a complete report carries.
    pub fn expected_sections(&self) -> Vec<String> {
        std::iter::once(COUNT_SECTION.to_string())
            .chain(self.registry().iter().map(|a| a.name().to_string()))
            .collect()
    }

    /// Analyze the tree at `root`. Nothing is cached and nothing under
    /// `root` is removed.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub async fn analyze_path(&self, root: &Path) -> Result<Analysis, PipelineError> {
        let start = Instant::now();

        let tree = SourceTree::scan(root, &self.settings.source_extension).await?;

        let mut size = SizeAnalyzer::new();
        size.run(&tree).await?;
        size.calculate_score();
        let context = size.context();
        if context.has_no_source_files() {
            info!(
                extension = %self.settings.source_extension,
                "no source files; lint tools skipped"
            );
        }

        let mut analyzers = self.registry();
        let tree = &tree;
        join_all(analyzers.iter_mut().map(|analyzer| async move {
            match analyzer.run(tree).await {
                Ok(()) => analyzer.calculate_score(&context),
                Err(err) => {
                    obs::emit_analyzer_degraded(analyzer.name(), &err);
                    analyzer.degrade(&err);
                }
            }
        }))
        .await;

        let results: Vec<AnalyzerResult> = analyzers.iter().map(|a| a.to_result()).collect();
        weight_balance(&results);
        let grade = grade(&results);

        let report = assemble(size.to_document(), &results, grade)?;
        let expected = self.expected_sections();
        ensure_complete(&report, expected.iter().map(String::as_str))?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            grade = %grade,
            files = context.file_count,
            lines = context.line_count,
            duration_ms,
            "analysis finished"
        );

        Ok(Analysis {
            report,
            results,
            size: size.summary(),
            duration_ms,
        })
    }
}
