//! Report assembly.

use std::collections::BTreeMap;

use reportcard_core::{Grade, Report, GRADE_KEY};
use serde_json::Value;

use crate::analyzer::AnalyzerResult;
use crate::error::PipelineError;
use crate::size::COUNT_SECTION;

/// Merge the size document, every analyzer document and the grade.
pub fn assemble(
    count: Value,
    results: &[AnalyzerResult],
    grade: Grade,
) -> Result<Report, PipelineError> {
    let mut sections = BTreeMap::new();
    sections.insert(COUNT_SECTION.to_string(), count);

    for result in results {
        if result.name == GRADE_KEY || sections.contains_key(&result.name) {
            return Err(PipelineError::DuplicateSection(result.name.clone()));
        }
        sections.insert(result.name.clone(), result.document.clone());
    }

    Ok(Report::new(sections, grade))
}

/// Fail unless every name in `expected` has a section.
pub fn ensure_complete<'a>(
    report: &Report,
    expected: impl IntoIterator<Item = &'a str>,
) -> Result<(), PipelineError> {
    let missing = report.missing_sections(expected);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::IncompleteReport(missing))
    }
}
