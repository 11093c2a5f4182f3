//! The merged report document.

use std::collections::BTreeMap;

use reportcard_state::ReportDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::grade::Grade;

/// Key under which the grade is stored in the flat document.
pub const GRADE_KEY: &str = "report_grade";

/// A graded report: one document section per analyzer plus the grade.
///
/// Serializes to exactly the flat mapping that is persisted, so the value
/// returned to a caller and the value stored are the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ReportDocument", try_from = "ReportDocument")]
pub struct Report {
    sections: BTreeMap<String, Value>,
    grade: Grade,
}

impl Report {
    pub fn new(sections: BTreeMap<String, Value>, grade: Grade) -> Self {
        Self { sections, grade }
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn sections(&self) -> &BTreeMap<String, Value> {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// Names from `expected` that have no section in this report.
    pub fn missing_sections<'a>(&self, expected: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        expected
            .into_iter()
            .filter(|name| !self.sections.contains_key(*name))
            .map(str::to_string)
            .collect()
    }

    pub fn to_document(&self) -> ReportDocument {
        self.clone().into()
    }
}

impl From<Report> for ReportDocument {
    fn from(report: Report) -> Self {
        let mut doc: ReportDocument = report.sections.into_iter().collect();
        doc.insert(
            GRADE_KEY.to_string(),
            Value::String(report.grade.as_str().to_string()),
        );
        doc
    }
}

impl TryFrom<ReportDocument> for Report {
    type Error = String;

    fn try_from(mut doc: ReportDocument) -> Result<Self, Self::Error> {
        let grade = match doc.remove(GRADE_KEY) {
            Some(Value::String(s)) => s.parse::<Grade>()?,
            Some(other) => return Err(format!("{GRADE_KEY} is not a string: {other}")),
            None => return Err(format!("missing {GRADE_KEY}")),
        };
        Ok(Report {
            sections: doc.into_iter().collect(),
            grade,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Report {
        let mut sections = BTreeMap::new();
        sections.insert(
            "count".to_string(),
            json!({ "file_count": 3, "line_count": 120, "avg_line_count": 40 }),
        );
        sections.insert("readme".to_string(), json!({ "has_readme": true }));
        Report::new(sections, Grade::B)
    }

    #[test]
    fn document_is_flat() {
        let doc = sample().to_document();
        assert_eq!(doc["report_grade"], "B");
        assert_eq!(doc["count"]["file_count"], 3);
        assert_eq!(doc["readme"]["has_readme"], true);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn serialized_form_equals_document() {
        let report = sample();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value, Value::Object(report.to_document()));
        let back: Report = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn missing_grade_is_rejected() {
        let mut doc = sample().to_document();
        doc.remove(GRADE_KEY);
        let err = Report::try_from(doc).unwrap_err();
        assert!(err.contains("missing report_grade"));
    }

    #[test]
    fn reports_missing_sections() {
        let missing = sample().missing_sections(["count", "license", "readme"]);
        assert_eq!(missing, vec!["license".to_string()]);
    }
}
