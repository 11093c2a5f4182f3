//! Human-readable report rendering.

use reportcard_core::{CachedReport, Report};
use serde_json::Value;

/// Indentation unit of the verbose listing.
pub const INDENT_PREFIX: &str = "        ";

const COUNT_SECTION: &str = "count";

/// Score shown for a section: its `score`, or 100/0 from its boolean flag.
fn section_score(section: &Value) -> u64 {
    if let Some(score) = section.get("score").and_then(Value::as_u64) {
        return score;
    }
    let present = section
        .as_object()
        .and_then(|fields| fields.values().find_map(Value::as_bool))
        .unwrap_or(false);
    if present {
        100
    } else {
        0
    }
}

fn push_errors(lines: &mut Vec<String>, section: &Value) {
    let Some(list) = section.get("error_list").and_then(Value::as_array) else {
        return;
    };
    let mut errors: Vec<(&str, u64, &str)> = list
        .iter()
        .map(|err| {
            (
                err.get("location").and_then(Value::as_str).unwrap_or(""),
                err.get("line").and_then(Value::as_u64).unwrap_or(0),
                err.get("message").and_then(Value::as_str).unwrap_or("").trim(),
            )
        })
        .collect();
    errors.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut previous: Option<&str> = None;
    for (location, line, message) in errors {
        if previous != Some(location) {
            lines.push(format!("{INDENT_PREFIX}{location}"));
            previous = Some(location);
        }
        lines.push(format!("{INDENT_PREFIX}{INDENT_PREFIX}Line {line}: {message}"));
    }
}

/// Grade, file count and one `name: N%` line per section in name order.
/// With `verbose`, findings follow each section grouped by file.
pub fn format_report(report: &Report, verbose: bool) -> String {
    let file_count = report
        .section(COUNT_SECTION)
        .and_then(|count| count.get("file_count"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut lines = vec![
        format!("Grade: {}", report.grade()),
        format!("Files: {file_count}"),
    ];
    for (name, section) in report.sections() {
        if name == COUNT_SECTION {
            continue;
        }
        lines.push(format!("{name}: {}%", section_score(section)));
        if verbose {
            push_errors(&mut lines, section);
        }
    }
    lines.join("\n")
}

/// Header for a cached record followed by the report.
pub fn format_record(record: &CachedReport, report: &Report, cache_hit: bool, verbose: bool) -> String {
    let source = if cache_hit { " (cached)" } else { "" };
    format!(
        "Repository: {}\nRevision: {}{source}\nAnalyzed: {}\n{}",
        record.identity,
        record.last_revision,
        record.cached_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_report(report, verbose)
    )
}
