#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use itertools::Itertools;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use super::results::{ComponentResult, GradingResult, MatchKind, Outcome};
use crate::{
    config::AssignmentSpec,
    constants::FEEDBACK_SIGN_OFF,
    util::{fmt_points, truncate_chars},
};

/// Characters of a syntax error quoted in template feedback.
const QUOTED_ERROR_LIMIT: usize = 60;

/// One row of the summary table.
#[derive(Tabled)]
struct ComponentRow {
    /// Component name.
    #[tabled(rename = "Component")]
    component: String,
    /// Outcome label.
    #[tabled(rename = "Status")]
    status:    String,
    /// `earned/available`.
    #[tabled(rename = "Points")]
    points:    String,
    /// Diagnostic message.
    #[tabled(rename = "Detail")]
    detail:    String,
}

impl From<&ComponentResult> for ComponentRow {
    fn from(c: &ComponentResult) -> Self {
        Self {
            component: c.name.clone(),
            status:    c.outcome.label().to_string(),
            points:    format!("{}/{}", fmt_points(c.points), fmt_points(c.max_points)),
            detail:    c.message.clone(),
        }
    }
}

/// Renders the per-component results as a table.
pub fn summary_table(result: &GradingResult) -> String {
    let rows: Vec<ComponentRow> = result.components.iter().map(ComponentRow::from).collect();

    Table::new(rows)
        .with(Panel::header(format!(
            "{} -- Homework {}",
            result.student_name, result.assignment
        )))
        .with(Panel::footer(format!(
            "Total: {}/{} ({}%)",
            fmt_points(result.total_earned),
            fmt_points(result.total_possible),
            fmt_points(result.percentage())
        )))
        .with(Modify::new(Rows::new(1..)).with(Width::wrap(40).keep_words(true)))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(
            Modify::new(Rows::last())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}

/// Two-line summary: status icon and student, then score and counts.
pub fn header_line(result: &GradingResult) -> String {
    let pct = result.percentage();
    let icon = if pct == 100.0 {
        "🌟"
    } else if pct >= 80.0 {
        "✅"
    } else if pct >= 50.0 {
        "⚠️"
    } else {
        "❌"
    };

    let passed = result.passed_names().len();
    let partial = result.components.iter().filter(|c| c.is_partial()).count();
    let failed = result.components.len() - passed - partial;

    let mut parts = vec![format!("{passed} pass")];
    if partial > 0 {
        parts.push(format!("{partial} partial"));
    }
    if failed > 0 {
        parts.push(format!("{failed} fail"));
    }
    let naming = if result.has_naming_issues() { " ⚠️naming" } else { "" };

    format!(
        "{icon} {}\nScore: {}/{} ({}%) -- {}{naming}",
        result.student_name,
        fmt_points(result.total_earned),
        fmt_points(result.total_possible),
        fmt_points(pct),
        parts.join(", ")
    )
}

/// Appends the expected/produced pair of a mismatch, if there is one.
fn with_diff(mut line: String, c: &ComponentResult) -> String {
    if !c.expected.is_empty() && !c.actual.is_empty() {
        line.push_str(&format!(
            "\n    Expected: {}\n    Got:      {}",
            c.expected, c.actual
        ));
    }
    line
}

/// Structured plain-text digest of a result, written for a feedback writer
/// (human or model) that never sees the raw result.
pub fn feedback_context(result: &GradingResult) -> String {
    let mut lines = Vec::new();
    let mut errors = Vec::new();

    for c in &result.components {
        let (earned, max) = (fmt_points(c.points), fmt_points(c.max_points));
        if c.passed {
            lines.push(format!("  PASS  {} ({earned}/{max})", c.name));
        } else if c.points > 0.0 {
            lines.push(format!(
                "  PARTIAL  {} -- {}/{} tests, {earned}/{max} pts",
                c.name, c.passed_tests, c.total_tests
            ));
            errors.push(with_diff(format!("{}: {}", c.name, c.message), c));
        } else {
            lines.push(format!("  FAIL  {} -- {}: {}", c.name, c.outcome, c.message));
            errors.push(with_diff(
                format!("{} ({}): {}", c.name, c.outcome, c.message),
                c,
            ));
        }
    }

    let mut text = format!(
        "Student: {}\nScore: {}/{} ({}%)\n\nResults:\n{}\n\nErrors:\n{}\n",
        result.student_name,
        fmt_points(result.total_earned),
        fmt_points(result.total_possible),
        fmt_points(result.percentage()),
        lines.join("\n"),
        if errors.is_empty() {
            "All passed!".to_string()
        } else {
            errors.join("\n")
        }
    );

    if result.has_naming_issues() {
        text.push_str("\nFile naming issues:");
        if !result.archive_naming.is_correct {
            text.push_str(&format!("\n  - ZIP: {}", result.archive_naming.issue));
        }
        for m in result.naming_issues() {
            text.push_str(&format!("\n  - {}", m.issue));
        }
        text.push('\n');
    }

    let cascade = result.cascade_warnings();
    if !cascade.is_empty() {
        text.push_str("\nCascade warnings:\n");
        text.push_str(&cascade.iter().map(|w| format!("  - {w}")).join("\n"));
        text.push('\n');
    }

    text
}

/// Deterministic feedback message for a student.
pub fn template_feedback(result: &GradingResult, assignment: &AssignmentSpec) -> String {
    let first = result
        .student_name
        .split_whitespace()
        .next()
        .unwrap_or("there");
    let hint = |name: &str| {
        assignment
            .component(name)
            .and_then(|c| c.hint.as_deref())
            .filter(|h| !h.is_empty())
    };

    let mut lines = vec![
        format!("Hi {first},\n"),
        format!(
            "Here's your feedback for HW{} -- {}:\n",
            result.assignment, assignment.title
        ),
    ];

    if !result.archive_naming.is_correct {
        lines.push(format!("NOTE on zip naming: {}\n", result.archive_naming.issue));
    }

    let fixable: Vec<_> = result
        .naming_issues()
        .into_iter()
        .filter(|m| m.kind != MatchKind::NotFound)
        .collect();
    if !fixable.is_empty() {
        lines.push("NOTE on file naming:".to_string());
        lines.extend(fixable.iter().map(|m| format!("  {}", m.issue)));
        lines.push("  Please use exact filenames next time (case-sensitive).\n".to_string());
    }

    let pct = result.percentage();
    if pct == 100.0 && !result.has_naming_issues() {
        lines.push("Perfect score! All tests pass. Excellent work.\n".to_string());
    } else if pct == 100.0 {
        lines.push("All tests pass! Just fix the naming next time.\n".to_string());
    } else {
        let passed = result.passed_names();
        let (partial, zero): (Vec<&ComponentResult>, Vec<&ComponentResult>) =
            result.failed().into_iter().partition(|c| c.points > 0.0);

        if !passed.is_empty() {
            lines.push(format!(
                "Passing ({}/{}): {}\n",
                passed.len(),
                result.components.len(),
                passed.join(", ")
            ));
        }

        if !partial.is_empty() {
            lines.push("Partial credit:".to_string());
            for c in &partial {
                let (earned, max) = (fmt_points(c.points), fmt_points(c.max_points));
                if c.outcome == Outcome::Mismatch && c.passed_tests > 0 {
                    lines.push(format!(
                        "  {}: {}/{} tests ({earned}/{max} pts)",
                        c.name, c.passed_tests, c.total_tests
                    ));
                } else {
                    lines.push(format!("  {}: effort credit ({earned}/{max} pts)", c.name));
                }
                if let Some(h) = hint(&c.name) {
                    lines.push(format!("    Hint: {h}"));
                }
            }
            lines.push(String::new());
        }

        if !zero.is_empty() {
            lines.push("Needs work:".to_string());
            for c in &zero {
                let note = match c.outcome {
                    Outcome::Missing => "Not found in your zip.".to_string(),
                    Outcome::Mismatch => "All tests failed.".to_string(),
                    Outcome::Builtin => "Uses BUILTIN -- implement yourself.".to_string(),
                    Outcome::Syntax => format!(
                        "Syntax error -- {}",
                        truncate_chars(&c.message, QUOTED_ERROR_LIMIT)
                    ),
                    Outcome::Timeout => "Timed out.".to_string(),
                    Outcome::Internal | Outcome::Pass => {
                        "Could not be graded automatically; we will take a look.".to_string()
                    }
                };
                lines.push(format!("  {}: {note}", c.name));
                if let Some(h) = hint(&c.name) {
                    lines.push(format!("    Hint: {h}"));
                }
            }
        }

        let cascade = result.cascade_warnings();
        if !cascade.is_empty() {
            lines.push(String::new());
            lines.extend(cascade.iter().map(|w| format!("  Note: {w}")));
        }
        lines.push("\nFix earlier components first.\n".to_string());
    }

    if !result.extra_files.is_empty() {
        lines.push(format!(
            "Extra files (not needed): {}\n",
            result.extra_files.join(", ")
        ));
    }

    lines.push("Questions? Don't hesitate to ask!\n".to_string());
    lines.push(FEEDBACK_SIGN_OFF.to_string());
    lines.join("\n")
}
