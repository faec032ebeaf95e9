#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use bon::Builder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::round1;

/// How an expected component name was resolved to a submitted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The file name matched verbatim.
    Exact,
    /// The file name matched ignoring case.
    CaseFix,
    /// The file name matched after normalization or by substring.
    Fuzzy,
    /// No file could be resolved.
    NotFound,
}

impl Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchKind::Exact => "exact",
            MatchKind::CaseFix => "case_fix",
            MatchKind::Fuzzy => "fuzzy",
            MatchKind::NotFound => "not_found",
        };
        f.write_str(s)
    }
}

/// Resolution of one expected component name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMatch {
    /// Canonical component name.
    pub expected_name:   String,
    /// Submitted file name including extension, empty when not found.
    pub actual_filename: String,
    /// Which matching pass resolved it.
    pub kind:            MatchKind,
    /// Human readable description of the naming problem, if any.
    pub issue:           String,
}

impl FileMatch {
    /// Creates a new file match.
    pub fn new(
        expected_name: impl Into<String>,
        actual_filename: impl Into<String>,
        kind: MatchKind,
        issue: impl Into<String>,
    ) -> Self {
        Self {
            expected_name: expected_name.into(),
            actual_filename: actual_filename.into(),
            kind,
            issue: issue.into(),
        }
    }
}

/// Result of checking the archive's own file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveNaming {
    /// Archive file name as submitted.
    pub original_filename: String,
    /// Whether it matched the canonical name exactly.
    pub is_correct:        bool,
    /// The canonical name, with extension.
    pub expected_pattern:  String,
    /// What is wrong with it, empty when correct.
    pub issue:             String,
}

/// Grading outcome category of a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every comparison line matched.
    Pass,
    /// The component was not submitted.
    Missing,
    /// The component delegates to the simulator's built-in chip.
    Builtin,
    /// Some comparison lines diverged.
    Mismatch,
    /// The simulator could not load or run the source.
    Syntax,
    /// The simulator exceeded its time limit.
    Timeout,
    /// The grader itself failed.
    Internal,
}

impl Outcome {
    /// Short label used in tables and reports.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Missing => "missing",
            Outcome::Builtin => "builtin",
            Outcome::Mismatch => "mismatch",
            Outcome::Syntax => "syntax",
            Outcome::Timeout => "timeout",
            Outcome::Internal => "internal",
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Grade of one component in one submission.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
pub struct ComponentResult {
    /// Canonical component name.
    pub name:         String,
    /// Whether every test passed.
    #[builder(default)]
    pub passed:       bool,
    /// Points earned, never above `max_points`.
    #[builder(default)]
    pub points:       f64,
    /// Points available.
    pub max_points:   f64,
    /// Outcome category.
    pub outcome:      Outcome,
    /// Diagnostic message.
    #[builder(default)]
    pub message:      String,
    /// 1-based comparison line of the first failure, 0 when none.
    #[builder(default)]
    pub fail_line:    usize,
    /// Expected comparison line at the first failure.
    #[builder(default)]
    pub expected:     String,
    /// Produced output line at the first failure.
    #[builder(default)]
    pub actual:       String,
    /// Number of comparison lines.
    #[builder(default)]
    pub total_tests:  usize,
    /// Number of comparison lines that matched.
    #[builder(default)]
    pub passed_tests: usize,
}

impl ComponentResult {
    /// A zero-point result with the given outcome and message.
    pub fn zero(
        name: impl Into<String>,
        max_points: f64,
        outcome: Outcome,
        message: impl Into<String>,
    ) -> Self {
        Self::builder()
            .name(name)
            .max_points(max_points)
            .outcome(outcome)
            .message(message)
            .build()
    }

    /// True when some, but not all, points were earned.
    pub fn is_partial(&self) -> bool {
        !self.passed && self.points > 0.0
    }
}

/// Everything known about one graded submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingResult {
    /// Unique id of this grading run.
    pub run_id:         Uuid,
    /// Student display name.
    pub student_name:   String,
    /// Student id in the grade book.
    pub student_id:     i64,
    /// Assignment number.
    pub assignment:     u32,
    /// One entry per expected component, in grading order.
    pub components:     Vec<ComponentResult>,
    /// Sum of component points, rounded to two decimals.
    pub total_earned:   f64,
    /// Points available for the assignment.
    pub total_possible: f64,
    /// Naming and cascade warnings.
    pub warnings:       Vec<String>,
    /// One entry per expected component.
    pub file_matches:   Vec<FileMatch>,
    /// Submitted files that matched no component.
    pub extra_files:    Vec<String>,
    /// Check of the archive's file name.
    pub archive_naming: ArchiveNaming,
}

impl GradingResult {
    /// Earned points as a percentage, rounded to one decimal.
    pub fn percentage(&self) -> f64 {
        if self.total_possible > 0.0 {
            round1(self.total_earned / self.total_possible * 100.0)
        } else {
            0.0
        }
    }

    /// Names of the components that passed.
    pub fn passed_names(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| c.passed)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Components that did not pass, including partial credit.
    pub fn failed(&self) -> Vec<&ComponentResult> {
        self.components.iter().filter(|c| !c.passed).collect()
    }

    /// File matches that were not exact.
    pub fn naming_issues(&self) -> Vec<&FileMatch> {
        self.file_matches
            .iter()
            .filter(|m| m.kind != MatchKind::Exact)
            .collect()
    }

    /// True when any file or the archive itself is misnamed.
    pub fn has_naming_issues(&self) -> bool {
        !self.naming_issues().is_empty() || !self.archive_naming.is_correct
    }

    /// Warnings that are not file-naming notes.
    pub fn cascade_warnings(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter(|w| !w.starts_with(super::NAMING_WARNING_PREFIX))
            .map(String::as_str)
            .collect()
    }
}
