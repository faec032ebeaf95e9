#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use anyhow::{Context, Result};
use regex::Regex;

use super::{
    results::{ComponentResult, Outcome},
    scoring::partial_credit,
};
use crate::{
    config::{AssignmentSpec, ComponentSpec},
    constants::{
        BUILTIN_PATTERN, FAILURE_MARKER_PATTERN, INTERNAL_MESSAGE_LIMIT, SUCCESS_MARKER,
        SYNTAX_EFFORT_CREDIT, SYNTAX_MESSAGE_LIMIT, SYNTAX_MESSAGE_LINES, TIMEOUT_EFFORT_CREDIT,
    },
    process::{ProcessError, run_collect},
    util::{files_with_prefix, round2, truncate_chars},
};

/// Reserved built-in token.
static BUILTIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(BUILTIN_PATTERN).expect("valid builtin regex"));

/// Comparison failure marker.
static FAILURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FAILURE_MARKER_PATTERN).expect("valid failure regex"));

/// Body of an HDL `PARTS:` section.
static PARTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)PARTS:\s*(.*?)\}").expect("valid parts regex"));

/// `//` comments.
static LINE_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//.*").expect("valid comment regex"));

/// `/* */` comments.
static BLOCK_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid comment regex"));

/// Language family of a component source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Structural hardware description.
    Hdl,
    /// Hack assembly.
    Asm,
    /// Anything else; never earns effort credit.
    Other,
}

impl SourceKind {
    /// Picks the source kind from an extension such as `.hdl`.
    pub fn from_ext(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            ".hdl" => SourceKind::Hdl,
            ".asm" => SourceKind::Asm,
            _ => SourceKind::Other,
        }
    }
}

/// True when an HDL source delegates to the simulator's own implementation.
pub fn uses_builtin(source: &str) -> bool {
    BUILTIN_RE.is_match(source)
}

/// True when a source shows a nontrivial attempt, which earns effort credit
/// on syntax errors and timeouts.
///
/// HDL needs a non-empty `PARTS:` body once comments are removed; assembly
/// needs more than two non-blank, non-comment lines.
pub fn has_work(source: &str, kind: SourceKind) -> bool {
    match kind {
        SourceKind::Hdl => PARTS_RE.captures(source).is_some_and(|caps| {
            let body = LINE_COMMENT_RE.replace_all(&caps[1], "");
            let body = BLOCK_COMMENT_RE.replace_all(&body, "");
            !body.trim().is_empty()
        }),
        SourceKind::Asm => {
            source
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with("//"))
                .count()
                > 2
        }
        SourceKind::Other => false,
    }
}

/// Reduces raw simulator output to a short error description, dropping JVM
/// stack frames and noise.
pub fn clean_error(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| {
            !l.is_empty()
                && !l.starts_with("at ")
                && !l.to_lowercase().contains("java.")
                && !l.contains("Exception in thread")
        })
        .take(SYNTAX_MESSAGE_LINES)
        .collect();

    if lines.is_empty() {
        "Unknown error".to_string()
    } else {
        truncate_chars(&lines.join("; "), SYNTAX_MESSAGE_LIMIT)
    }
}

/// Runs one component's test script through the external simulator.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    /// Simulator launcher.
    simulator: PathBuf,
    /// Source extension, including the dot.
    file_ext:  String,
    /// Directory holding the assignment's fixtures.
    test_dir:  PathBuf,
    /// Wall-clock limit per simulator call.
    timeout:   Duration,
}

impl SimulationRunner {
    /// Creates a runner for one assignment.
    pub fn new(assignment: &AssignmentSpec, timeout: Duration) -> Self {
        Self {
            simulator: assignment.simulator_path.clone(),
            file_ext: assignment.file_ext.clone(),
            test_dir: assignment.test_dir.clone(),
            timeout,
        }
    }

    /// Grades `component` given every file the matcher resolved for this
    /// submission. Never fails: every problem becomes an outcome.
    pub async fn run(
        &self,
        component: &ComponentSpec,
        matched: &HashMap<String, PathBuf>,
    ) -> ComponentResult {
        let result = self.grade(component, matched).await;
        tracing::debug!(
            "{}: {} ({}/{})",
            result.name,
            result.outcome,
            result.points,
            result.max_points
        );
        result
    }

    /// Applies the grading policy for one component.
    async fn grade(
        &self,
        component: &ComponentSpec,
        matched: &HashMap<String, PathBuf>,
    ) -> ComponentResult {
        let name = component.name.as_str();
        let max = component.max_points;

        let Some(source) = matched.get(name) else {
            return ComponentResult::zero(name, max, Outcome::Missing, "Not submitted");
        };

        let kind = SourceKind::from_ext(&self.file_ext);
        let text = tokio::fs::read(source)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        if kind == SourceKind::Hdl && uses_builtin(&text) {
            return ComponentResult::zero(
                name,
                max,
                Outcome::Builtin,
                "Uses BUILTIN (not allowed)",
            );
        }

        let work = has_work(&text, kind);
        if !tokio::fs::try_exists(&component.test_script).await.unwrap_or(false) {
            return ComponentResult::zero(
                name,
                max,
                Outcome::Internal,
                format!("{name}.tst not found"),
            );
        }

        match self.simulate(component, matched, work).await {
            Ok(result) => result,
            Err(ProcessError::TimedOut(_)) => {
                let points = if work { round2(max * TIMEOUT_EFFORT_CREDIT) } else { 0.0 };
                ComponentResult::builder()
                    .name(name)
                    .points(points)
                    .max_points(max)
                    .outcome(Outcome::Timeout)
                    .message("Timed out (possible loop)")
                    .build()
            }
            Err(e) => ComponentResult::zero(
                name,
                max,
                Outcome::Internal,
                truncate_chars(&format!("{e:#}"), INTERNAL_MESSAGE_LIMIT),
            ),
        }
    }

    /// Prepares a sandbox, runs the simulator in it and classifies the
    /// output. The sandbox is removed when this returns, whichever way.
    async fn simulate(
        &self,
        component: &ComponentSpec,
        matched: &HashMap<String, PathBuf>,
        work: bool,
    ) -> Result<ComponentResult, ProcessError> {
        let sandbox = tempfile::Builder::new()
            .prefix(&format!("c_{}_", component.name))
            .tempdir()
            .context("Could not create component sandbox")?;

        self.stage(component, matched, sandbox.path()).await?;

        let script = sandbox
            .path()
            .join(format!("{}.tst", component.name))
            .into_os_string();
        let out = run_collect(
            &self.simulator,
            &[script],
            Some(sandbox.path()),
            Some(self.timeout),
        )
        .await?;

        Ok(self
            .classify(component, &out.combined(), sandbox.path(), work)
            .await)
    }

    /// Copies the renamed sources and the component's fixtures into the
    /// sandbox.
    async fn stage(
        &self,
        component: &ComponentSpec,
        matched: &HashMap<String, PathBuf>,
        sandbox: &Path,
    ) -> Result<()> {
        for (expected, source) in matched {
            let dest = sandbox.join(format!("{expected}{}", self.file_ext));
            tokio::fs::copy(source, &dest)
                .await
                .with_context(|| format!("Could not copy {}", source.display()))?;
        }

        let mut fixtures = vec![component.test_script.clone()];
        if tokio::fs::try_exists(&component.compare_trace).await.unwrap_or(false) {
            fixtures.push(component.compare_trace.clone());
        }
        let (prefix, test_dir) = (component.name.clone(), self.test_dir.clone());
        let siblings = tokio::task::spawn_blocking(move || files_with_prefix(&prefix, &test_dir))
            .await
            .context("fixture lookup task failed")??;
        fixtures.extend(siblings);

        for fixture in fixtures {
            let Some(file_name) = fixture.file_name() else {
                continue;
            };
            let dest = sandbox.join(file_name);
            if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
                continue;
            }
            tokio::fs::copy(&fixture, &dest)
                .await
                .with_context(|| format!("Could not copy fixture {}", fixture.display()))?;
        }

        Ok(())
    }

    /// Turns simulator output into a graded result.
    async fn classify(
        &self,
        component: &ComponentSpec,
        output: &str,
        sandbox: &Path,
        work: bool,
    ) -> ComponentResult {
        let name = component.name.as_str();
        let max = component.max_points;

        if output.contains(SUCCESS_MARKER) {
            let tests = tokio::fs::read_to_string(&component.compare_trace)
                .await
                .map(|text| text.lines().count().saturating_sub(1))
                .unwrap_or(0);
            return ComponentResult::builder()
                .name(name)
                .passed(true)
                .points(max)
                .max_points(max)
                .outcome(Outcome::Pass)
                .total_tests(tests)
                .passed_tests(tests)
                .build();
        }

        if FAILURE_RE.is_match(output) {
            let score = partial_credit(sandbox, name, max).await;
            return ComponentResult::builder()
                .name(name)
                .points(score.points)
                .max_points(max)
                .outcome(Outcome::Mismatch)
                .message(format!(
                    "{}/{} tests passed (first fail line {})",
                    score.passed, score.total, score.first_fail
                ))
                .fail_line(score.first_fail)
                .expected(score.expected)
                .actual(score.actual)
                .total_tests(score.total)
                .passed_tests(score.passed)
                .build();
        }

        let error = clean_error(output);
        if work {
            ComponentResult::builder()
                .name(name)
                .points(round2(max * SYNTAX_EFFORT_CREDIT))
                .max_points(max)
                .outcome(Outcome::Syntax)
                .message(format!("Syntax error (effort credit): {error}"))
                .build()
        } else {
            ComponentResult::zero(name, max, Outcome::Syntax, error)
        }
    }
}
