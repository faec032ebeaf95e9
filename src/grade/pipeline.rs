#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use bon::Builder;
use futures::{StreamExt, stream};
use uuid::Uuid;

use super::{
    NAMING_WARNING_PREFIX,
    archive::extract_archive,
    cascade::cascade_warnings,
    matcher::match_files,
    naming::check_archive_naming,
    results::{ArchiveNaming, ComponentResult, FileMatch, GradingResult, MatchKind, Outcome},
    runner::SimulationRunner,
};
use crate::{
    config::{AssignmentSpec, ConfigError, GraderConfig},
    constants::INTERNAL_MESSAGE_LIMIT,
    util::{round2, truncate_chars},
};

/// One student's archive, waiting to be graded.
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct Submission {
    /// Where the archive lives on disk.
    #[builder(into)]
    pub archive_path:     PathBuf,
    /// Name the student uploaded the archive under. Falls back to the file
    /// name of `archive_path` when empty.
    #[builder(default)]
    pub archive_filename: String,
    /// Student display name.
    pub student_name:     String,
    /// Student id in the grade book.
    #[builder(default)]
    pub student_id:       i64,
}

impl Submission {
    /// The file name checked against the archive naming convention.
    pub fn filename(&self) -> String {
        if !self.archive_filename.is_empty() {
            return self.archive_filename.clone();
        }
        self.archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Grades submissions for one assignment.
#[derive(Debug, Clone)]
pub struct GradingPipeline {
    /// Shared, immutable configuration.
    config: Arc<GraderConfig>,
    /// The assignment being graded.
    spec:   AssignmentSpec,
    /// Runs single components through the simulator.
    runner: SimulationRunner,
}

impl GradingPipeline {
    /// Creates a pipeline for `assignment`, which must exist in `config`.
    pub fn new(config: Arc<GraderConfig>, assignment: u32) -> Result<Self, ConfigError> {
        let spec = config.assignment(assignment)?.clone();
        let runner = SimulationRunner::new(&spec, config.sim_timeout());
        Ok(Self {
            config,
            spec,
            runner,
        })
    }

    /// The assignment this pipeline grades.
    pub fn assignment(&self) -> &AssignmentSpec {
        &self.spec
    }

    /// Grades one submission. Never fails: anything that goes wrong outside
    /// a single component turns into a degraded, zero-point result.
    pub async fn grade(&self, submission: &Submission) -> GradingResult {
        match self.try_grade(submission).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Grading failed for {}: {e:#}", submission.student_name);
                self.degraded(submission, &format!("{e:#}"))
            }
        }
    }

    /// Grades many submissions, at most `batch_concurrency` at a time.
    /// Results come back in input order.
    pub async fn grade_batch(&self, submissions: &[Submission]) -> Vec<GradingResult> {
        stream::iter(submissions)
            .map(|s| self.grade(s))
            .buffered(self.config.batch_concurrency())
            .collect()
            .await
    }

    /// The grading steps proper.
    async fn try_grade(&self, submission: &Submission) -> Result<GradingResult> {
        let ext = self.spec.file_ext.as_str();
        let extraction = extract_archive(&submission.archive_path, ext).await?;
        let naming =
            check_archive_naming(&submission.filename(), &submission.student_name, &self.spec);

        if extraction.found().is_empty() {
            tracing::info!("{}: no {ext} files in archive", submission.student_name);
            return Ok(self.nothing_submitted(submission, naming));
        }

        let names = self.spec.component_names();
        let outcome = match_files(extraction.found(), &names, ext);

        let count = |kind: MatchKind| outcome.matches.iter().filter(|m| m.kind == kind).count();
        tracing::info!(
            "{}: {} exact, {} fixed, {} missing, {} extra",
            submission.student_name,
            count(MatchKind::Exact),
            count(MatchKind::CaseFix) + count(MatchKind::Fuzzy),
            count(MatchKind::NotFound),
            outcome.extra.len()
        );

        let mut warnings: Vec<String> = outcome
            .matches
            .iter()
            .filter(|m| matches!(m.kind, MatchKind::CaseFix | MatchKind::Fuzzy))
            .map(|m| format!("{NAMING_WARNING_PREFIX} {}", m.issue))
            .collect();

        let components: Vec<ComponentResult> = stream::iter(&self.spec.components)
            .map(|c| self.runner.run(c, &outcome.matched))
            .buffered(self.config.workers())
            .collect()
            .await;

        warnings.extend(cascade_warnings(&components, &self.spec.dependency_graph()));

        Ok(GradingResult {
            run_id: Uuid::new_v4(),
            student_name: submission.student_name.clone(),
            student_id: submission.student_id,
            assignment: self.spec.number,
            total_earned: round2(components.iter().map(|c| c.points).sum()),
            total_possible: self.spec.total_points(),
            components,
            warnings,
            file_matches: outcome.matches,
            extra_files: outcome.extra,
            archive_naming: naming,
        })
    }

    /// Result for an archive without a single source file.
    fn nothing_submitted(&self, submission: &Submission, naming: ArchiveNaming) -> GradingResult {
        let ext = &self.spec.file_ext;
        let components = self
            .spec
            .components
            .iter()
            .map(|c| {
                ComponentResult::zero(
                    &c.name,
                    c.max_points,
                    Outcome::Missing,
                    format!("No {ext} files in submission"),
                )
            })
            .collect();
        let file_matches = self
            .spec
            .components
            .iter()
            .map(|c| FileMatch::new(&c.name, "", MatchKind::NotFound, format!("No {ext} files in zip")))
            .collect();

        GradingResult {
            run_id: Uuid::new_v4(),
            student_name: submission.student_name.clone(),
            student_id: submission.student_id,
            assignment: self.spec.number,
            components,
            total_earned: 0.0,
            total_possible: self.spec.total_points(),
            warnings: vec![format!("No {ext} files found in zip")],
            file_matches,
            extra_files: Vec::new(),
            archive_naming: naming,
        }
    }

    /// Zero-point result for a submission the pipeline could not grade.
    fn degraded(&self, submission: &Submission, error: &str) -> GradingResult {
        let error = truncate_chars(error, INTERNAL_MESSAGE_LIMIT);
        let components = self
            .spec
            .components
            .iter()
            .map(|c| ComponentResult::zero(&c.name, c.max_points, Outcome::Internal, &error))
            .collect();

        GradingResult {
            run_id: Uuid::new_v4(),
            student_name: submission.student_name.clone(),
            student_id: submission.student_id,
            assignment: self.spec.number,
            components,
            total_earned: 0.0,
            total_possible: self.spec.total_points(),
            warnings: vec![format!("Internal grading error: {error}")],
            file_matches: Vec::new(),
            extra_files: Vec::new(),
            archive_naming: check_archive_naming(
                &submission.filename(),
                &submission.student_name,
                &self.spec,
            ),
        }
    }
}
