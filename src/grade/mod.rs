#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Unpacking submitted archives into sandboxes.
pub mod archive;
/// Failure explanations that follow the component dependency graph.
pub mod cascade;
/// Resolving expected component names to submitted files.
pub mod matcher;
/// Archive file-name convention checks.
pub mod naming;
/// Loose file-name normalization used by the matcher.
pub mod normalize;
/// End-to-end grading of submissions.
pub mod pipeline;
/// Tables and text rendered from grading results.
pub mod report;
/// Shared grading result types.
pub mod results;
/// Running a single component through the simulator.
pub mod runner;
/// Partial credit from comparison traces.
pub mod scoring;

pub use archive::{Extraction, FoundFiles, extract_archive};
pub use cascade::cascade_warnings;
pub use matcher::{MatchOutcome, match_files};
pub use naming::{check_archive_naming, expected_archive_stem};
pub use normalize::normalize_name;
pub use pipeline::{GradingPipeline, Submission};
pub use report::{feedback_context, header_line, summary_table, template_feedback};
pub use results::{
    ArchiveNaming, ComponentResult, FileMatch, GradingResult, MatchKind, Outcome,
};
pub use runner::{SimulationRunner, SourceKind, clean_error, has_work, uses_builtin};
pub use scoring::{PartialScore, partial_credit, score_traces};

/// Prefix of warnings that report a file-naming fix rather than a cascade.
pub const NAMING_WARNING_PREFIX: &str = "Naming:";
