#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # hdlgrade
//! ## Introduction
//!
//! Grades hardware-description and assembly homework archives against the
//! course simulator.
//!
//! ## Configuration
//!
//! Paths and limits come from `HDLGRADE_*` environment variables, optionally
//! set in a `.env` file next to where the command is run.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use hdlgrade::{
    GraderConfig, GradingPipeline, GradingResult, Submission,
    grade::{header_line, summary_table, template_feedback},
    health,
};
use serde::Deserialize;
use tracing::{Level, metadata::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Arguments of the `grade` subcommand.
#[derive(Debug, Clone)]
struct GradeArgs {
    /// Student display name
    student:    String,
    /// Student id in the grade book
    id:         i64,
    /// Homework number, detected from the archive name when absent
    assignment: Option<u32>,
    /// Name the archive was uploaded under
    name:       Option<String>,
    /// Print the result as JSON
    json:       bool,
    /// Archive to grade
    archive:    PathBuf,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade one archive
    Grade(GradeArgs),
    /// Grade every archive listed in a manifest
    Batch(Option<u32>, PathBuf),
    /// Check the grading environment
    Check(Option<u32>),
    /// Guess the homework number from a title
    Detect(String),
}

/// One entry of a batch manifest.
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    /// Archive to grade
    archive:  PathBuf,
    /// Student display name
    student:  String,
    /// Student id in the grade book
    #[serde(default)]
    id:       i64,
    /// Name the archive was uploaded under
    #[serde(default)]
    filename: Option<String>,
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the homework number
    fn a() -> impl Parser<Option<u32>> {
        long("assignment")
            .short('a')
            .help("Homework number")
            .argument::<u32>("N")
            .optional()
    }

    let grade = {
        let student = long("student")
            .short('s')
            .help("Student display name")
            .argument::<String>("NAME");
        let id = long("id")
            .help("Student id in the grade book")
            .argument::<i64>("ID")
            .fallback(0);
        let assignment = a();
        let name = long("name")
            .help("File name the archive was uploaded as")
            .argument::<String>("FILENAME")
            .optional();
        let json = long("json").help("Print the result as JSON").switch();
        let archive = positional::<PathBuf>("ARCHIVE").help("Archive to grade (.zip or .rar)");
        construct!(GradeArgs {
            student,
            id,
            assignment,
            name,
            json,
            archive
        })
    }
    .to_options()
    .command("grade")
    .help("Grade a single submission")
    .map(Cmd::Grade);

    let batch = {
        let assignment = a();
        let manifest = positional::<PathBuf>("MANIFEST").help("JSON list of submissions");
        construct!(Cmd::Batch(assignment, manifest))
    }
    .to_options()
    .command("batch")
    .help("Grade every submission in a manifest, printing JSON");

    let check = construct!(Cmd::Check(a()))
        .to_options()
        .command("check")
        .help("Check that the simulator and test files are in place");

    let detect = {
        let title = positional::<String>("TITLE").help("Assignment title or archive name");
        construct!(Cmd::Detect(title))
    }
    .to_options()
    .command("detect")
    .help("Print the homework number a title refers to");

    let cmd = construct!([grade, batch, check, detect]);

    cmd.to_options()
        .descr("Grader for hardware and assembly homework")
        .run()
}

/// Picks the assignment from an explicit number or, failing that, a title.
fn resolve_assignment(config: &GraderConfig, explicit: Option<u32>, title: &str) -> Result<u32> {
    if let Some(n) = explicit {
        return Ok(n);
    }
    config
        .detect_assignment(title)
        .map(|a| a.number)
        .with_context(|| format!("Could not tell which homework '{title}' is; pass --assignment"))
}

/// Grades one archive and prints the report.
async fn grade(config: Arc<GraderConfig>, args: GradeArgs) -> Result<()> {
    let submission = Submission::builder()
        .archive_path(args.archive)
        .archive_filename(args.name.unwrap_or_default())
        .student_name(args.student)
        .student_id(args.id)
        .build();

    let number = resolve_assignment(&config, args.assignment, &submission.filename())?;
    let pipeline = GradingPipeline::new(config, number)?;
    let result = pipeline.grade(&submission).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        eprintln!("{}", summary_table(&result));
        println!("{}\n", header_line(&result).bold());
        println!("{}", template_feedback(&result, pipeline.assignment()));
    }
    Ok(())
}

/// Grades a manifest of archives and prints every result as JSON, in
/// manifest order. Entries whose homework cannot be determined are skipped
/// with a warning.
async fn batch(config: Arc<GraderConfig>, assignment: Option<u32>, manifest: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&manifest)
        .with_context(|| format!("Could not read manifest {}", manifest.display()))?;
    let entries: Vec<ManifestEntry> = serde_json::from_str(&text)
        .with_context(|| format!("Could not parse manifest {}", manifest.display()))?;

    let mut groups: BTreeMap<u32, Vec<(usize, Submission)>> = BTreeMap::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let submission = Submission::builder()
            .archive_path(entry.archive)
            .archive_filename(entry.filename.unwrap_or_default())
            .student_name(entry.student)
            .student_id(entry.id)
            .build();
        match resolve_assignment(&config, assignment, &submission.filename()) {
            Ok(number) => groups.entry(number).or_default().push((index, submission)),
            Err(e) => warn!("Skipping {}: {e:#}", submission.student_name),
        }
    }

    let mut slots: Vec<Option<GradingResult>> = Vec::new();
    for (number, group) in groups {
        let pipeline = match GradingPipeline::new(config.clone(), number) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                warn!("Skipping {} submission(s): {e}", group.len());
                continue;
            }
        };
        let (indexes, submissions): (Vec<usize>, Vec<Submission>) = group.into_iter().unzip();
        let results = pipeline.grade_batch(&submissions).await;
        for (index, result) in indexes.into_iter().zip(results) {
            if slots.len() <= index {
                slots.resize_with(index + 1, || None);
            }
            slots[index] = Some(result);
        }
    }

    let results: Vec<GradingResult> = slots.into_iter().flatten().collect();
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Runs the health check for one or every assignment.
fn check(config: &GraderConfig, assignment: Option<u32>) -> Result<()> {
    let numbers: Vec<u32> = match assignment {
        Some(n) => vec![n],
        None => config.assignments().map(|a| a.number).collect(),
    };

    let mut total = 0;
    for number in numbers {
        let issues = health::check(config, number)?;
        if issues.is_empty() {
            println!("{} homework {number}", "OK".green());
        } else {
            for issue in &issues {
                println!("{} homework {number}: {issue}", "ISSUE".red());
            }
        }
        total += issues.len();
    }

    if total > 0 {
        bail!("{total} issue(s) found");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let filter_layer = LevelFilter::from_level(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let cmd = options();
    let config = Arc::new(GraderConfig::from_env()?);

    match cmd {
        Cmd::Grade(args) => grade(config, args).await?,
        Cmd::Batch(assignment, manifest) => batch(config, assignment, manifest).await?,
        Cmd::Check(assignment) => check(&config, assignment)?,
        Cmd::Detect(title) => match config.detect_assignment(&title) {
            Some(a) => println!("{} {}", a.number, a.title.dimmed()),
            None => bail!("No homework matches '{title}'"),
        },
    };

    Ok(())
}
