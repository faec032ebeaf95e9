#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use bon::bon;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog,
    constants::{DEFAULT_ARCHIVE_TEMPLATE, DEFAULT_SIM_TIMEOUT},
    util::round2,
};

/// Matches assignment titles such as "Homework 3" or "Project #5".
static ASSIGNMENT_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:homework|hw|project)\s*#?\s*(\d+)").expect("valid assignment regex")
});

/// Errors raised while building or querying a [`GraderConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No assignment with this number is configured.
    #[error("Assignment {0} is not defined")]
    UnknownAssignment(u32),
    /// The assignment catalogue file could not be read.
    #[error("Could not read assignment catalogue {path}")]
    CatalogRead {
        /// Path of the catalogue file
        path:   PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// The assignment catalogue file is not valid JSON for the catalogue schema.
    #[error("Could not parse assignment catalogue {path}")]
    CatalogParse {
        /// Path of the catalogue file
        path:   PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },
}

/// The external simulator an assignment is graded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Simulator {
    /// Chip-level HDL simulator.
    HardwareSimulator,
    /// Hack machine-language emulator.
    #[serde(rename = "CPUEmulator")]
    CpuEmulator,
    /// VM-code emulator.
    #[serde(rename = "VMEmulator")]
    VmEmulator,
}

impl Simulator {
    /// File name of the launcher script inside the tools directory.
    pub fn script_name(self) -> &'static str {
        match self {
            Simulator::HardwareSimulator => "HardwareSimulator.sh",
            Simulator::CpuEmulator => "CPUEmulator.sh",
            Simulator::VmEmulator => "VMEmulator.sh",
        }
    }
}

/// A component as written in the assignment catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Canonical component name, without extension.
    pub name:       String,
    /// Points available for this component.
    pub points:     f64,
    /// Components this one is built from.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// One-line hint shown in template feedback.
    #[serde(default)]
    pub hint:       Option<String>,
}

/// An assignment as written in the assignment catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentDef {
    /// Assignment (homework) number.
    pub number:           u32,
    /// Human readable title.
    pub title:            String,
    /// Simulator used to run the test scripts.
    pub simulator:        Simulator,
    /// Source file extension including the dot, e.g. `.hdl`.
    pub file_ext:         String,
    /// Directory under the test-files root holding `.tst`/`.cmp` fixtures.
    pub test_dir:         String,
    /// Expected archive name, with `{first}`, `{last}` and `{n}` placeholders.
    #[serde(default)]
    pub archive_template: Option<String>,
    /// Lower-case phrases used to recognise this assignment from its title.
    #[serde(default)]
    pub keywords:         Vec<String>,
    /// Components in grading order.
    pub components:       Vec<ComponentDef>,
}

/// A component with its fixture paths resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentSpec {
    /// Canonical component name, without extension.
    pub name:          String,
    /// Points available for this component.
    pub max_points:    f64,
    /// Components this one is built from.
    pub depends_on:    Vec<String>,
    /// One-line hint shown in template feedback.
    pub hint:          Option<String>,
    /// `<name>.tst` in the assignment's test directory.
    pub test_script:   PathBuf,
    /// `<name>.cmp` in the assignment's test directory.
    pub compare_trace: PathBuf,
}

/// A fully resolved assignment, read-only during grading.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentSpec {
    /// Assignment (homework) number.
    pub number:           u32,
    /// Human readable title.
    pub title:            String,
    /// Simulator used to run the test scripts.
    pub simulator:        Simulator,
    /// Launcher script for the simulator.
    pub simulator_path:   PathBuf,
    /// Source file extension including the dot, e.g. `.hdl`.
    pub file_ext:         String,
    /// Directory holding the `.tst`/`.cmp` fixtures.
    pub test_dir:         PathBuf,
    /// Expected archive name template.
    pub archive_template: String,
    /// Lower-case phrases used to recognise this assignment from its title.
    pub keywords:         Vec<String>,
    /// Components in grading order.
    pub components:       Vec<ComponentSpec>,
}

impl AssignmentSpec {
    /// Resolves a catalogue entry against the tools and test-file roots.
    fn resolve(def: AssignmentDef, tools_dir: &Path, tests_dir: &Path) -> Self {
        let test_dir = tests_dir.join(&def.test_dir);
        let components = def
            .components
            .into_iter()
            .map(|c| ComponentSpec {
                test_script:   test_dir.join(format!("{}.tst", c.name)),
                compare_trace: test_dir.join(format!("{}.cmp", c.name)),
                name:          c.name,
                max_points:    c.points,
                depends_on:    c.depends_on,
                hint:          c.hint,
            })
            .collect();

        Self {
            number: def.number,
            title: def.title,
            simulator: def.simulator,
            simulator_path: tools_dir.join(def.simulator.script_name()),
            file_ext: def.file_ext,
            test_dir,
            archive_template: def
                .archive_template
                .unwrap_or_else(|| DEFAULT_ARCHIVE_TEMPLATE.to_string()),
            keywords: def.keywords,
            components,
        }
    }

    /// Sum of all component points, rounded to two decimals.
    pub fn total_points(&self) -> f64 {
        round2(self.components.iter().map(|c| c.max_points).sum())
    }

    /// Names of the expected components, in grading order.
    pub fn component_names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name.clone()).collect()
    }

    /// Looks up a component by its canonical name.
    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Component name to prerequisite names.
    pub fn dependency_graph(&self) -> HashMap<String, Vec<String>> {
        self.components
            .iter()
            .map(|c| (c.name.clone(), c.depends_on.clone()))
            .collect()
    }
}

/// Immutable grader configuration shared by every pipeline.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// Directory holding the simulator launcher scripts.
    tools_dir:         PathBuf,
    /// Root of the per-assignment fixture directories.
    tests_dir:         PathBuf,
    /// Wall-clock limit for one simulator call.
    sim_timeout:       Duration,
    /// Simulator calls allowed in flight for one submission.
    workers:           usize,
    /// Submissions graded at once by the batch driver.
    batch_concurrency: usize,
    /// Resolved assignments keyed by number.
    assignments:       BTreeMap<u32, AssignmentSpec>,
}

#[bon]
impl GraderConfig {
    /// Builds a configuration from explicit values.
    #[builder]
    pub fn new(
        #[builder(into)] tools_dir: PathBuf,
        #[builder(into)] tests_dir: PathBuf,
        #[builder(default = DEFAULT_SIM_TIMEOUT)] sim_timeout: Duration,
        #[builder(default = default_workers())] workers: usize,
        #[builder(default = 4)] batch_concurrency: usize,
        #[builder(default = catalog::builtin())] assignments: Vec<AssignmentDef>,
    ) -> Self {
        let assignments = assignments
            .into_iter()
            .map(|def| {
                let spec = AssignmentSpec::resolve(def, &tools_dir, &tests_dir);
                (spec.number, spec)
            })
            .collect();

        Self {
            tools_dir,
            tests_dir,
            sim_timeout,
            workers: workers.max(1),
            batch_concurrency: batch_concurrency.max(1),
            assignments,
        }
    }
}

impl GraderConfig {
    /// Reads the configuration from `HDLGRADE_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let tools_dir = read_path("HDLGRADE_TOOLS_DIR", "tools/nand2tetris/tools");
        let tests_dir = read_path("HDLGRADE_TESTS_DIR", "grader_test_files");
        let assignments = match std::env::var("HDLGRADE_ASSIGNMENTS") {
            Ok(path) if !path.trim().is_empty() => load_catalog(Path::new(path.trim()))?,
            _ => catalog::builtin(),
        };

        Ok(Self::builder()
            .tools_dir(tools_dir)
            .tests_dir(tests_dir)
            .sim_timeout(read_timeout_secs("HDLGRADE_SIM_TIMEOUT_SECS", DEFAULT_SIM_TIMEOUT))
            .workers(read_usize("HDLGRADE_WORKERS").unwrap_or_else(default_workers))
            .batch_concurrency(read_usize("HDLGRADE_BATCH_CONCURRENCY").unwrap_or(4))
            .assignments(assignments)
            .build())
    }

    /// Returns the directory holding the simulator launchers.
    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    /// Returns the root of the fixture directories.
    pub fn tests_dir(&self) -> &Path {
        &self.tests_dir
    }

    /// Returns the per-call simulator timeout.
    pub fn sim_timeout(&self) -> Duration {
        self.sim_timeout
    }

    /// Returns how many simulator calls may run at once per submission.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns how many submissions the batch driver grades at once.
    pub fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
    }

    /// Returns the assignment with the given number.
    pub fn assignment(&self, number: u32) -> Result<&AssignmentSpec, ConfigError> {
        self.assignments
            .get(&number)
            .ok_or(ConfigError::UnknownAssignment(number))
    }

    /// Iterates over every configured assignment in number order.
    pub fn assignments(&self) -> impl Iterator<Item = &AssignmentSpec> {
        self.assignments.values()
    }

    /// Guesses the assignment from a free-form title, first by an explicit
    /// "homework N" style number, then by keyword.
    pub fn detect_assignment(&self, title: &str) -> Option<&AssignmentSpec> {
        let lower = title.to_lowercase();

        if let Some(spec) = ASSIGNMENT_NUMBER_RE
            .captures(&lower)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .and_then(|n| self.assignments.get(&n))
        {
            return Some(spec);
        }

        self.assignments
            .values()
            .find(|spec| spec.keywords.iter().any(|kw| lower.contains(kw.as_str())))
    }
}

/// Reads an assignment catalogue from a JSON file.
pub fn load_catalog(path: &Path) -> Result<Vec<AssignmentDef>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::CatalogRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::CatalogParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Number of worker slots when none is configured.
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Reads a path from the environment, or returns `default`.
fn read_path(env: &str, default: &str) -> PathBuf {
    std::env::var(env)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Reads a positive integer from the environment.
fn read_usize(env: &str) -> Option<usize> {
    std::env::var(env)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// Parses an environment variable into a `Duration`, falling back to
/// `default` when parsing fails or the variable is missing.
fn read_timeout_secs(env: &str, default: Duration) -> Duration {
    std::env::var(env)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GraderConfig {
        GraderConfig::builder()
            .tools_dir("/opt/tools")
            .tests_dir("/opt/tests")
            .build()
    }

    #[test]
    fn resolves_fixture_and_simulator_paths() {
        let cfg = config();
        let hw4 = cfg.assignment(4).expect("project 4");
        assert_eq!(hw4.simulator_path, PathBuf::from("/opt/tools/CPUEmulator.sh"));
        let mult = hw4.component("Mult").expect("Mult");
        assert_eq!(mult.test_script, PathBuf::from("/opt/tests/project04/Mult.tst"));
        assert_eq!(mult.compare_trace, PathBuf::from("/opt/tests/project04/Mult.cmp"));
    }

    #[test]
    fn total_points_are_rounded() {
        let cfg = config();
        assert_eq!(cfg.assignment(1).unwrap().total_points(), 10.0);
        assert_eq!(cfg.assignment(2).unwrap().total_points(), 10.0);
    }

    #[test]
    fn unknown_assignment_is_an_error() {
        assert!(matches!(config().assignment(42), Err(ConfigError::UnknownAssignment(42))));
    }

    #[test]
    fn detects_assignment_by_number_then_keyword() {
        let cfg = config();
        assert_eq!(cfg.detect_assignment("Homework #3 submission").map(|a| a.number), Some(3));
        assert_eq!(cfg.detect_assignment("HW 2").map(|a| a.number), Some(2));
        assert_eq!(cfg.detect_assignment("Machine language and assembly").map(|a| a.number), Some(4));
        assert_eq!(cfg.detect_assignment("Homework 9").map(|a| a.number), None);
        assert!(cfg.detect_assignment("unrelated").is_none());
    }

    #[test]
    fn workers_are_at_least_one() {
        let cfg = GraderConfig::builder()
            .tools_dir("t")
            .tests_dir("f")
            .workers(0)
            .build();
        assert_eq!(cfg.workers(), 1);
    }
}
