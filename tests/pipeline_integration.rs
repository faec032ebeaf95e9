#![cfg(unix)]

use std::{
    fs::File,
    io::Write,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use hdlgrade::{
    GraderConfig, GradingPipeline, Submission,
    config::{AssignmentDef, ComponentDef, Simulator},
    grade::{MatchKind, Outcome},
};
use tempfile::TempDir;
use zip::{ZipWriter, write::SimpleFileOptions};

/// Stand-in for the course simulator. What it does for a component is
/// chosen by the `<name>.mode` fixture copied into the sandbox next to the
/// test script.
const FAKE_SIMULATOR: &str = r#"#!/bin/sh
base=$(basename "$1" .tst)
case "$(cat "$base.mode" 2>/dev/null)" in
  pass) echo "End of script - Comparison ended successfully" ;;
  mismatch)
    cp "$base.fake" "$base.out"
    echo "Comparison failure at line 2" >&2
    ;;
  syntax)
    echo "In HDL file $base.hdl, Line 6, Nand: the specified part is missing" >&2
    echo "  at Hack.Simulator.load" >&2
    ;;
  sleep) exec sleep 30 ;;
  spawn)
    ticks=$(cat "$base.ticks")
    (while :; do echo x >> "$ticks"; sleep 0.05; done) &
    sleep 30
    ;;
esac
"#;

const PASS_CMP: &str = "|  in   |  out  |\n|   0   |   1   |\n|   1   |   0   |\n";

const NOT_HDL: &str = "CHIP Not {\n    IN in;\n    OUT out;\n\n    PARTS:\n    Nand(a=in, b=in, \
                       out=out);\n}\n";
const AND_HDL: &str = "CHIP And {\n    IN a, b;\n    OUT out;\n\n    PARTS:\n    Nand(a=a, b=b, \
                       out=x);\n    Not(in=x, out=out);\n}\n";
const EMPTY_AND_HDL: &str =
    "CHIP And {\n    IN a, b;\n    OUT out;\n\n    PARTS:\n    // Put your code here:\n}\n";
const BUILTIN_NOT_HDL: &str = "CHIP Not {\n    IN in;\n    OUT out;\n\n    BUILTIN Not;\n}\n";

fn gates() -> AssignmentDef {
    AssignmentDef {
        number:           1,
        title:            "Gates".into(),
        simulator:        Simulator::HardwareSimulator,
        file_ext:         ".hdl".into(),
        test_dir:         "project01".into(),
        archive_template: Some("HW1_Gates_{first}_{last}".into()),
        keywords:         vec!["gates".into()],
        components:       vec![
            ComponentDef {
                name:       "Not".into(),
                points:     1.0,
                depends_on: vec![],
                hint:       None,
            },
            ComponentDef {
                name:       "And".into(),
                points:     1.0,
                depends_on: vec!["Not".into()],
                hint:       Some("And = Not(Nand(a, b)).".into()),
            },
        ],
    }
}

struct Harness {
    root:    TempDir,
    timeout: Duration,
}

impl Harness {
    fn new() -> Self {
        Self::with_timeout(Duration::from_secs(20))
    }

    fn with_timeout(timeout: Duration) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(root.path().join("tools")).expect("tools dir");
        std::fs::create_dir_all(root.path().join("tests/project01")).expect("tests dir");

        let sim = root.path().join("tools/HardwareSimulator.sh");
        std::fs::write(&sim, FAKE_SIMULATOR).expect("write simulator");
        std::fs::set_permissions(&sim, std::fs::Permissions::from_mode(0o755))
            .expect("chmod simulator");

        Self { root, timeout }
    }

    fn test_dir(&self) -> PathBuf {
        self.root.path().join("tests/project01")
    }

    /// Installs test fixtures for one component.
    fn fixture(&self, name: &str, mode: &str, cmp: &str, fake_out: Option<&str>) {
        let dir = self.test_dir();
        std::fs::write(dir.join(format!("{name}.tst")), format!("load {name}.hdl;\n"))
            .expect("write tst");
        std::fs::write(dir.join(format!("{name}.cmp")), cmp).expect("write cmp");
        std::fs::write(dir.join(format!("{name}.mode")), mode).expect("write mode");
        if let Some(out) = fake_out {
            std::fs::write(dir.join(format!("{name}.fake")), out).expect("write fake out");
        }
    }

    fn pipeline(&self) -> GradingPipeline {
        let config = GraderConfig::builder()
            .tools_dir(self.root.path().join("tools"))
            .tests_dir(self.root.path().join("tests"))
            .sim_timeout(self.timeout)
            .workers(2)
            .batch_concurrency(2)
            .assignments(vec![gates()])
            .build();
        GradingPipeline::new(Arc::new(config), 1).expect("gates assignment")
    }

    fn archive(&self, file_name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = self.root.path().join(file_name);
        write_zip(&path, files);
        path
    }
}

fn write_zip(path: &Path, files: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).expect("create zip"));
    for (name, body) in files {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start file");
        zip.write_all(body.as_bytes()).expect("write file");
    }
    zip.finish().expect("finish zip");
}

fn submission(archive: PathBuf, student: &str) -> Submission {
    Submission::builder()
        .archive_path(archive)
        .student_name(student)
        .student_id(42)
        .build()
}

#[tokio::test]
async fn correct_submission_earns_full_marks() {
    let h = Harness::new();
    h.fixture("Not", "pass", PASS_CMP, None);
    h.fixture("And", "pass", PASS_CMP, None);
    let archive = h.archive(
        "HW1_Gates_Ada_Lovelace.zip",
        &[("gates/Not.hdl", NOT_HDL), ("gates/And.hdl", AND_HDL)],
    );

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;

    assert_eq!(result.total_earned, 2.0);
    assert_eq!(result.total_possible, 2.0);
    assert_eq!(result.percentage(), 100.0);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert!(result.archive_naming.is_correct);
    assert_eq!(result.student_id, 42);
    for c in &result.components {
        assert_eq!(c.outcome, Outcome::Pass, "{}: {}", c.name, c.message);
        assert!(c.passed);
        assert_eq!(c.total_tests, 2);
        assert_eq!(c.passed_tests, 2);
    }
}

#[tokio::test]
async fn mismatch_scores_partial_credit_and_blames_prerequisite() {
    let h = Harness::new();
    let cmp = "| in | out |\n| 0 | 1 |\n| 1 | 0 |\n| 0 | 1 |\n| 1 | 0 |\n";
    let out = "| in | out |\n| 0 | 1 |\n| 1 | 1 |\n| 0 | 1 |\n| 1 | 0 |\n";
    h.fixture("Not", "mismatch", cmp, Some(out));
    h.fixture("And", "mismatch", cmp, Some(out));
    let archive = h.archive(
        "HW1_Gates_Ada_Lovelace.zip",
        &[("Not.hdl", NOT_HDL), ("And.hdl", AND_HDL)],
    );

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;

    let not = &result.components[0];
    assert_eq!(not.name, "Not");
    assert_eq!(not.outcome, Outcome::Mismatch);
    assert_eq!(not.points, 0.75);
    assert_eq!(not.message, "3/4 tests passed (first fail line 2)");
    assert_eq!(not.expected, "| 1 | 0 |");
    assert_eq!(not.actual, "| 1 | 1 |");
    assert_eq!(result.total_earned, 1.5);
    assert_eq!(result.warnings, vec!["And likely fails because Not also broken"]);
}

#[tokio::test]
async fn syntax_errors_earn_effort_credit_only_with_work() {
    let h = Harness::new();
    h.fixture("Not", "syntax", PASS_CMP, None);
    h.fixture("And", "syntax", PASS_CMP, None);
    let archive = h.archive(
        "HW1_Gates_Ada_Lovelace.zip",
        &[("Not.hdl", NOT_HDL), ("And.hdl", EMPTY_AND_HDL)],
    );

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;

    let (not, and) = (&result.components[0], &result.components[1]);
    assert_eq!(not.outcome, Outcome::Syntax);
    assert_eq!(not.points, 0.15);
    assert_eq!(
        not.message,
        "Syntax error (effort credit): In HDL file Not.hdl, Line 6, Nand: the specified part is \
         missing"
    );
    assert_eq!(and.outcome, Outcome::Syntax);
    assert_eq!(and.points, 0.0);
    assert_eq!(result.total_earned, 0.15);
}

#[tokio::test]
async fn runaway_simulation_times_out_with_effort_credit() {
    let h = Harness::with_timeout(Duration::from_millis(500));
    h.fixture("Not", "sleep", PASS_CMP, None);
    h.fixture("And", "pass", PASS_CMP, None);
    let archive = h.archive(
        "HW1_Gates_Ada_Lovelace.zip",
        &[("Not.hdl", NOT_HDL), ("And.hdl", AND_HDL)],
    );

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;

    let not = &result.components[0];
    assert_eq!(not.outcome, Outcome::Timeout);
    assert_eq!(not.message, "Timed out (possible loop)");
    assert_eq!(not.points, 0.1);
    assert_eq!(result.components[1].outcome, Outcome::Pass);
    assert_eq!(result.total_earned, 1.1);
}

#[tokio::test]
async fn timeout_also_stops_processes_the_simulator_started() {
    let h = Harness::with_timeout(Duration::from_millis(500));
    h.fixture("Not", "spawn", PASS_CMP, None);
    h.fixture("And", "pass", PASS_CMP, None);
    let ticks = h.root.path().join("ticks.log");
    std::fs::write(h.test_dir().join("Not.ticks"), ticks.to_string_lossy().as_bytes())
        .expect("write ticks fixture");
    let archive = h.archive(
        "HW1_Gates_Ada_Lovelace.zip",
        &[("Not.hdl", NOT_HDL), ("And.hdl", AND_HDL)],
    );

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;
    assert_eq!(result.components[0].outcome, Outcome::Timeout);

    let size = || std::fs::metadata(&ticks).map(|m| m.len()).unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(300)).await;
    let settled = size();
    assert!(settled > 0, "background loop never started");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(size(), settled, "background loop outlived the timeout");
}

#[tokio::test]
async fn builtin_chip_is_rejected_without_simulating() {
    let h = Harness::new();
    h.fixture("Not", "pass", PASS_CMP, None);
    h.fixture("And", "pass", PASS_CMP, None);
    let archive = h.archive(
        "HW1_Gates_Ada_Lovelace.zip",
        &[("Not.hdl", BUILTIN_NOT_HDL), ("And.hdl", AND_HDL)],
    );

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;

    let not = &result.components[0];
    assert_eq!(not.outcome, Outcome::Builtin);
    assert_eq!(not.points, 0.0);
    assert_eq!(not.message, "Uses BUILTIN (not allowed)");
}

#[tokio::test]
async fn misnamed_files_are_graded_and_flagged() {
    let h = Harness::new();
    h.fixture("Not", "pass", PASS_CMP, None);
    h.fixture("And", "pass", PASS_CMP, None);
    let archive = h.archive(
        "my_homework.zip",
        &[("not.hdl", NOT_HDL), ("and_v2.hdl", AND_HDL), ("Scratch.hdl", "")],
    );

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;

    assert_eq!(result.total_earned, 2.0);
    let kinds: Vec<MatchKind> = result.file_matches.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![MatchKind::CaseFix, MatchKind::Fuzzy]);
    assert_eq!(
        result.warnings,
        vec![
            "Naming: Named 'not.hdl' instead of 'Not.hdl'",
            "Naming: Named 'and_v2.hdl' -- assumed to be 'And.hdl'",
        ]
    );
    assert_eq!(result.extra_files, vec!["Scratch.hdl"]);
    assert!(!result.archive_naming.is_correct);
    assert!(result.archive_naming.issue.contains("missing homework number"));
    assert!(result.has_naming_issues());
}

#[tokio::test]
async fn unsubmitted_component_is_missing() {
    let h = Harness::new();
    h.fixture("Not", "pass", PASS_CMP, None);
    h.fixture("And", "pass", PASS_CMP, None);
    let archive = h.archive("HW1_Gates_Ada_Lovelace.zip", &[("Not.hdl", NOT_HDL)]);

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;

    let and = &result.components[1];
    assert_eq!(and.outcome, Outcome::Missing);
    assert_eq!(and.message, "Not submitted");
    assert_eq!(result.file_matches[1].kind, MatchKind::NotFound);
    assert_eq!(result.file_matches[1].issue, "'And.hdl' not found in submission");
    assert_eq!(result.total_earned, 1.0);
}

#[tokio::test]
async fn archive_without_sources_grades_as_nothing_submitted() {
    let h = Harness::new();
    h.fixture("Not", "pass", PASS_CMP, None);
    h.fixture("And", "pass", PASS_CMP, None);
    let archive = h.archive("HW1_Gates_Ada_Lovelace.zip", &[("README.txt", "oops")]);

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;

    assert_eq!(result.total_earned, 0.0);
    assert_eq!(result.warnings, vec!["No .hdl files found in zip"]);
    assert!(result.components.iter().all(|c| c.outcome == Outcome::Missing));
}

#[tokio::test]
async fn absent_test_script_is_an_internal_error() {
    let h = Harness::new();
    h.fixture("And", "pass", PASS_CMP, None);
    let archive = h.archive(
        "HW1_Gates_Ada_Lovelace.zip",
        &[("Not.hdl", NOT_HDL), ("And.hdl", AND_HDL)],
    );

    let result = h.pipeline().grade(&submission(archive, "Ada Lovelace")).await;

    let not = &result.components[0];
    assert_eq!(not.outcome, Outcome::Internal);
    assert_eq!(not.message, "Not.tst not found");
    assert_eq!(result.components[1].outcome, Outcome::Pass);
}

#[tokio::test]
async fn batch_results_follow_input_order() {
    let h = Harness::new();
    h.fixture("Not", "pass", PASS_CMP, None);
    h.fixture("And", "pass", PASS_CMP, None);
    let full = h.archive("full.zip", &[("Not.hdl", NOT_HDL), ("And.hdl", AND_HDL)]);
    let half = h.archive("half.zip", &[("Not.hdl", NOT_HDL)]);
    let none = h.archive("none.zip", &[("notes.txt", "")]);

    let submissions = vec![
        submission(half, "Grace Hopper"),
        submission(full, "Ada Lovelace"),
        submission(none, "Alan Turing"),
    ];
    let results = h.pipeline().grade_batch(&submissions).await;

    let summary: Vec<(&str, f64)> = results
        .iter()
        .map(|r| (r.student_name.as_str(), r.total_earned))
        .collect();
    assert_eq!(
        summary,
        vec![("Grace Hopper", 1.0), ("Ada Lovelace", 2.0), ("Alan Turing", 0.0)]
    );
    let mut ids: Vec<_> = results.iter().map(|r| r.run_id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}
