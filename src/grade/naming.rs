#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use regex::Regex;

use super::results::ArchiveNaming;
use crate::config::AssignmentSpec;

/// Archive extensions stripped before comparing names.
const ARCHIVE_EXTENSIONS: [&str; 2] = [".zip", ".rar"];

/// Splits a display name into the first/last tokens used in archive names.
fn name_tokens(student_name: &str) -> (String, String) {
    let parts: Vec<&str> = student_name.split_whitespace().collect();
    match parts.as_slice() {
        [] => ("Unknown".to_string(), "Student".to_string()),
        [only] => (only.to_string(), only.to_string()),
        [first, .., last] => (first.to_string(), last.to_string()),
    }
}

/// Removes one trailing archive extension, ignoring case.
fn strip_archive_extension(filename: &str) -> &str {
    for ext in ARCHIVE_EXTENSIONS {
        let cut = filename.len().saturating_sub(ext.len());
        if filename
            .get(cut..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(ext))
        {
            return &filename[..cut];
        }
    }
    filename
}

/// The archive name (without extension) a student is expected to submit.
pub fn expected_archive_stem(student_name: &str, assignment: &AssignmentSpec) -> String {
    let (first, last) = name_tokens(student_name);
    assignment
        .archive_template
        .replace("{n}", &assignment.number.to_string())
        .replace("{first}", &first)
        .replace("{last}", &last)
}

/// Checks a submitted archive's file name against the assignment's naming
/// convention. The result is advisory and never changes the score.
pub fn check_archive_naming(
    filename: &str,
    student_name: &str,
    assignment: &AssignmentSpec,
) -> ArchiveNaming {
    let expected = expected_archive_stem(student_name, assignment);
    let expected_pattern = format!("{expected}.zip");

    if filename.is_empty() {
        return ArchiveNaming {
            original_filename: String::new(),
            is_correct: false,
            expected_pattern,
            issue: "No filename available".to_string(),
        };
    }

    let stem = strip_archive_extension(filename);
    if stem == expected {
        return ArchiveNaming {
            original_filename: filename.to_string(),
            is_correct: true,
            expected_pattern,
            issue: String::new(),
        };
    }

    let number_present = Regex::new(&format!(r"(?i)(?:hw|homework)\s*{}", assignment.number))
        .map(|re| re.is_match(stem))
        .unwrap_or(false);

    let (first, last) = name_tokens(student_name);
    let lower = stem.to_lowercase();
    let name_present =
        lower.contains(&first.to_lowercase()) || lower.contains(&last.to_lowercase());

    let mut missing = Vec::new();
    if !number_present {
        missing.push("missing homework number");
    }
    if !name_present {
        missing.push("missing your name");
    }

    let issue = if missing.is_empty() {
        format!("Zip named '{filename}' -- should be '{expected_pattern}'")
    } else {
        format!(
            "Zip named '{filename}' -- should be '{expected_pattern}' ({})",
            missing.join(", ")
        )
    };

    ArchiveNaming {
        original_filename: filename.to_string(),
        is_correct: false,
        expected_pattern,
        issue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraderConfig;

    fn hw1() -> AssignmentSpec {
        GraderConfig::builder()
            .tools_dir("tools")
            .tests_dir("tests")
            .build()
            .assignment(1)
            .expect("project 1")
            .clone()
    }

    #[test]
    fn canonical_name_is_correct() {
        let naming = check_archive_naming("HW1_Gates_Ada_Lovelace.zip", "Ada Lovelace", &hw1());
        assert!(naming.is_correct);
        assert_eq!(naming.expected_pattern, "HW1_Gates_Ada_Lovelace.zip");
        assert!(naming.issue.is_empty());
    }

    #[test]
    fn middle_names_are_ignored() {
        let naming =
            check_archive_naming("HW1_Gates_Ada_Lovelace.zip", "Ada King Lovelace", &hw1());
        assert!(naming.is_correct);
    }

    #[test]
    fn reports_both_missing_signals() {
        let naming = check_archive_naming("submission.zip", "Ada Lovelace", &hw1());
        assert!(!naming.is_correct);
        assert!(naming.issue.contains("missing homework number"));
        assert!(naming.issue.contains("missing your name"));
        assert!(naming.issue.contains("HW1_Gates_Ada_Lovelace.zip"));
    }

    #[test]
    fn wrong_case_mentions_expected_name_only() {
        let naming = check_archive_naming("hw1_gates_ada_lovelace.zip", "Ada Lovelace", &hw1());
        assert!(!naming.is_correct);
        assert_eq!(
            naming.issue,
            "Zip named 'hw1_gates_ada_lovelace.zip' -- should be 'HW1_Gates_Ada_Lovelace.zip'"
        );
    }

    #[test]
    fn homework_spelled_out_counts_as_number() {
        let naming = check_archive_naming("Homework 1 lovelace.zip", "Ada Lovelace", &hw1());
        assert!(!naming.issue.contains("missing"));
    }

    #[test]
    fn single_token_name_fills_both_slots() {
        let naming = check_archive_naming("HW1_Gates_Plato_Plato.zip", "Plato", &hw1());
        assert!(naming.is_correct);
    }

    #[test]
    fn absent_name_uses_placeholder() {
        assert_eq!(expected_archive_stem("  ", &hw1()), "HW1_Gates_Unknown_Student");
    }

    #[test]
    fn empty_filename_is_reported() {
        let naming = check_archive_naming("", "Ada Lovelace", &hw1());
        assert!(!naming.is_correct);
        assert_eq!(naming.issue, "No filename available");
    }
}
