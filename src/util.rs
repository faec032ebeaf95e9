#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use which::which;

use crate::constants::RAR_EXTRACTORS;

/// Rounds to two decimal places, the precision every score is reported at.
///
/// Rounds the exact binary value with ties to even, so `0.585` (stored just
/// below) becomes `0.58` and `0.125` becomes `0.12`.
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

/// Rounds through fixed-precision formatting, which works on the exact
/// binary value instead of a rescaled copy.
fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}

/// Formats a score the way reports print it: whole numbers keep one
/// decimal (`10.0`), everything else prints as is (`0.65`).
pub fn fmt_points(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Cuts `text` to at most `limit` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Finds the first `.rar` extractor available on `PATH`, returning its name
/// and location.
pub fn rar_extractor() -> Option<(&'static str, PathBuf)> {
    RAR_EXTRACTORS
        .iter()
        .find_map(|name| which(name).ok().map(|path| (*name, path)))
}

/// Finds fixture files in `dir` whose name starts with `prefix`.
///
/// * `prefix`: the component name, e.g. `Mux` also finds `Mux16.tst`
/// * `dir`: the assignment's test directory
pub fn files_with_prefix(prefix: &str, dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join(format!("{}*", glob::Pattern::escape(prefix)));
    let pattern = pattern
        .to_str()
        .context("Could not convert fixture directory to string")?
        .to_string();

    Ok(glob(&pattern)
        .context("Could not create glob")?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_like_reported_scores() {
        assert_eq!(round2(0.80 * 3.0 / 4.0), 0.6);
        assert_eq!(round2(3.0 * 0.15), 0.45);
        assert_eq!(round2(5.0 * 0.1), 0.5);
        assert_eq!(round1(66.666), 66.7);
    }

    #[test]
    fn rounding_works_on_the_stored_value() {
        assert_eq!(round2(0.65 * 45.0 / 50.0), 0.58);
        assert_eq!(round2(0.65 * 5.0 / 26.0), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round1(0.25), 0.2);
    }

    #[test]
    fn points_print_with_at_least_one_decimal() {
        assert_eq!(fmt_points(10.0), "10.0");
        assert_eq!(fmt_points(0.65), "0.65");
        assert_eq!(fmt_points(0.0), "0.0");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("äöü-abc", 3), "äöü");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn prefix_glob_finds_sibling_fixtures() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["Mux.tst", "Mux.cmp", "Mux16.tst", "DMux.tst"] {
            std::fs::write(dir.path().join(name), "").expect("write fixture");
        }
        let mut found: Vec<String> = files_with_prefix("Mux", dir.path())
            .expect("glob")
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        found.sort();
        assert_eq!(found, vec!["Mux.cmp", "Mux.tst", "Mux16.tst"]);
    }
}
