#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use super::{
    archive::FoundFiles,
    normalize::normalize_name,
    results::{FileMatch, MatchKind},
};
use crate::constants::FUZZY_MIN_RATIO;

/// What the matcher resolved for one submission.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Expected component name to the submitted file it resolved to.
    pub matched: HashMap<String, PathBuf>,
    /// One entry per expected component, grouped by the pass that resolved
    /// it, unresolved names last.
    pub matches: Vec<FileMatch>,
    /// Submitted files no component claimed, with extension.
    pub extra:   Vec<String>,
}

/// Bookkeeping shared by the matching passes.
struct Matching<'a> {
    /// Submitted base names to paths.
    found:    &'a FoundFiles,
    /// Source extension, including the dot.
    file_ext: &'a str,
    /// Found names already consumed by a pass.
    used:     HashSet<&'a str>,
    /// The outcome under construction.
    outcome:  MatchOutcome,
}

impl<'a> Matching<'a> {
    /// Expected names not resolved by any earlier pass, in expected order.
    fn remaining<'e>(&self, expected: &'e [String]) -> Vec<&'e String> {
        expected
            .iter()
            .filter(|e| !self.outcome.matched.contains_key(e.as_str()))
            .collect()
    }

    /// Records that `expected` resolved to the found file `orig`.
    fn accept(&mut self, expected: &str, orig: &'a str, path: &Path, kind: MatchKind) {
        let ext = self.file_ext;
        let issue = match kind {
            MatchKind::Exact => String::new(),
            MatchKind::CaseFix => format!("Named '{orig}{ext}' instead of '{expected}{ext}'"),
            MatchKind::Fuzzy => format!("Named '{orig}{ext}' -- assumed to be '{expected}{ext}'"),
            MatchKind::NotFound => format!("'{expected}{ext}' not found in submission"),
        };

        self.used.insert(orig);
        self.outcome
            .matched
            .insert(expected.to_string(), path.to_path_buf());
        self.outcome.matches.push(FileMatch::new(
            expected,
            format!("{orig}{ext}"),
            kind,
            issue,
        ));
    }

    /// Pass 1: the found name equals the expected name.
    fn exact(&mut self, expected: &[String]) {
        for exp in self.remaining(expected) {
            if let Some((orig, path)) = self.found.get_key_value(exp)
                && !self.used.contains(orig)
            {
                self.accept(exp, orig, path, MatchKind::Exact);
            }
        }
    }

    /// Pass 2: the found name equals the expected name ignoring case.
    fn case_insensitive(&mut self, expected: &[String]) {
        let mut by_lower: HashMap<String, (&'a str, &'a Path)> = HashMap::new();
        for (name, path) in self.found.iter() {
            if !self.used.contains(name) {
                by_lower.insert(name.to_lowercase(), (name, path));
            }
        }

        for exp in self.remaining(expected) {
            if let Some(&(orig, path)) = by_lower.get(&exp.to_lowercase())
                && !self.used.contains(orig)
            {
                self.accept(exp, orig, path, MatchKind::CaseFix);
            }
        }
    }

    /// Pass 3: both names normalize to the same string.
    fn normalized(&mut self, expected: &[String]) {
        let by_norm: HashMap<String, (&'a str, &'a Path)> = self
            .found
            .iter()
            .map(|(name, path)| (normalize_name(name), (name, path)))
            .collect();

        for exp in self.remaining(expected) {
            if let Some(&(orig, path)) = by_norm.get(&normalize_name(exp))
                && !self.used.contains(orig)
            {
                self.accept(exp, orig, path, MatchKind::Fuzzy);
            }
        }
    }

    /// Pass 4: one name contains the other; the candidate with the best
    /// length ratio wins if the ratio clears [`FUZZY_MIN_RATIO`].
    fn substring(&mut self, expected: &[String]) {
        for exp in self.remaining(expected) {
            let exp_lower = exp.to_lowercase();
            let exp_len = exp_lower.chars().count() as f64;

            let mut best: Option<(&'a str, &'a Path)> = None;
            let mut best_score = 0.0;
            for (name, path) in self.found.iter() {
                if self.used.contains(name) {
                    continue;
                }
                let lower = name.to_lowercase();
                if exp_lower.contains(&lower) || lower.contains(&exp_lower) {
                    let score = exp_len / lower.chars().count().max(1) as f64;
                    if score > best_score {
                        best_score = score;
                        best = Some((name, path));
                    }
                }
            }

            if let Some((orig, path)) = best
                && best_score > FUZZY_MIN_RATIO
            {
                self.accept(exp, orig, path, MatchKind::Fuzzy);
            }
        }
    }
}

/// Resolves each expected component name to at most one submitted file.
///
/// Passes run in a fixed order (exact, case-insensitive, normalized, fuzzy
/// substring) and a file consumed by one pass is never offered again.
pub fn match_files(found: &FoundFiles, expected: &[String], file_ext: &str) -> MatchOutcome {
    let mut state = Matching {
        found,
        file_ext,
        used: HashSet::new(),
        outcome: MatchOutcome::default(),
    };

    state.exact(expected);
    state.case_insensitive(expected);
    state.normalized(expected);
    state.substring(expected);

    for exp in state.remaining(expected) {
        state.outcome.matches.push(FileMatch::new(
            exp.as_str(),
            "",
            MatchKind::NotFound,
            format!("'{exp}{file_ext}' not found in submission"),
        ));
    }

    state.outcome.extra = found
        .iter()
        .filter(|(name, _)| !state.used.contains(name))
        .map(|(name, _)| format!("{name}{file_ext}"))
        .collect();

    state.outcome
}
