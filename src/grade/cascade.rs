#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::{HashMap, HashSet};

use super::results::ComponentResult;

/// Explains failures that are plausibly caused by a failing prerequisite.
///
/// For each failing component, in result order, lists its prerequisites that
/// failed in the same submission. The warnings are advisory and never change
/// a score.
pub fn cascade_warnings(
    results: &[ComponentResult],
    deps: &HashMap<String, Vec<String>>,
) -> Vec<String> {
    let failed: HashSet<&str> = results
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.name.as_str())
        .collect();

    results
        .iter()
        .filter(|c| !c.passed)
        .filter_map(|c| {
            let broken: Vec<&str> = deps
                .get(&c.name)?
                .iter()
                .map(String::as_str)
                .filter(|d| failed.contains(d))
                .collect();
            (!broken.is_empty())
                .then(|| format!("{} likely fails because {} also broken", c.name, broken.join(", ")))
        })
        .collect()
}
