#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use walkdir::WalkDir;

use crate::{
    config::{ConfigError, GraderConfig},
    util::rar_extractor,
};

/// Checks that an assignment can be graded on this machine.
///
/// Returns one human readable line per problem found, each also logged as
/// a warning. An empty list means the environment looks usable.
pub fn check(config: &GraderConfig, assignment: u32) -> Result<Vec<String>, ConfigError> {
    tracing::info!("Checking grading environment for homework {assignment}...");
    let spec = config.assignment(assignment)?;
    let mut issues = Vec::new();

    if !spec.simulator_path.is_file() {
        issues.push(format!(
            "Simulator {} not found",
            spec.simulator_path.display()
        ));
    }

    if !spec.test_dir.is_dir() {
        issues.push(format!("Test directory {} not found", spec.test_dir.display()));
    } else {
        let scripts = WalkDir::new(&spec.test_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tst"))
            .count();
        if scripts == 0 {
            issues.push(format!(
                "Test directory {} has no .tst files",
                spec.test_dir.display()
            ));
        }

        for component in &spec.components {
            match std::fs::metadata(&component.test_script) {
                Ok(m) if m.len() == 0 => {
                    issues.push(format!("Test script for {} is empty", component.name))
                }
                Ok(_) => {}
                Err(_) => issues.push(format!(
                    "Missing test script {}",
                    component.test_script.display()
                )),
            }
        }
    }

    if rar_extractor().is_none() {
        issues.push("No .rar extractor (unrar, unar, bsdtar) on PATH".to_string());
    }

    for issue in &issues {
        tracing::warn!("{issue}");
    }
    Ok(issues)
}
