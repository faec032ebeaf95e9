#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::KNOWN_SOURCE_EXTENSIONS;

/// `Not (1)` style counters added by browsers on repeated downloads.
static DOWNLOAD_COUNTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)\s*").expect("valid counter regex"));

/// `Not copy 2` style suffixes added by file managers.
static COPY_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*copy\s*\d*").expect("valid copy regex"));

/// Whitespace, underscore and hyphen separators.
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_\-]+").expect("valid separator regex"));

/// Canonical form of a file or component name for loose comparison.
///
/// Duplicate-download counters and "copy" suffixes are removed, separators
/// are dropped, a known source extension is stripped and the result is
/// lower-cased.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    let name = DOWNLOAD_COUNTER_RE.replace_all(name, "");
    let name = COPY_SUFFIX_RE.replace_all(&name, "");
    let mut name = SEPARATOR_RE.replace_all(&name, "").into_owned();

    for ext in KNOWN_SOURCE_EXTENSIONS {
        let cut = name.len().saturating_sub(ext.len());
        if name
            .get(cut..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(ext))
        {
            name.truncate(cut);
        }
    }

    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::normalize_name;

    #[test]
    fn strips_download_artifacts() {
        assert_eq!(normalize_name("Mux (1)"), "mux");
        assert_eq!(normalize_name("  Mux copy 2 "), "mux");
        assert_eq!(normalize_name("Mux Copy"), "mux");
    }

    #[test]
    fn drops_separators_and_case() {
        assert_eq!(normalize_name("Mux_4-Way 16"), "mux4way16");
        assert_eq!(normalize_name("ALU-nostat"), "alunostat");
    }

    #[test]
    fn strips_known_extensions_only() {
        assert_eq!(normalize_name("Not.HDL"), "not");
        assert_eq!(normalize_name("Mult.asm"), "mult");
        assert_eq!(normalize_name("Mult.txt"), "mult.txt");
    }

    #[test]
    fn is_idempotent() {
        for raw in ["DMux8Way (3)", "half_adder copy", "Or8Way.hdl"] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once);
        }
    }
}
