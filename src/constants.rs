#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

/// Phrase the simulators print when every comparison line matched.
pub const SUCCESS_MARKER: &str = "Comparison ended successfully";

/// Pattern the simulators print when a comparison line diverged.
/// * group 1: the 1-based line of the comparison file that failed
pub const FAILURE_MARKER_PATTERN: &str = r"[Cc]omparison failure at line (\d+)";

/// Reserved HDL token that delegates a chip to the simulator's own
/// implementation.
pub const BUILTIN_PATTERN: &str = r"(?i)\bBUILTIN\b";

/// A fuzzy substring match is only accepted above this length ratio.
pub const FUZZY_MIN_RATIO: f64 = 0.4;

/// Fraction of a component's points awarded for a syntax error when the
/// source shows a real attempt.
pub const SYNTAX_EFFORT_CREDIT: f64 = 0.15;

/// Fraction of a component's points awarded for a timeout when the source
/// shows a real attempt.
pub const TIMEOUT_EFFORT_CREDIT: f64 = 0.10;

/// Wall-clock limit for a single simulator invocation.
pub const DEFAULT_SIM_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum length of an `internal` diagnostic message.
pub const INTERNAL_MESSAGE_LIMIT: usize = 150;

/// Maximum length of a cleaned simulator error.
pub const SYNTAX_MESSAGE_LIMIT: usize = 200;

/// Number of simulator error lines kept after cleaning.
pub const SYNTAX_MESSAGE_LINES: usize = 3;

/// Prefix for per-submission extraction directories.
pub const EXTRACT_DIR_PREFIX: &str = "n2t_";

/// Source extensions the name normalizer knows how to strip.
pub const KNOWN_SOURCE_EXTENSIONS: [&str; 2] = [".hdl", ".asm"];

/// External programs able to unpack `.rar` archives, in order of preference.
pub const RAR_EXTRACTORS: [&str; 3] = ["unrar", "unar", "bsdtar"];

/// Default archive-name template when an assignment does not define one.
pub const DEFAULT_ARCHIVE_TEMPLATE: &str = "HW{n}_{first}_{last}";

/// Sign-off line of the template feedback.
pub const FEEDBACK_SIGN_OFF: &str = "-- Your Teaching Team";
