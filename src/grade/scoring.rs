#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::Path;

use crate::util::round2;

/// Partial credit derived from a comparison trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialScore {
    /// Points earned, `max_points * passed / total` rounded to two decimals.
    pub points:     f64,
    /// Comparison lines that matched.
    pub passed:     usize,
    /// Comparison lines, header excluded.
    pub total:      usize,
    /// 1-based line of the first mismatch, 0 when every line matched.
    pub first_fail: usize,
    /// Expected text of the first mismatching line.
    pub expected:   String,
    /// Produced text of the first mismatching line.
    pub actual:     String,
}

/// Scores `<component>.out` in `sandbox` against `<component>.cmp`.
///
/// Line 0 of both files is a header. Every later line is one sub-test,
/// compared after trimming. A missing or unreadable trace, or a comparison
/// file without a single test line, scores zero across the board.
pub async fn partial_credit(sandbox: &Path, component: &str, max_points: f64) -> PartialScore {
    let read = |ext: &str| tokio::fs::read_to_string(sandbox.join(format!("{component}.{ext}")));
    let (Ok(cmp), Ok(out)) = tokio::join!(read("cmp"), read("out")) else {
        return PartialScore::default();
    };

    score_traces(&cmp, &out, max_points)
}

/// Compares an expected trace with a produced one, line by line.
pub fn score_traces(expected: &str, actual: &str, max_points: f64) -> PartialScore {
    let cmp: Vec<&str> = expected.lines().collect();
    let out: Vec<&str> = actual.lines().collect();
    if cmp.len() < 2 {
        return PartialScore::default();
    }

    let mut score = PartialScore {
        total: cmp.len() - 1,
        ..PartialScore::default()
    };

    for (i, want) in cmp.iter().enumerate().skip(1) {
        let want = want.trim();
        let got = out.get(i).map(|l| l.trim()).unwrap_or("");
        if want == got {
            score.passed += 1;
        } else if score.first_fail == 0 {
            score.first_fail = i;
            score.expected = want.to_string();
            score.actual = got.to_string();
        }
    }

    score.points = round2(max_points * score.passed as f64 / score.total as f64);
    score
}
