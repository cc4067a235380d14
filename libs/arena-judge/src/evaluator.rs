/// Verdict Evaluator - Language-Agnostic Comparison Logic
///
/// **Core Responsibility:**
/// Compare raw program output against the expected output of a problem.
///
/// **Critical Properties:**
/// - Knows nothing about execution backends
/// - Knows nothing about sessions or notifications
/// - Pure function: (actual output, expected output) → Pass | Fail
///
/// **Comparison Rules:**
/// - Both sides are normalized independently (see `normalize`)
/// - Canonical texts must be exactly equal
/// - No numeric tolerance, no reordering
use crate::normalize::normalize_output;
use arena_common::types::Verdict;

/// Both canonical forms of a comparison, kept for mismatch reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub actual: String,
    pub expected: String,
}

impl Comparison {
    pub fn new(actual_raw: &str, expected_raw: &str) -> Self {
        Self {
            actual: normalize_output(actual_raw),
            expected: normalize_output(expected_raw),
        }
    }

    pub fn matches(&self) -> bool {
        self.actual == self.expected
    }

    pub fn verdict(&self) -> Verdict {
        if self.matches() {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

/// Evaluate actual output against expected output.
///
/// Only ever returns `Verdict::Pass` or `Verdict::Fail`.
pub fn evaluate(actual_raw: &str, expected_raw: &str) -> Verdict {
    Comparison::new(actual_raw, expected_raw).verdict()
}
