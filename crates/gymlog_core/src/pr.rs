//! crates/gymlog_core/src/pr.rs
//!
//! Pure decision logic for personal-record detection and the fallback rules
//! used when a set is recorded without explicit values. Kept free of any I/O
//! so the precedence rules can be tested in isolation.

use crate::domain::SetPerformance;

/// Decides whether a candidate `(weight, reps)` beats every prior completed
/// set for the exercise.
///
/// An empty history is trivially a PR (first time performing the exercise).
/// Otherwise the two maxima are computed independently over the history —
/// max weight and max reps, not the reps of the heaviest set — and the
/// candidate wins on strictly greater weight, or on equal weight with
/// strictly greater reps. Missing values compare as zero.
pub fn is_personal_record(weight: f64, reps: i32, history: &[SetPerformance]) -> bool {
    if history.is_empty() {
        return true;
    }

    let max_weight = history
        .iter()
        .map(|s| s.weight.unwrap_or(0.0))
        .fold(0.0_f64, f64::max);
    let max_reps = history
        .iter()
        .map(|s| s.reps.unwrap_or(0))
        .max()
        .unwrap_or(0);

    if weight > max_weight {
        true
    } else {
        weight == max_weight && reps > max_reps
    }
}

/// Three-tier weight fallback: the explicit value if the client sent one,
/// else the planned target, else zero.
pub fn resolve_weight(actual: Option<f64>, target: Option<f64>) -> f64 {
    actual.or(target).unwrap_or(0.0)
}

/// Rep fallback: the explicit value if the client sent one, else the top of
/// the planned rep range.
pub fn resolve_reps(actual: Option<i32>, target_reps_max: i32) -> i32 {
    actual.unwrap_or(target_reps_max)
}

/// The sparse sort key for a freshly seeded set: exercises are spaced 100
/// apart so extra sets can be slotted in later without renumbering.
pub fn seed_order(template_position: i32, set_index: i32) -> i32 {
    template_position * 100 + set_index
}
