//! Config ↔ display value transform.
//!
//! The game shows the player values derived from what is stored in a level
//! file. Both directions are discontinuous (at `moveCount == 10/11` and at
//! `targetCount == 9/10`); the thresholds are part of the data contract and
//! must not be smoothed out, since already-written level files depend on them.

use serde::{Deserialize, Serialize};

use crate::numbers::{ceil_f64_to_i64, i64_to_f64};

/// Offset subtracted from the stored move budget when it is above the floor.
pub const STEP_OFFSET: i64 = 10;
/// Offset added to stored target counts of ten or more.
pub const TARGET_OFFSET_HIGH: i64 = 10;
/// Offset added to stored target counts below ten.
pub const TARGET_OFFSET_LOW: i64 = 30;
/// Stored target counts at or above this use the high offset.
pub const TARGET_THRESHOLD: i64 = 10;
/// Display targets at or above this are inverted with the high offset.
pub const INVERSE_TARGET_THRESHOLD: i64 = 40;

/// Player-visible `(steps, target)` pair derived from a level's config values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayPair {
    pub steps: i64,
    pub target: i64,
}

impl DisplayPair {
    #[must_use]
    pub const fn new(steps: i64, target: i64) -> Self {
        Self { steps, target }
    }

    /// Difficulty ratio `target / steps`; `+inf` when steps is zero.
    #[must_use]
    pub fn ratio(self) -> f64 {
        difficulty_ratio(self.target, self.steps)
    }
}

/// Displayed move budget for a stored `moveCount`.
#[must_use]
pub const fn display_steps(move_count: i64) -> i64 {
    let reduced = move_count - STEP_OFFSET;
    if reduced > 0 { reduced } else { move_count }
}

/// Displayed target for one stored target count.
#[must_use]
pub const fn display_target(target_count: i64) -> i64 {
    if target_count >= TARGET_THRESHOLD {
        target_count + TARGET_OFFSET_HIGH
    } else {
        target_count + TARGET_OFFSET_LOW
    }
}

/// Forward transform for a `(moveCount, targetCount)` pair.
#[must_use]
pub const fn config_to_display(move_count: i64, target_count: i64) -> DisplayPair {
    DisplayPair::new(display_steps(move_count), display_target(target_count))
}

/// `display_target / display_steps`, never failing.
#[must_use]
pub fn difficulty_ratio(display_target: i64, display_steps: i64) -> f64 {
    if display_steps == 0 {
        return f64::INFINITY;
    }
    i64_to_f64(display_target) / i64_to_f64(display_steps)
}

/// Best-effort inverse: synthesize `(moveCount, targetCount)` for a wanted
/// display pair. Exact only for `moveCount > 10` and `targetCount >= 30`;
/// below that the round trip is knowingly lossy. Stored targets 10..=29
/// display as 20..=39, which sit under the 40 threshold and come back through
/// the low offset.
#[must_use]
pub fn display_to_config(display_steps: i64, display_target: i64) -> (i64, i64) {
    let move_count = display_steps + STEP_OFFSET;
    let target_count = if display_target >= INVERSE_TARGET_THRESHOLD {
        display_target - TARGET_OFFSET_HIGH
    } else {
        (display_target - TARGET_OFFSET_LOW).max(1)
    };
    (move_count, target_count)
}

/// Inverse for a single display target.
#[must_use]
pub fn display_target_to_config(display_target: i64) -> i64 {
    display_to_config(0, display_target).1
}

/// Per-slot display targets.
#[must_use]
pub fn display_targets(targets: &[i64]) -> Vec<i64> {
    targets.iter().copied().map(display_target).collect()
}

/// Sum of per-slot display targets, the figure multi-target levels show.
#[must_use]
pub fn display_target_total(targets: &[i64]) -> i64 {
    targets.iter().copied().map(display_target).sum()
}

/// Smallest move budget keeping `display_target / steps <= max_ratio`.
///
/// Returns `(move_count, display_steps)`. Steps above ten are stored with the
/// offset; ten or fewer are stored verbatim, mirroring [`display_steps`].
/// The result is never below one step, whatever `max_ratio` is.
#[must_use]
pub fn required_move_count(display_target: i64, max_ratio: f64) -> (i64, i64) {
    let min_steps = ceil_f64_to_i64(i64_to_f64(display_target) / max_ratio).max(1);
    let move_count = if min_steps > STEP_OFFSET {
        min_steps + STEP_OFFSET
    } else {
        min_steps
    };
    (move_count, min_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn steps_keep_boundary_discontinuity() {
        assert_eq!(display_steps(10), 10);
        assert_eq!(display_steps(11), 1);
        assert_eq!(display_steps(30), 20);
        assert_eq!(display_steps(1), 1);
        assert_eq!(display_steps(0), 0);
        assert_eq!(display_steps(-4), -4);
    }

    #[test]
    fn targets_keep_boundary_discontinuity() {
        assert_eq!(display_target(9), 39);
        assert_eq!(display_target(10), 20);
        assert_eq!(display_target(0), 30);
        assert_eq!(display_target(-5), 25);
    }

    #[test]
    fn scenario_a_single_target() {
        let pair = config_to_display(30, 20);
        assert_eq!(pair, DisplayPair::new(20, 30));
        assert!((pair.ratio() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn scenario_b_three_to_one() {
        let pair = config_to_display(25, 35);
        assert_eq!(pair, DisplayPair::new(15, 45));
        assert!((pair.ratio() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_steps_ratio_is_infinite() {
        assert!(config_to_display(0, 5).ratio().is_infinite());
        assert!(difficulty_ratio(12, 0).is_sign_positive());
    }

    #[test]
    fn inverse_uses_forty_threshold() {
        assert_eq!(display_to_config(15, 45), (25, 35));
        assert_eq!(display_to_config(20, 40), (30, 30));
        assert_eq!(display_to_config(20, 39), (30, 9));
        assert_eq!(display_to_config(20, 20), (30, 1));
        assert_eq!(display_to_config(-3, 31), (7, 1));
    }

    proptest! {
        #[test]
        fn prop_inverse_round_trips_in_exact_regime(
            move_count in 11..5000i64,
            target in 30..5000i64,
        ) {
            let pair = config_to_display(move_count, target);
            prop_assert_eq!(
                display_to_config(pair.steps, pair.target),
                (move_count, target)
            );
        }

        #[test]
        fn prop_required_move_count_meets_ratio(target in 1..2000i64, max_ratio in 1.0..10.0f64) {
            let (move_count, steps) = required_move_count(target, max_ratio);
            prop_assert_eq!(display_steps(move_count), steps);
            prop_assert!(difficulty_ratio(target, steps) <= max_ratio + 1e-9);
        }
    }

    #[test]
    fn inverse_is_lossy_below_the_boundary() {
        // 10..30 display as 20..40, which the inverse reads as low-offset values.
        let pair = config_to_display(25, 12);
        assert_ne!(display_to_config(pair.steps, pair.target).1, 12);
        // Ten stored moves display as ten but come back as twenty.
        let pair = config_to_display(10, 40);
        assert_ne!(display_to_config(pair.steps, pair.target).0, 10);
    }

    #[test]
    fn multi_target_totals() {
        assert_eq!(display_targets(&[25, 25]), vec![35, 35]);
        assert_eq!(display_target_total(&[25, 5]), 35 + 35);
        assert_eq!(display_target_total(&[]), 0);
    }

    #[test]
    fn required_move_count_rounds_up() {
        // 90 / 4.5 = 20 steps exactly.
        assert_eq!(required_move_count(90, 4.5), (30, 20));
        // 91 / 4.5 = 20.2 -> 21 steps.
        assert_eq!(required_move_count(91, 4.5), (31, 21));
        // Ten or fewer steps are stored verbatim.
        assert_eq!(required_move_count(40, 4.5), (9, 9));
    }

    #[test]
    fn required_move_count_never_drops_below_one() {
        assert_eq!(required_move_count(90, 0.0), (1, 1));
        assert_eq!(required_move_count(90, -2.0), (1, 1));
        assert_eq!(required_move_count(90, f64::NAN), (1, 1));
        assert_eq!(required_move_count(0, 4.5), (1, 1));
    }
}
