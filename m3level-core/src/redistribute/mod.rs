//! Split one aggregate target count across several target slots.
//!
//! Older level files recorded a single `m_ct` entry even when `m_id` listed
//! several target types, which left the extra slots without a count. These
//! splitters produce one positive count per slot that sums back to the
//! aggregate.

use rand::Rng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::numbers::{i64_to_f64, round_f64_to_i64, usize_to_f64};
use crate::seed::{DOMAIN_REDISTRIBUTE, level_rng};

#[cfg(test)]
mod property_tests;

/// How an aggregate is divided between slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Strategy {
    /// Equal shares, remainder handed to the first slots.
    EvenSplit,
    /// Uneven "natural" shares with seeded jitter; `level` widens the jitter
    /// for five or more slots.
    Weighted { level: u32, seed: u64 },
}

impl Strategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::EvenSplit => "even",
            Self::Weighted { .. } => "weighted",
        }
    }
}

/// Strategy family chosen once for a batch; the per-level [`Strategy`] is
/// built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    #[default]
    Even,
    Weighted,
}

impl SplitMode {
    #[must_use]
    pub const fn strategy(self, level: u32, seed: u64) -> Strategy {
        match self {
            Self::Even => Strategy::EvenSplit,
            Self::Weighted => Strategy::Weighted { level, seed },
        }
    }
}

/// Divide `total` into `slots` counts using `strategy`.
///
/// With `slots <= 1` the aggregate is returned unchanged as `[total]`. For
/// `total >= slots >= 1` the result has `slots` entries, each at least one,
/// summing to `total`. When `total < slots` every slot still gets one and the
/// sum exceeds the aggregate.
#[must_use]
pub fn redistribute(total: i64, slots: usize, strategy: Strategy) -> Vec<i64> {
    if slots <= 1 {
        return vec![total];
    }
    match strategy {
        Strategy::EvenSplit => even_split(total, slots),
        Strategy::Weighted { level, seed } => weighted_split(total, slots, level, seed),
    }
}

/// Equal shares with the remainder forwarded to the leading slots.
#[must_use]
pub fn even_split(total: i64, slots: usize) -> Vec<i64> {
    if slots <= 1 {
        return vec![total];
    }
    let count = i64::try_from(slots).unwrap_or(i64::MAX);
    let base = total.div_euclid(count);
    let remainder = usize::try_from(total.rem_euclid(count)).unwrap_or(0);
    (0..slots)
        .map(|idx| {
            let share = if idx < remainder { base + 1 } else { base };
            share.max(1)
        })
        .collect()
}

/// Jitter width for the iterative peel-off used with five or more slots.
#[must_use]
pub const fn variation_factor(level: u32) -> f64 {
    if level <= 50 {
        0.3
    } else if level <= 200 {
        0.4
    } else {
        0.5
    }
}

/// Uneven shares drawn from the `(seed, level)` stream.
#[must_use]
pub fn weighted_split(total: i64, slots: usize, level: u32, seed: u64) -> Vec<i64> {
    if slots <= 1 {
        return vec![total];
    }
    let mut rng = level_rng(seed, DOMAIN_REDISTRIBUTE, level);
    let mut counts = match slots {
        2 => two_slot_weights(&mut rng),
        3 => three_slot_weights(&mut rng),
        4 => four_slot_weights(&mut rng),
        _ => peel_off_weights(&mut rng, slots, variation_factor(level)),
    }
    .into_iter()
    .map(|weight| round_f64_to_i64(i64_to_f64(total) * weight).max(1))
    .collect::<Vec<_>>();

    if (3..=4).contains(&slots) {
        counts.shuffle(&mut rng);
    }
    correct_drift(&mut counts, total);
    counts
}

fn two_slot_weights(rng: &mut ChaCha20Rng) -> Vec<f64> {
    let main = rng.gen_range(0.60..0.70);
    if rng.gen_bool(0.5) {
        vec![main, 1.0 - main]
    } else {
        vec![1.0 - main, main]
    }
}

fn three_slot_weights(rng: &mut ChaCha20Rng) -> Vec<f64> {
    let main = rng.gen_range(0.45..0.55);
    let secondary = rng.gen_range(0.25..0.35);
    vec![main, secondary, 1.0 - main - secondary]
}

fn four_slot_weights(rng: &mut ChaCha20Rng) -> Vec<f64> {
    let mut weights = [0.4, 0.3, 0.2, 0.1];
    for weight in &mut weights {
        *weight += (rng.gen_range(0.0..1.0) - 0.5) * 0.1;
    }
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| w / sum).collect()
}

fn peel_off_weights(rng: &mut ChaCha20Rng, slots: usize, variation: f64) -> Vec<f64> {
    let mut weights = Vec::with_capacity(slots);
    let mut remaining = 1.0;
    for idx in 0..slots - 1 {
        let avg = remaining / usize_to_f64(slots - idx);
        let jitter = avg * variation * (rng.gen_range(0.0..1.0) - 0.5);
        let weight = (avg + jitter).max(0.0);
        weights.push(weight);
        remaining -= weight;
    }
    weights.push(remaining.max(0.0));
    weights
}

/// Push the rounding residual onto the largest slot. Excess is removed from
/// the largest slot repeatedly so no slot drops below one.
fn correct_drift(counts: &mut [i64], total: i64) {
    let mut diff = total - counts.iter().sum::<i64>();
    if diff > 0 {
        let idx = largest_index(counts);
        counts[idx] += diff;
        return;
    }
    while diff < 0 {
        let idx = largest_index(counts);
        let room = counts[idx] - 1;
        if room <= 0 {
            break;
        }
        let take = room.min(-diff);
        counts[idx] -= take;
        diff += take;
    }
}

/// First index holding the maximum value.
fn largest_index(counts: &[i64]) -> usize {
    let mut best = 0;
    for (idx, value) in counts.iter().enumerate() {
        if *value > counts[best] {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_c_even_split_forwards_remainder() {
        assert_eq!(redistribute(100, 3, Strategy::EvenSplit), vec![34, 33, 33]);
    }

    #[test]
    fn single_slot_is_identity() {
        assert_eq!(redistribute(57, 1, Strategy::EvenSplit), vec![57]);
        assert_eq!(
            redistribute(-3, 1, Strategy::Weighted { level: 9, seed: 1 }),
            vec![-3]
        );
        assert_eq!(redistribute(8, 0, Strategy::EvenSplit), vec![8]);
    }

    #[test]
    fn even_split_clamps_small_totals() {
        assert_eq!(even_split(2, 4), vec![1, 1, 1, 1]);
        assert_eq!(even_split(7, 2), vec![4, 3]);
    }

    #[test]
    fn weighted_two_slots_favour_one_side() {
        let counts = weighted_split(100, 2, 10, 12345);
        assert_eq!(counts.iter().sum::<i64>(), 100);
        let big = counts.iter().copied().max().unwrap_or_default();
        assert!((60..=70).contains(&big), "main share out of range: {counts:?}");
    }

    #[test]
    fn weighted_is_deterministic_per_seed_and_level() {
        let a = weighted_split(240, 5, 300, 42);
        let b = weighted_split(240, 5, 300, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn weighted_handles_tiny_totals() {
        let counts = weighted_split(5, 5, 1000, 7);
        assert_eq!(counts, vec![1, 1, 1, 1, 1]);
        let counts = weighted_split(4, 3, 3, 7);
        assert_eq!(counts.iter().sum::<i64>(), 4);
        assert!(counts.iter().all(|c| *c >= 1));
    }

    #[test]
    fn drift_correction_never_drops_below_one() {
        let mut counts = vec![1, 1, 9];
        correct_drift(&mut counts, 5);
        assert_eq!(counts, vec![1, 1, 3]);
        let mut counts = vec![3, 2];
        correct_drift(&mut counts, 9);
        assert_eq!(counts, vec![7, 2]);
    }

    #[test]
    fn variation_widens_with_level() {
        assert!(variation_factor(10) < variation_factor(100));
        assert!(variation_factor(100) < variation_factor(1000));
    }
}
