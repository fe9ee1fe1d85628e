//! Property tests for target redistribution.

use proptest::prelude::*;

use super::{Strategy as Split, even_split, redistribute, weighted_split};

fn split_strategy() -> impl Strategy<Value = Split> {
    prop_oneof![
        Just(Split::EvenSplit),
        (1..=1700u32, any::<u64>()).prop_map(|(level, seed)| Split::Weighted { level, seed }),
    ]
}

proptest! {
    #[test]
    fn prop_split_preserves_total_and_length(
        n in 1..=8usize,
        extra in 0..=500i64,
        strategy in split_strategy(),
    ) {
        let total = i64::try_from(n).unwrap_or(1) + extra;
        let counts = redistribute(total, n, strategy);
        prop_assert_eq!(counts.len(), n);
        prop_assert_eq!(counts.iter().sum::<i64>(), total);
        prop_assert!(counts.iter().all(|c| *c >= 1), "slot below one: {:?}", counts);
    }

    #[test]
    fn prop_single_slot_is_identity(total in -50..=500i64, strategy in split_strategy()) {
        prop_assert_eq!(redistribute(total, 1, strategy), vec![total]);
    }

    #[test]
    fn prop_weighted_is_reproducible(
        n in 2..=8usize,
        total in 8..=400i64,
        level in 1..=1700u32,
        seed in any::<u64>(),
    ) {
        prop_assert_eq!(
            weighted_split(total, n, level, seed),
            weighted_split(total, n, level, seed)
        );
    }

    #[test]
    fn prop_even_split_is_balanced(n in 2..=8usize, extra in 0..=500i64) {
        let total = i64::try_from(n).unwrap_or(1) + extra;
        let counts = even_split(total, n);
        let max = counts.iter().copied().max().unwrap_or_default();
        let min = counts.iter().copied().min().unwrap_or_default();
        prop_assert!(max - min <= 1);
        prop_assert!(counts.windows(2).all(|pair| pair[0] >= pair[1]));
    }
}
