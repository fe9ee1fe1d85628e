//! Migration policies applied to one level at a time.
//!
//! Each policy is a short composition of the display transform, the
//! redistribution heuristic and per-level seeded randomness. Policies never
//! touch the filesystem; [`crate::batch::BatchRunner`] loads, applies and saves.

use std::fmt;

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::display::{
    DisplayPair, display_steps, display_target, display_target_to_config, display_to_config,
    required_move_count,
};
use crate::level::{LevelConfig, LevelError};
use crate::numbers::{i64_to_f64, trunc_f64_to_i64};
use crate::redistribute::{SplitMode, redistribute};
use crate::seed::{DOMAIN_DIRECTION, DOMAIN_REFERENCE, DOMAIN_RESCALE, level_rng};

/// Floor for rescaled move budgets.
pub const MIN_MOVES: i64 = 10;
/// Floor for rescaled star thresholds.
pub const MIN_SCORE: i64 = 100;
/// Floor for rescaled target counts.
pub const MIN_TARGET: i64 = 5;
/// Block spawn weights stay inside this band.
pub const BLOCK_RATIO_MIN: i64 = 30;
pub const BLOCK_RATIO_MAX: i64 = 100;
/// Display bump drawn per target when copying from a reference level.
pub const REFERENCE_BUMPS: [i64; 6] = [1, 1, 2, 2, 2, 3];

/// What a policy did to one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub before: DisplayPair,
    pub after: DisplayPair,
    pub description: String,
}

impl Change {
    #[must_use]
    pub fn new(before: DisplayPair, after: DisplayPair, description: impl Into<String>) -> Self {
        Self {
            before,
            after,
            description: description.into(),
        }
    }

    /// No edit; the display pair is reported on both sides.
    #[must_use]
    pub fn none(display: DisplayPair, reason: impl Into<String>) -> Self {
        Self::new(display, display, reason)
    }
}

/// A per-level edit.
pub trait Migration {
    /// Name used for banners and logs.
    fn name(&self) -> &'static str;

    /// Whether [`Migration::apply`] expects the reference project's level.
    fn needs_reference(&self) -> bool {
        false
    }

    /// Edit `config` in place.
    ///
    /// # Errors
    ///
    /// Returns an error when the document lacks a field the policy edits.
    fn apply(
        &self,
        level: u32,
        config: &mut LevelConfig,
        reference: Option<&LevelConfig>,
    ) -> Result<Change, LevelError>;
}

/// Adds a fixed offset to `moveCount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddSteps {
    pub delta: i64,
}

impl Migration for AddSteps {
    fn name(&self) -> &'static str {
        "add-steps"
    }

    fn apply(
        &self,
        _level: u32,
        config: &mut LevelConfig,
        _reference: Option<&LevelConfig>,
    ) -> Result<Change, LevelError> {
        let before = config.display();
        let original = config.move_count;
        config.move_count += self.delta;
        Ok(Change::new(
            before,
            config.display(),
            format!("moveCount {original} -> {}", config.move_count),
        ))
    }
}

/// Synthesizes `moveCount` and the primary target from a wanted display pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetDisplay {
    pub steps: i64,
    pub target: i64,
}

impl Migration for SetDisplay {
    fn name(&self) -> &'static str {
        "set-display"
    }

    fn apply(
        &self,
        level: u32,
        config: &mut LevelConfig,
        _reference: Option<&LevelConfig>,
    ) -> Result<Change, LevelError> {
        let before = config.display();
        let (move_count, target_count) = display_to_config(self.steps, self.target);
        let layer = config.primary_layer_mut(level)?;
        match layer.m_ct.first_mut() {
            Some(first) => *first = target_count,
            None => layer.m_ct.push(target_count),
        }
        config.move_count = move_count;
        Ok(Change::new(
            before,
            config.display(),
            format!("config ({move_count}, {target_count})"),
        ))
    }
}

/// Raises the move budget of levels whose ratio is above `threshold` so the
/// ratio drops to `target_ratio` or below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapRatio {
    pub threshold: f64,
    pub target_ratio: f64,
}

impl Default for CapRatio {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            target_ratio: 4.5,
        }
    }
}

impl Migration for CapRatio {
    fn name(&self) -> &'static str {
        "cap-ratio"
    }

    fn apply(
        &self,
        level: u32,
        config: &mut LevelConfig,
        _reference: Option<&LevelConfig>,
    ) -> Result<Change, LevelError> {
        config.require_primary_target(level)?;
        if !(self.target_ratio.is_finite() && self.target_ratio > 0.0) {
            return Err(LevelError::InvalidRatio {
                level,
                value: self.target_ratio,
            });
        }
        let before = config.display();
        let ratio = before.ratio();
        if ratio <= self.threshold {
            return Ok(Change::none(before, format!("ratio {ratio:.2} within limit")));
        }
        let (move_count, _) = required_move_count(before.target, self.target_ratio);
        config.move_count = move_count;
        let after = config.display();
        Ok(Change::new(
            before,
            after,
            format!("ratio {ratio:.2} -> {:.2}", after.ratio()),
        ))
    }
}

/// Gives every target slot its own count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairTargets {
    pub mode: SplitMode,
    pub seed: u64,
    /// Also re-split levels whose counts already cover every slot.
    pub rebalance_existing: bool,
}

impl Migration for RepairTargets {
    fn name(&self) -> &'static str {
        "repair-targets"
    }

    fn apply(
        &self,
        level: u32,
        config: &mut LevelConfig,
        _reference: Option<&LevelConfig>,
    ) -> Result<Change, LevelError> {
        let before = config.display_total();
        let layer = config.primary_layer_mut(level)?;
        let slots = layer.m_id.len();
        if slots <= 1 {
            return Ok(Change::none(before, "single target"));
        }
        let total = if layer.m_ct.len() < slots {
            layer.m_ct.first().copied().unwrap_or(1)
        } else if self.rebalance_existing {
            layer.m_ct.iter().sum()
        } else {
            return Ok(Change::none(before, "targets already split"));
        };
        let counts = redistribute(total, slots, self.mode.strategy(level, self.seed));
        let description = format!("{total} across {slots} slots -> {counts:?}");
        layer.m_ct = counts;
        Ok(Change::new(before, config.display_total(), description))
    }
}

/// How random rescaling picks its multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescaleMode {
    /// Every value drifts independently within `1 ± v`.
    #[default]
    Symmetric,
    /// The level is first made easier or harder, then every value moves by
    /// `0.1..=v` in that direction.
    Directed,
}

/// Per-tier variation widths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescaleTier {
    pub moves: f64,
    pub scores: f64,
    pub targets: f64,
    /// Chance that a directed rescale makes the level easier.
    pub easier_probability: f64,
}

impl RescaleTier {
    #[must_use]
    pub const fn for_level(level: u32) -> Self {
        if level <= 50 {
            Self {
                moves: 0.15,
                scores: 0.20,
                targets: 0.25,
                easier_probability: 0.6,
            }
        } else if level <= 200 {
            Self {
                moves: 0.20,
                scores: 0.30,
                targets: 0.35,
                easier_probability: 0.5,
            }
        } else {
            Self {
                moves: 0.25,
                scores: 0.40,
                targets: 0.45,
                easier_probability: 0.4,
            }
        }
    }
}

/// Difficulty direction of a directed rescale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Easier,
    Harder,
}

impl Direction {
    /// Direction for `level` under `seed`; drawn from its own stream so it
    /// does not shift the value multipliers.
    #[must_use]
    pub fn for_level(level: u32, seed: u64) -> Self {
        let mut rng = level_rng(seed, DOMAIN_DIRECTION, level);
        if rng.gen_bool(RescaleTier::for_level(level).easier_probability) {
            Self::Easier
        } else {
            Self::Harder
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Easier => "easier",
            Self::Harder => "harder",
        }
    }
}

/// Tiered random rescale of moves, scores, targets and block ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rescale {
    pub mode: RescaleMode,
    pub seed: u64,
}

impl Rescale {
    fn multiplier(rng: &mut ChaCha20Rng, variation: f64, sign: Option<f64>) -> f64 {
        match sign {
            Some(sign) => 1.0 + sign * rng.gen_range(0.1..=variation.max(0.1)),
            None => 1.0 + rng.gen_range(-variation..=variation),
        }
    }

    fn scaled(value: i64, multiplier: f64) -> i64 {
        trunc_f64_to_i64(i64_to_f64(value) * multiplier)
    }
}

impl Migration for Rescale {
    fn name(&self) -> &'static str {
        match self.mode {
            RescaleMode::Symmetric => "rescale",
            RescaleMode::Directed => "rescale-directed",
        }
    }

    fn apply(
        &self,
        level: u32,
        config: &mut LevelConfig,
        _reference: Option<&LevelConfig>,
    ) -> Result<Change, LevelError> {
        let before = config.display();
        let tier = RescaleTier::for_level(level);
        let direction = match self.mode {
            RescaleMode::Symmetric => None,
            RescaleMode::Directed => Some(Direction::for_level(level, self.seed)),
        };
        // Easier means more moves, lower scores and fewer targets.
        let (move_sign, score_sign, target_sign) = match direction {
            None => (None, None, None),
            Some(Direction::Easier) => (Some(1.0), Some(-1.0), Some(-1.0)),
            Some(Direction::Harder) => (Some(-1.0), Some(1.0), Some(1.0)),
        };
        let block_variation = match self.mode {
            RescaleMode::Symmetric => 0.10,
            RescaleMode::Directed => 0.08,
        };
        let mut rng = level_rng(self.seed, DOMAIN_RESCALE, level);

        let multiplier = Self::multiplier(&mut rng, tier.moves, move_sign);
        config.move_count = Self::scaled(config.move_count, multiplier).max(MIN_MOVES);

        if let Some(scores) = config.scores.as_mut() {
            let mut rescaled: Vec<i64> = Vec::with_capacity(scores.len());
            for score in scores.iter() {
                let multiplier = Self::multiplier(&mut rng, tier.scores, score_sign);
                let mut value = Self::scaled(*score, multiplier).max(MIN_SCORE);
                if let Some(previous) = rescaled.last()
                    && value <= *previous
                {
                    value = *previous + rng.gen_range(100_i64..=500);
                }
                rescaled.push(value);
            }
            *scores = rescaled;
        }

        for layer in &mut config.map_data {
            for target in &mut layer.m_ct {
                let multiplier = Self::multiplier(&mut rng, tier.targets, target_sign);
                *target = Self::scaled(*target, multiplier).max(MIN_TARGET);
            }
        }

        if let Some(ratios) = config.block_ratio.as_mut() {
            for ratio in ratios.iter_mut() {
                let multiplier = 1.0 + rng.gen_range(-block_variation..=block_variation);
                *ratio = Self::scaled(*ratio, multiplier).clamp(BLOCK_RATIO_MIN, BLOCK_RATIO_MAX);
            }
        }

        let description = direction.map_or_else(
            || "rescaled".to_string(),
            |direction| format!("rescaled {}", direction.label()),
        );
        Ok(Change::new(before, config.display(), description))
    }
}

/// Which reference values are copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceField {
    /// Display steps +1 and each display target + a small bump, written back
    /// through the inverse transform into `moveCount` and `m_ct`.
    Targets,
    /// Raw `moveCount + 1` and `m_mk + bump`.
    Marks,
}

/// Copies a reference level's values with a small perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FromReference {
    pub field: ReferenceField,
    pub seed: u64,
}

fn bump(rng: &mut ChaCha20Rng) -> i64 {
    REFERENCE_BUMPS[rng.gen_range(0..REFERENCE_BUMPS.len())]
}

impl Migration for FromReference {
    fn name(&self) -> &'static str {
        match self.field {
            ReferenceField::Targets => "from-reference",
            ReferenceField::Marks => "from-reference-marks",
        }
    }

    fn needs_reference(&self) -> bool {
        true
    }

    fn apply(
        &self,
        level: u32,
        config: &mut LevelConfig,
        reference: Option<&LevelConfig>,
    ) -> Result<Change, LevelError> {
        let reference = reference.ok_or(LevelError::MissingReference { level })?;
        let before = config.display();
        let mut rng = level_rng(self.seed, DOMAIN_REFERENCE, level);
        match self.field {
            ReferenceField::Targets => {
                let source = &reference.primary_layer(level)?.m_ct;
                if source.is_empty() {
                    return Err(LevelError::EmptyTargets { level });
                }
                let (move_count, _) =
                    display_to_config(display_steps(reference.move_count) + 1, 0);
                let targets: Vec<i64> = source
                    .iter()
                    .map(|count| {
                        display_target_to_config(display_target(*count) + bump(&mut rng))
                    })
                    .collect();
                config.primary_layer_mut(level)?.m_ct = targets;
                config.move_count = move_count;
            }
            ReferenceField::Marks => {
                let marks: Vec<i64> = reference
                    .primary_layer(level)?
                    .m_mk
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|mark| mark + bump(&mut rng))
                    .collect();
                config.primary_layer_mut(level)?.m_mk = Some(marks);
                config.move_count = reference.move_count + 1;
            }
        }
        Ok(Change::new(
            before,
            config.display(),
            format!("copied from reference ({})", self.name()),
        ))
    }
}

/// Built-in policies selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MigrationKind {
    AddSteps { delta: i64 },
    SetDisplay { steps: i64, target: i64 },
    CapRatio { threshold: f64, target_ratio: f64 },
    RepairTargets { mode: SplitMode, rebalance_existing: bool },
    Rescale { mode: RescaleMode },
    FromReference { field: ReferenceField },
}

impl MigrationKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AddSteps { .. } => "Add Steps",
            Self::SetDisplay { .. } => "Set Display",
            Self::CapRatio { .. } => "Cap Ratio",
            Self::RepairTargets { .. } => "Repair Targets",
            Self::Rescale {
                mode: RescaleMode::Symmetric,
            } => "Rescale",
            Self::Rescale {
                mode: RescaleMode::Directed,
            } => "Directed Rescale",
            Self::FromReference { .. } => "From Reference",
        }
    }

    #[must_use]
    pub fn create(self, seed: u64) -> Box<dyn Migration> {
        match self {
            Self::AddSteps { delta } => Box::new(AddSteps { delta }),
            Self::SetDisplay { steps, target } => Box::new(SetDisplay { steps, target }),
            Self::CapRatio {
                threshold,
                target_ratio,
            } => Box::new(CapRatio {
                threshold,
                target_ratio,
            }),
            Self::RepairTargets {
                mode,
                rebalance_existing,
            } => Box::new(RepairTargets {
                mode,
                seed,
                rebalance_existing,
            }),
            Self::Rescale { mode } => Box::new(Rescale { mode, seed }),
            Self::FromReference { field } => Box::new(FromReference { field, seed }),
        }
    }
}

impl fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(move_count: i64, m_id: Vec<i64>, m_ct: Vec<i64>) -> LevelConfig {
        LevelConfig::new(move_count, m_id, m_ct)
    }

    #[test]
    fn add_steps_shifts_display_steps() {
        let mut cfg = level(28, vec![1], vec![20]);
        let change = AddSteps { delta: 2 }.apply(1, &mut cfg, None).unwrap();
        assert_eq!(cfg.move_count, 30);
        assert_eq!(change.before.steps, 18);
        assert_eq!(change.after.steps, 20);
    }

    #[test]
    fn set_display_uses_inverse_transform() {
        let mut cfg = level(12, vec![1], vec![3]);
        SetDisplay { steps: 15, target: 45 }
            .apply(1, &mut cfg, None)
            .unwrap();
        assert_eq!(cfg.move_count, 25);
        assert_eq!(cfg.primary_target(), 35);

        let mut empty = level(12, vec![1], Vec::new());
        SetDisplay { steps: 20, target: 39 }
            .apply(1, &mut empty, None)
            .unwrap();
        assert_eq!(empty.primary_layer(1).unwrap().m_ct, vec![9]);
    }

    #[test]
    fn cap_ratio_only_touches_high_ratios() {
        let mut easy = level(30, vec![1], vec![20]);
        let change = CapRatio::default().apply(1, &mut easy, None).unwrap();
        assert_eq!(easy.move_count, 30);
        assert_eq!(change.before, change.after);

        // 90 display targets over 12 steps is 7.5; needs ceil(90 / 4.5) = 20 steps.
        let mut hard = level(22, vec![1], vec![80]);
        CapRatio::default().apply(1, &mut hard, None).unwrap();
        assert_eq!(hard.move_count, 30);
        assert!(hard.display().ratio() <= 4.5);
    }

    #[test]
    fn cap_ratio_rejects_non_positive_target_ratio() {
        for target_ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let policy = CapRatio {
                threshold: 5.0,
                target_ratio,
            };
            let mut cfg = level(22, vec![1], vec![80]);
            assert!(matches!(
                policy.apply(3, &mut cfg, None),
                Err(LevelError::InvalidRatio { level: 3, .. })
            ));
            assert_eq!(cfg.move_count, 22);
        }
    }

    #[test]
    fn cap_ratio_requires_targets() {
        let mut cfg = level(22, vec![1], Vec::new());
        assert!(matches!(
            CapRatio::default().apply(4, &mut cfg, None),
            Err(LevelError::EmptyTargets { level: 4 })
        ));
    }

    #[test]
    fn scenario_d_repairs_legacy_aggregate() {
        for mode in [SplitMode::Even, SplitMode::Weighted] {
            let mut cfg = level(30, vec![1, 2], vec![50]);
            let policy = RepairTargets {
                mode,
                seed: 12345,
                rebalance_existing: false,
            };
            policy.apply(61, &mut cfg, None).unwrap();
            let layer = cfg.primary_layer(61).unwrap();
            assert_eq!(layer.m_ct.len(), layer.m_id.len());
            assert_eq!(layer.m_ct.iter().sum::<i64>(), 50);
            assert!(layer.m_ct.iter().all(|count| *count >= 1));
        }
    }

    #[test]
    fn repair_leaves_split_levels_unless_rebalancing() {
        let mut cfg = level(30, vec![1, 2], vec![25, 25]);
        let keep = RepairTargets {
            mode: SplitMode::Weighted,
            seed: 1,
            rebalance_existing: false,
        };
        keep.apply(3, &mut cfg, None).unwrap();
        assert_eq!(cfg.primary_layer(3).unwrap().m_ct, vec![25, 25]);

        let rebalance = RepairTargets {
            rebalance_existing: true,
            ..keep
        };
        rebalance.apply(3, &mut cfg, None).unwrap();
        let counts = &cfg.primary_layer(3).unwrap().m_ct;
        assert_eq!(counts.iter().sum::<i64>(), 50);
        assert_ne!(counts, &vec![25, 25]);
    }

    #[test]
    fn repair_without_counts_uses_one() {
        let mut cfg = level(30, vec![1, 2, 3], Vec::new());
        let policy = RepairTargets {
            mode: SplitMode::Even,
            seed: 0,
            rebalance_existing: false,
        };
        policy.apply(1, &mut cfg, None).unwrap();
        assert_eq!(cfg.primary_layer(1).unwrap().m_ct, vec![1, 1, 1]);
    }

    fn rich_level() -> LevelConfig {
        let mut cfg = level(40, vec![1, 2], vec![30, 12]);
        cfg.scores = Some(vec![1000, 2000, 3000]);
        cfg.block_ratio = Some(vec![30, 60, 100]);
        cfg
    }

    #[test]
    fn symmetric_rescale_respects_floors_and_order() {
        for lvl in [1, 75, 900] {
            let mut cfg = rich_level();
            let policy = Rescale {
                mode: RescaleMode::Symmetric,
                seed: 12345,
            };
            policy.apply(lvl, &mut cfg, None).unwrap();
            assert!(cfg.move_count >= MIN_MOVES);
            let scores = cfg.scores.clone().unwrap();
            assert!(scores.iter().all(|s| *s >= MIN_SCORE));
            assert!(scores.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(cfg.primary_layer(lvl).unwrap().m_ct.iter().all(|t| *t >= MIN_TARGET));
            assert!(
                cfg.block_ratio
                    .unwrap()
                    .iter()
                    .all(|r| (BLOCK_RATIO_MIN..=BLOCK_RATIO_MAX).contains(r))
            );
        }
    }

    #[test]
    fn directed_rescale_moves_in_one_direction() {
        for lvl in 1..40 {
            let mut cfg = rich_level();
            let policy = Rescale {
                mode: RescaleMode::Directed,
                seed: 7,
            };
            policy.apply(lvl, &mut cfg, None).unwrap();
            match Direction::for_level(lvl, 7) {
                Direction::Easier => {
                    assert!(cfg.move_count > 40);
                    assert!(cfg.primary_target() < 30);
                }
                Direction::Harder => {
                    assert!(cfg.move_count < 40);
                    assert!(cfg.primary_target() > 30);
                }
            }
        }
    }

    #[test]
    fn rescale_replays_with_same_seed() {
        let policy = Rescale {
            mode: RescaleMode::Directed,
            seed: 99,
        };
        let mut a = rich_level();
        let mut b = rich_level();
        policy.apply(321, &mut a, None).unwrap();
        policy.apply(321, &mut b, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn from_reference_targets_bumps_display_values() {
        let reference = level(25, vec![1, 2], vec![35, 40]);
        let mut cfg = level(99, vec![1, 2], vec![1]);
        let policy = FromReference {
            field: ReferenceField::Targets,
            seed: 12345,
        };
        policy.apply(5, &mut cfg, Some(&reference)).unwrap();
        assert_eq!(cfg.display().steps, 16);
        let counts = &cfg.primary_layer(5).unwrap().m_ct;
        assert_eq!(counts.len(), 2);
        assert!((36..=38).contains(&counts[0]));
        assert!((41..=43).contains(&counts[1]));
    }

    #[test]
    fn from_reference_marks_copies_raw_values() {
        let mut reference = level(30, vec![1], vec![20]);
        reference.map_data[0].m_mk = Some(vec![20, 5]);
        let mut cfg = level(10, vec![1], vec![20]);
        let policy = FromReference {
            field: ReferenceField::Marks,
            seed: 1,
        };
        policy.apply(2, &mut cfg, Some(&reference)).unwrap();
        assert_eq!(cfg.move_count, 31);
        let marks = cfg.primary_layer(2).unwrap().m_mk.clone().unwrap();
        assert!((21..=23).contains(&marks[0]));
        assert!((6..=8).contains(&marks[1]));
    }

    #[test]
    fn from_reference_requires_reference() {
        let mut cfg = level(10, vec![1], vec![20]);
        let policy = FromReference {
            field: ReferenceField::Targets,
            seed: 1,
        };
        assert!(policy.needs_reference());
        assert!(matches!(
            policy.apply(8, &mut cfg, None),
            Err(LevelError::MissingReference { level: 8 })
        ));
    }

    #[test]
    fn kinds_create_named_policies() {
        let policy = MigrationKind::Rescale {
            mode: RescaleMode::Directed,
        }
        .create(1);
        assert_eq!(policy.name(), "rescale-directed");
        assert_eq!(MigrationKind::AddSteps { delta: 2 }.to_string(), "Add Steps");
        assert!(
            MigrationKind::FromReference {
                field: ReferenceField::Marks
            }
            .create(3)
            .needs_reference()
        );
    }
}
