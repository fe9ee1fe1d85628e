//! Difficulty metrics, ratio scans and comparisons against a reference project.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::display::{
    config_to_display, difficulty_ratio, display_target_to_config, required_move_count,
};
use crate::level::{LevelConfig, LevelError};
use crate::numbers::{i64_to_f64, trunc_f64_to_i64, usize_to_f64};
use crate::store::{LevelRange, LevelStore};

/// Classification of one level's move/target balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// One displayed step or fewer.
    HighRisk,
    /// Two or three displayed steps.
    MediumRisk,
    /// Four or five displayed steps.
    LowRisk,
    /// At most ten steps with a ratio of six or more.
    InsufficientMoves,
    /// Ratio of eight or more.
    SevereExcessTargets,
    /// Ratio of five or more.
    ExcessTargets,
    /// Ratio below one half.
    TooFewTargets,
    Normal,
}

impl RiskLevel {
    #[must_use]
    pub fn classify(display_steps: i64, ratio: f64) -> Self {
        if display_steps <= 1 {
            Self::HighRisk
        } else if display_steps <= 3 {
            Self::MediumRisk
        } else if display_steps <= 5 {
            Self::LowRisk
        } else if display_steps <= 10 && ratio >= 6.0 {
            Self::InsufficientMoves
        } else if ratio >= 8.0 {
            Self::SevereExcessTargets
        } else if ratio >= 5.0 {
            Self::ExcessTargets
        } else if ratio < 0.5 {
            Self::TooFewTargets
        } else {
            Self::Normal
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HighRisk => "high risk",
            Self::MediumRisk => "medium risk",
            Self::LowRisk => "low risk",
            Self::InsufficientMoves => "insufficient moves",
            Self::SevereExcessTargets => "severe excess targets",
            Self::ExcessTargets => "excess targets",
            Self::TooFewTargets => "too few targets",
            Self::Normal => "normal",
        }
    }

    #[must_use]
    pub const fn is_problem(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Suggested fix for a flagged level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suggestion {
    SetMoveCount { move_count: i64, display_steps: i64 },
    ReduceTargets { display_target: i64 },
    RaiseTargets { display_target: i64 },
}

/// Difficulty figures for one level, computed from the summed target counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelMetrics {
    pub level: u32,
    pub config_steps: i64,
    pub display_steps: i64,
    pub config_targets: i64,
    pub display_targets: i64,
    #[serde(with = "ratio_serde")]
    pub ratio: f64,
    pub risk: RiskLevel,
}

impl LevelMetrics {
    #[must_use]
    pub fn from_config(level: u32, config: &LevelConfig) -> Self {
        let pair = config.display_total();
        let ratio = pair.ratio();
        Self {
            level,
            config_steps: config.move_count,
            display_steps: pair.steps,
            config_targets: config.target_total(),
            display_targets: pair.target,
            ratio,
            risk: RiskLevel::classify(pair.steps, ratio),
        }
    }

    /// Fix suggested for the level's risk class, if any.
    #[must_use]
    pub fn suggestion(&self) -> Option<Suggestion> {
        let steps_for = |divisor: i64, floor: i64| {
            let steps = (self.display_targets / divisor).max(floor);
            Suggestion::SetMoveCount {
                move_count: steps + 10,
                display_steps: steps,
            }
        };
        match self.risk {
            RiskLevel::HighRisk => Some(steps_for(3, 10)),
            RiskLevel::MediumRisk | RiskLevel::LowRisk => Some(steps_for(2, 8)),
            RiskLevel::ExcessTargets => Some(Suggestion::ReduceTargets {
                display_target: (self.display_steps * 3).max(5),
            }),
            RiskLevel::InsufficientMoves
            | RiskLevel::SevereExcessTargets
            | RiskLevel::TooFewTargets => Some(Suggestion::RaiseTargets {
                display_target: self.display_steps.max(10),
            }),
            RiskLevel::Normal => None,
        }
    }
}

/// Metrics for every readable level in `range`, plus per-level load errors.
/// Missing files are skipped silently.
#[must_use]
pub fn collect_metrics(
    store: &LevelStore,
    range: LevelRange,
) -> (Vec<LevelMetrics>, Vec<(u32, String)>) {
    let mut metrics = Vec::new();
    let mut failures = Vec::new();
    for level in range.levels() {
        match store.load(level) {
            Ok(config) => metrics.push(LevelMetrics::from_config(level, &config)),
            Err(LevelError::Missing { .. }) => {}
            Err(err) => {
                log::error!("{err}");
                failures.push((level, err.to_string()));
            }
        }
    }
    (metrics, failures)
}

/// One level flagged by the ratio scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub level: u32,
    pub current_move_count: i64,
    pub current_steps: i64,
    pub current_targets: i64,
    #[serde(with = "ratio_serde")]
    pub current_ratio: f64,
    pub new_move_count: i64,
    pub new_steps: i64,
}

impl Adjustment {
    /// Ratio after the adjustment is applied.
    #[must_use]
    pub fn new_ratio(&self) -> f64 {
        difficulty_ratio(self.current_targets, self.new_steps)
    }
}

/// Scan output consumed by the apply step.
pub type AdjustmentList = Vec<Adjustment>;

/// Result of [`scan_ratios`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScanOutcome {
    pub checked: usize,
    pub threshold: f64,
    pub target_ratio: f64,
    pub adjustments: AdjustmentList,
    pub failures: Vec<(u32, String)>,
}

/// Flag levels whose primary-target ratio exceeds `threshold` and compute the
/// move budget that brings them to `target_ratio`.
#[must_use]
pub fn scan_ratios(
    store: &LevelStore,
    range: LevelRange,
    threshold: f64,
    target_ratio: f64,
) -> ScanOutcome {
    let mut outcome = ScanOutcome {
        threshold,
        target_ratio,
        ..ScanOutcome::default()
    };
    for level in range.levels() {
        let config = match store.load(level) {
            Ok(config) => config,
            Err(LevelError::Missing { .. }) => continue,
            Err(err) => {
                log::error!("{err}");
                outcome.failures.push((level, err.to_string()));
                continue;
            }
        };
        let target = match config.require_primary_target(level) {
            Ok(target) => target,
            Err(err) => {
                log::error!("{err}");
                outcome.failures.push((level, err.to_string()));
                continue;
            }
        };
        outcome.checked += 1;
        let pair = config_to_display(config.move_count, target);
        let ratio = pair.ratio();
        if ratio > threshold {
            let (new_move_count, new_steps) = required_move_count(pair.target, target_ratio);
            outcome.adjustments.push(Adjustment {
                level,
                current_move_count: config.move_count,
                current_steps: pair.steps,
                current_targets: pair.target,
                current_ratio: ratio,
                new_move_count,
                new_steps,
            });
        }
    }
    log::info!(
        "ratio scan checked {} levels, flagged {}",
        outcome.checked,
        outcome.adjustments.len()
    );
    outcome
}

/// Write an adjustment list as indented JSON.
///
/// # Errors
///
/// Returns an error if the list cannot be serialized or written.
pub fn save_adjustments(path: &Path, adjustments: &AdjustmentList) -> Result<(), LevelError> {
    let text = serde_json::to_string_pretty(adjustments).map_err(|err| {
        LevelError::Adjustments {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    fs::write(path, text).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read an adjustment list written by [`save_adjustments`].
///
/// # Errors
///
/// Returns an error if the file is unreadable or not an adjustment list.
pub fn load_adjustments(path: &Path) -> Result<AdjustmentList, LevelError> {
    let text = fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|err| LevelError::Adjustments {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Summary statistics over finite, positive ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; zero for a single value.
    pub stdev: f64,
}

impl RatioStats {
    /// `None` when no usable ratio is present.
    #[must_use]
    pub fn from_ratios(ratios: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut values: Vec<f64> = ratios
            .into_iter()
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let count = values.len();
        let n = usize_to_f64(count);
        let mean = values.iter().sum::<f64>() / n;
        let median = if count % 2 == 1 {
            values[count / 2]
        } else {
            f64::midpoint(values[count / 2 - 1], values[count / 2])
        };
        let stdev = if count > 1 {
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / usize_to_f64(count - 1);
            variance.sqrt()
        } else {
            0.0
        };
        Some(Self {
            count,
            min: values[0],
            max: values[count - 1],
            mean,
            median,
            stdev,
        })
    }

    #[must_use]
    pub fn from_metrics(metrics: &[LevelMetrics]) -> Option<Self> {
        Self::from_ratios(metrics.iter().map(|m| m.ratio))
    }
}

/// Reason a level stands out against the reference statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    TargetLessThanSteps,
    RatioTooLow,
    RatioTooHigh,
    OutsideNormalRange,
}

impl Issue {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TargetLessThanSteps => "target_less_than_steps",
            Self::RatioTooLow => "ratio_too_low",
            Self::RatioTooHigh => "ratio_too_high",
            Self::OutsideNormalRange => "outside_normal_range",
        }
    }
}

/// Config change that moves a flagged level onto the reference curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub config_steps: i64,
    pub config_target: i64,
    pub display_steps: i64,
    pub display_target: i64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbnormalLevel {
    pub level: u32,
    pub issues: Vec<Issue>,
    #[serde(with = "ratio_serde")]
    pub ratio: f64,
    pub display_steps: i64,
    pub display_target: i64,
    pub recommendation: Option<Recommendation>,
}

/// Ratio interpolated from the reference minimum to maximum over the first
/// hundred levels, then held at the maximum.
fn recommend(level: u32, steps: i64, stats: &RatioStats) -> Option<Recommendation> {
    if steps <= 0 {
        return None;
    }
    let progress = (f64::from(level) / 100.0).min(1.0);
    let ratio = (stats.max - stats.min).mul_add(progress, stats.min);
    let display_target = trunc_f64_to_i64(i64_to_f64(steps) * ratio);
    Some(Recommendation {
        config_steps: steps + 10,
        config_target: display_target_to_config(display_target),
        display_steps: steps,
        display_target,
        ratio,
    })
}

/// Compare `current` against reference ratio statistics.
#[must_use]
pub fn find_abnormal(current: &[LevelMetrics], reference: &RatioStats) -> Vec<AbnormalLevel> {
    let low_band = reference.mean - 2.0 * reference.stdev;
    let high_band = reference.mean + 2.0 * reference.stdev;
    current
        .iter()
        .filter_map(|metrics| {
            let ratio = metrics.ratio;
            let mut issues = Vec::new();
            if metrics.display_targets < metrics.display_steps {
                issues.push(Issue::TargetLessThanSteps);
            }
            if ratio < reference.min * 0.5 {
                issues.push(Issue::RatioTooLow);
            }
            if ratio > reference.max * 2.0 {
                issues.push(Issue::RatioTooHigh);
            }
            if (ratio < low_band || ratio > high_band)
                && (ratio < reference.min || ratio > reference.max)
            {
                issues.push(Issue::OutsideNormalRange);
            }
            if issues.is_empty() {
                return None;
            }
            Some(AbnormalLevel {
                level: metrics.level,
                issues,
                ratio,
                display_steps: metrics.display_steps,
                display_target: metrics.display_targets,
                recommendation: recommend(metrics.level, metrics.display_steps, reference),
            })
        })
        .collect()
}

/// Ratio change between neighbouring levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyJump {
    pub from_level: u32,
    pub to_level: u32,
    pub from_ratio: f64,
    pub to_ratio: f64,
    pub change: f64,
}

impl DifficultyJump {
    #[must_use]
    pub fn is_harder(&self) -> bool {
        self.change > 1.0
    }
}

/// Adjacent levels whose ratio grows more than threefold or shrinks below
/// 0.3 of the previous one. Infinite and non-positive ratios are ignored.
#[must_use]
pub fn difficulty_jumps(metrics: &[LevelMetrics]) -> Vec<DifficultyJump> {
    metrics
        .windows(2)
        .filter_map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            if !prev.ratio.is_finite() || !curr.ratio.is_finite() || prev.ratio <= 0.0 {
                return None;
            }
            let change = curr.ratio / prev.ratio;
            (change > 3.0 || change < 0.3).then_some(DifficultyJump {
                from_level: prev.level,
                to_level: curr.level,
                from_ratio: prev.ratio,
                to_ratio: curr.ratio,
                change,
            })
        })
        .collect()
}

/// Ratios are `+inf` when a level shows zero steps; JSON has no infinity, so
/// those are written as `null` and read back as `+inf`.
mod ratio_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ratio: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if ratio.is_finite() {
            serializer.serialize_f64(*ratio)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("m3level-analysis-{label}-{nanos}"));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn metrics(level: u32, move_count: i64, target: i64) -> LevelMetrics {
        LevelMetrics::from_config(level, &LevelConfig::new(move_count, vec![1], vec![target]))
    }

    #[test]
    fn classifies_risk_in_priority_order() {
        assert_eq!(RiskLevel::classify(1, 30.0), RiskLevel::HighRisk);
        assert_eq!(RiskLevel::classify(3, 1.0), RiskLevel::MediumRisk);
        assert_eq!(RiskLevel::classify(5, 1.0), RiskLevel::LowRisk);
        assert_eq!(RiskLevel::classify(8, 6.0), RiskLevel::InsufficientMoves);
        assert_eq!(RiskLevel::classify(12, 8.5), RiskLevel::SevereExcessTargets);
        assert_eq!(RiskLevel::classify(12, 5.0), RiskLevel::ExcessTargets);
        assert_eq!(RiskLevel::classify(12, 0.4), RiskLevel::TooFewTargets);
        assert_eq!(RiskLevel::classify(12, 2.0), RiskLevel::Normal);
        assert!(!RiskLevel::Normal.is_problem());
    }

    #[test]
    fn metrics_use_summed_targets() {
        let cfg = LevelConfig::new(30, vec![1, 2], vec![20, 15]);
        let m = LevelMetrics::from_config(9, &cfg);
        assert_eq!(m.display_steps, 20);
        assert_eq!(m.config_targets, 35);
        assert_eq!(m.display_targets, 45);
        assert!((m.ratio - 2.25).abs() < 1e-9);
        assert_eq!(m.risk, RiskLevel::Normal);
        assert_eq!(m.suggestion(), None);
    }

    #[test]
    fn suggestions_follow_risk() {
        // One step, 25 + 10 = 35 targets: 35 / 3 = 11 steps.
        let high = metrics(1, 1, 25);
        assert_eq!(
            high.suggestion(),
            Some(Suggestion::SetMoveCount {
                move_count: 21,
                display_steps: 11
            })
        );
        let excess = metrics(2, 25, 70);
        assert_eq!(excess.risk, RiskLevel::ExcessTargets);
        assert_eq!(
            excess.suggestion(),
            Some(Suggestion::ReduceTargets { display_target: 45 })
        );
    }

    #[test]
    fn ratio_stats_use_sample_deviation() {
        let stats = RatioStats::from_ratios([1.0, 2.0, 3.0, 4.0, f64::INFINITY, 0.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 2.5).abs() < 1e-9);
        assert!((stats.median - 2.5).abs() < 1e-9);
        assert!((stats.stdev - 1.290_994_448_7).abs() < 1e-6);
        assert!(RatioStats::from_ratios([f64::INFINITY]).is_none());
        let single = RatioStats::from_ratios([2.0]).unwrap();
        assert!(single.stdev.abs() < f64::EPSILON);
    }

    #[test]
    fn abnormal_levels_carry_issues_and_recommendation() {
        let reference = RatioStats::from_ratios([1.5, 2.0, 2.5]).unwrap();
        let current = vec![metrics(50, 30, 20), metrics(51, 30, 110), metrics(60, 60, 5)];
        let abnormal = find_abnormal(&current, &reference);
        assert_eq!(abnormal.len(), 2);
        assert_eq!(abnormal[0].level, 51);
        assert!(abnormal[0].issues.contains(&Issue::RatioTooHigh));
        assert_eq!(abnormal[1].level, 60);
        assert!(abnormal[1].issues.contains(&Issue::TargetLessThanSteps));
        assert!(abnormal[1].issues.contains(&Issue::RatioTooLow));
        let rec = abnormal[1].recommendation.unwrap();
        assert_eq!(rec.display_steps, 50);
        assert_eq!(rec.config_steps, 60);
        assert!((rec.ratio - 2.1).abs() < 1e-9);
        assert_eq!(rec.display_target, 105);
        assert_eq!(rec.config_target, 95);
    }

    #[test]
    fn detects_difficulty_jumps() {
        let list = vec![
            metrics(1, 30, 20),
            metrics(2, 30, 90),
            metrics(3, 0, 10),
            metrics(4, 30, 10),
        ];
        let jumps = difficulty_jumps(&list);
        assert_eq!(jumps.len(), 1);
        assert_eq!((jumps[0].from_level, jumps[0].to_level), (1, 2));
        assert!(jumps[0].is_harder());
    }

    #[test]
    fn scan_flags_and_persists_adjustments() {
        let dir = temp_dir("scan");
        let store = LevelStore::new(&dir);
        store.save(1, &LevelConfig::new(30, vec![1], vec![20])).unwrap();
        store.save(2, &LevelConfig::new(22, vec![1], vec![80])).unwrap();
        store.save(3, &LevelConfig::new(22, vec![1], Vec::new())).unwrap();
        let outcome = scan_ratios(&store, LevelRange::new(1, 5), 5.0, 4.5);
        assert_eq!(outcome.checked, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.adjustments.len(), 1);
        let adjustment = &outcome.adjustments[0];
        assert_eq!(adjustment.level, 2);
        assert_eq!(adjustment.new_move_count, 30);
        assert!(adjustment.new_ratio() <= 4.5);

        let path = dir.join("levels_to_adjust.json");
        save_adjustments(&path, &outcome.adjustments).unwrap();
        assert_eq!(load_adjustments(&path).unwrap(), outcome.adjustments);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn infinite_ratio_survives_json() {
        let adjustment = Adjustment {
            level: 4,
            current_move_count: 0,
            current_steps: 0,
            current_targets: 40,
            current_ratio: f64::INFINITY,
            new_move_count: 9,
            new_steps: 9,
        };
        let text = serde_json::to_string(&adjustment).unwrap();
        assert!(text.contains("\"current_ratio\":null"));
        let back: Adjustment = serde_json::from_str(&text).unwrap();
        assert!(back.current_ratio.is_infinite());
    }

    #[test]
    fn load_rejects_non_lists() {
        let dir = temp_dir("badlist");
        let path = dir.join("list.json");
        fs::write(&path, "{\"level\":1}").unwrap();
        assert!(matches!(
            load_adjustments(&path),
            Err(LevelError::Adjustments { .. })
        ));
        fs::remove_dir_all(dir).ok();
    }
}
