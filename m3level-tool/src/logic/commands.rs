use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use m3level_core::display::{
    difficulty_ratio, display_target, display_target_total, display_targets,
};
use m3level_core::{
    AbnormalLevel, ApplyCurve, BatchRunner, BatchSummary, CurveConfig, CurveGenerator,
    DifficultyJump, GeneratedLevel, LevelMetrics, LevelRange, LevelStore, RatioStats, RiskLevel,
    StageSummary, Suggestion, collect_metrics, difficulty_jumps, find_abnormal, summarize,
};

/// One level as printed by `show`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowRow {
    pub level: u32,
    pub move_count: i64,
    pub m_id: Vec<i64>,
    pub m_ct: Vec<i64>,
    pub display_steps: i64,
    /// Display target of the primary slot.
    pub display_target: i64,
    pub slot_display_targets: Vec<i64>,
    pub display_total: i64,
    pub ratio: Option<f64>,
    pub slot_mismatch: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShowReport {
    pub levels: Vec<ShowRow>,
    pub failures: Vec<(u32, String)>,
}

/// Load every present level in `range` for display.
pub fn show_levels(store: &LevelStore, range: LevelRange) -> ShowReport {
    let mut report = ShowReport::default();
    for level in store.levels_present(range) {
        match store.load(level) {
            Ok(config) => {
                let (m_id, m_ct) = config
                    .map_data
                    .first()
                    .map(|layer| (layer.m_id.clone(), layer.m_ct.clone()))
                    .unwrap_or_default();
                let pair = config.display();
                let display_total = display_target_total(&m_ct);
                // Multi-target levels show the sum of per-slot display targets.
                let ratio = if m_ct.len() > 1 {
                    difficulty_ratio(display_total, pair.steps)
                } else {
                    pair.ratio()
                };
                report.levels.push(ShowRow {
                    level,
                    move_count: config.move_count,
                    display_steps: pair.steps,
                    display_target: display_target(config.primary_target()),
                    slot_display_targets: display_targets(&m_ct),
                    display_total,
                    ratio: finite(ratio),
                    slot_mismatch: config.target_slot_mismatch(),
                    m_id,
                    m_ct,
                });
            }
            Err(err) => {
                log::error!("{err}");
                report.failures.push((level, err.to_string()));
            }
        }
    }
    report
}

/// A flagged level with its suggested fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    #[serde(flatten)]
    pub metrics: LevelMetrics,
    pub suggestion: Option<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceComparison {
    pub reference_dir: String,
    pub reference_stats: Option<RatioStats>,
    pub abnormal: Vec<AbnormalLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub range: String,
    pub analyzed: usize,
    pub risk_counts: BTreeMap<RiskLevel, usize>,
    pub stats: Option<RatioStats>,
    pub problems: Vec<Problem>,
    pub jumps: Vec<DifficultyJump>,
    pub reference: Option<ReferenceComparison>,
    pub failures: Vec<(u32, String)>,
}

impl AnalysisReport {
    #[must_use]
    pub fn problem_share(&self) -> f64 {
        m3level_core::numbers::percent(self.problems.len(), self.analyzed)
    }
}

/// Metrics, risk classes and jumps for `range`, optionally compared against a
/// reference project's ratio statistics.
pub fn analyze_levels(
    store: &LevelStore,
    range: LevelRange,
    reference: Option<&LevelStore>,
) -> AnalysisReport {
    let (metrics, failures) = collect_metrics(store, range);
    let mut risk_counts = BTreeMap::new();
    for row in &metrics {
        *risk_counts.entry(row.risk).or_insert(0) += 1;
    }
    let problems = metrics
        .iter()
        .filter(|row| row.risk.is_problem())
        .map(|row| Problem {
            metrics: row.clone(),
            suggestion: row.suggestion(),
        })
        .collect();

    let reference = reference.map(|reference_store| {
        let (reference_metrics, reference_failures) = collect_metrics(reference_store, range);
        if !reference_failures.is_empty() {
            log::warn!(
                "{} reference levels could not be read",
                reference_failures.len()
            );
        }
        let reference_stats = RatioStats::from_metrics(&reference_metrics);
        let abnormal = reference_stats
            .as_ref()
            .map(|stats| find_abnormal(&metrics, stats))
            .unwrap_or_default();
        ReferenceComparison {
            reference_dir: reference_store.dir().display().to_string(),
            reference_stats,
            abnormal,
        }
    });

    AnalysisReport {
        range: range.to_string(),
        analyzed: metrics.len(),
        risk_counts,
        stats: RatioStats::from_metrics(&metrics),
        jumps: difficulty_jumps(&metrics),
        problems,
        reference,
        failures,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveReport {
    pub seed: u64,
    pub levels: Vec<GeneratedLevel>,
    pub stages: Vec<StageSummary>,
    pub applied: Option<BatchSummary>,
}

/// Read a curve config file, or the stock curve when no path is given.
pub fn load_curve_config(path: Option<&Path>) -> Result<CurveConfig> {
    let Some(path) = path else {
        return Ok(CurveConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config = CurveConfig::from_json(&text)
        .with_context(|| format!("failed to parse curve config {}", path.display()))?;
    Ok(config)
}

/// Generate the curve for `range`; when `runner` is given the rows are also
/// written into the existing level files.
pub fn generate_curve(
    config: CurveConfig,
    seed: u64,
    range: LevelRange,
    runner: Option<&BatchRunner>,
) -> Result<CurveReport> {
    let generator = CurveGenerator::new(config, seed).context("invalid curve config")?;
    let levels = generator.generate_range(range);
    let stages = summarize(&levels);
    let applied = runner.map(|runner| runner.run(range, &ApplyCurve::new(levels.clone())));
    Ok(CurveReport {
        seed,
        levels,
        stages,
        applied,
    })
}

/// Refuse to run level commands against a directory that is not there.
pub fn require_config_dir(store: &LevelStore) -> Result<()> {
    if !store.dir().is_dir() {
        bail!("config directory {} not found", store.dir().display());
    }
    Ok(())
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
