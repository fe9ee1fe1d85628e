//! Sequential batch driver: load, apply one policy, save.
//!
//! A missing file skips the level with a warning; malformed documents and
//! policy errors fail only that level. The run always covers the whole range.

use std::path::PathBuf;

use serde::Serialize;

use crate::analysis::AdjustmentList;
use crate::level::{LevelConfig, LevelError};
use crate::migrate::{Change, Migration};
use crate::numbers::percent;
use crate::store::{LevelRange, LevelStore};

/// Result for one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LevelOutcome {
    Updated { change: Change },
    Unchanged { change: Change },
    Skipped { reason: String },
    Failed { error: String },
}

impl LevelOutcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Updated { .. } => "updated",
            Self::Unchanged { .. } => "unchanged",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub const fn change(&self) -> Option<&Change> {
        match self {
            Self::Updated { change } | Self::Unchanged { change } => Some(change),
            Self::Skipped { .. } | Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub level: u32,
    #[serde(flatten)]
    pub outcome: LevelOutcome,
}

/// Tally for one batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub migration: String,
    pub dry_run: bool,
    pub levels: Vec<LevelReport>,
}

impl BatchSummary {
    fn count(&self, label: &str) -> usize {
        self.levels
            .iter()
            .filter(|report| report.outcome.label() == label)
            .count()
    }

    #[must_use]
    pub fn updated(&self) -> usize {
        self.count("updated")
    }

    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count("unchanged")
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count("failed")
    }

    /// Levels that had a file and were attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.levels.len() - self.skipped()
    }

    /// Share of attempted levels that did not fail, in percent.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        percent(self.updated() + self.unchanged(), self.attempted())
    }

    #[must_use]
    pub fn failures(&self) -> Vec<(u32, &str)> {
        self.levels
            .iter()
            .filter_map(|report| match &report.outcome {
                LevelOutcome::Failed { error } => Some((report.level, error.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Sets `moveCount` to a value computed earlier by the ratio scan.
struct SetMoveCount {
    move_count: i64,
}

impl Migration for SetMoveCount {
    fn name(&self) -> &'static str {
        "apply-adjustments"
    }

    fn apply(
        &self,
        _level: u32,
        config: &mut LevelConfig,
        _reference: Option<&LevelConfig>,
    ) -> Result<Change, LevelError> {
        let before = config.display();
        let original = config.move_count;
        config.move_count = self.move_count;
        Ok(Change::new(
            before,
            config.display(),
            format!("moveCount {original} -> {}", self.move_count),
        ))
    }
}

/// Runs migrations over a [`LevelStore`].
#[derive(Debug, Clone)]
pub struct BatchRunner {
    store: LevelStore,
    reference: Option<LevelStore>,
    dry_run: bool,
    backup_dir: Option<PathBuf>,
}

impl BatchRunner {
    #[must_use]
    pub const fn new(store: LevelStore) -> Self {
        Self {
            store,
            reference: None,
            dry_run: false,
            backup_dir: None,
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Option<LevelStore>) -> Self {
        self.reference = reference;
        self
    }

    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_backup_dir(mut self, backup_dir: Option<PathBuf>) -> Self {
        self.backup_dir = backup_dir;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &LevelStore {
        &self.store
    }

    /// Apply `migration` to every level in `range`.
    pub fn run(&self, range: LevelRange, migration: &dyn Migration) -> BatchSummary {
        log::info!(
            "running {} over levels {range}{}",
            migration.name(),
            if self.dry_run { " (dry run)" } else { "" }
        );
        let levels = range
            .levels()
            .map(|level| LevelReport {
                level,
                outcome: self.run_level(level, migration),
            })
            .collect();
        BatchSummary {
            migration: migration.name().to_string(),
            dry_run: self.dry_run,
            levels,
        }
    }

    /// Write the precomputed move budgets of an adjustment list.
    pub fn apply_adjustments(&self, adjustments: &AdjustmentList) -> BatchSummary {
        log::info!("applying {} adjustments", adjustments.len());
        let levels = adjustments
            .iter()
            .map(|adjustment| LevelReport {
                level: adjustment.level,
                outcome: self.run_level(
                    adjustment.level,
                    &SetMoveCount {
                        move_count: adjustment.new_move_count,
                    },
                ),
            })
            .collect();
        BatchSummary {
            migration: "apply-adjustments".to_string(),
            dry_run: self.dry_run,
            levels,
        }
    }

    fn load_reference(&self, level: u32) -> Result<LevelConfig, LevelOutcome> {
        let Some(reference) = self.reference.as_ref() else {
            let err = LevelError::MissingReference { level };
            log::error!("{err}");
            return Err(LevelOutcome::Failed {
                error: err.to_string(),
            });
        };
        reference.load(level).map_err(|err| match err {
            LevelError::Missing { .. } => {
                log::warn!("reference {err}; skipping");
                LevelOutcome::Skipped {
                    reason: format!("reference {err}"),
                }
            }
            other => {
                log::error!("reference {other}");
                LevelOutcome::Failed {
                    error: format!("reference {other}"),
                }
            }
        })
    }

    /// Load, apply and (unless dry-running) save one level.
    pub fn run_level(&self, level: u32, migration: &dyn Migration) -> LevelOutcome {
        let mut config = match self.store.load(level) {
            Ok(config) => config,
            Err(err @ LevelError::Missing { .. }) => {
                log::warn!("{err}; skipping");
                return LevelOutcome::Skipped {
                    reason: err.to_string(),
                };
            }
            Err(err) => {
                log::error!("{err}");
                return LevelOutcome::Failed {
                    error: err.to_string(),
                };
            }
        };
        let reference = if migration.needs_reference() {
            match self.load_reference(level) {
                Ok(reference) => Some(reference),
                Err(outcome) => return outcome,
            }
        } else {
            None
        };

        let original = config.clone();
        let change = match migration.apply(level, &mut config, reference.as_ref()) {
            Ok(change) => change,
            Err(err) => {
                log::error!("{err}");
                return LevelOutcome::Failed {
                    error: err.to_string(),
                };
            }
        };
        if config == original {
            log::debug!("level {level}: unchanged ({})", change.description);
            return LevelOutcome::Unchanged { change };
        }
        if !self.dry_run
            && let Err(err) = self.persist(level, &original, &config)
        {
            log::error!("{err}");
            return LevelOutcome::Failed {
                error: err.to_string(),
            };
        }
        log::debug!("level {level}: {}", change.description);
        LevelOutcome::Updated { change }
    }

    fn persist(
        &self,
        level: u32,
        original: &LevelConfig,
        updated: &LevelConfig,
    ) -> Result<(), LevelError> {
        if let Some(dir) = self.backup_dir.as_deref() {
            LevelStore::backup_to(dir, level, original)?;
        }
        self.store.save(level, updated)
    }
}
