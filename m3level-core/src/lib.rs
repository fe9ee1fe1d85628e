//! Match-3 Level Toolkit
//!
//! Platform-agnostic logic for maintaining a match-3 game's per-level JSON
//! configuration: the config/display value transform, target redistribution,
//! migration policies, difficulty analysis, curve generation and project
//! audits. This crate performs no terminal output.

pub mod analysis;
pub mod assets;
pub mod batch;
pub mod curve;
pub mod display;
pub mod level;
pub mod migrate;
pub mod numbers;
pub mod redistribute;
pub mod seed;
pub mod similarity;
pub mod store;

// Re-export commonly used types
pub use analysis::{
    AbnormalLevel, Adjustment, AdjustmentList, DifficultyJump, Issue, LevelMetrics, RatioStats,
    Recommendation, RiskLevel, ScanOutcome, Suggestion, collect_metrics, difficulty_jumps,
    find_abnormal, load_adjustments, save_adjustments, scan_ratios,
};
pub use assets::{AssetFile, AssetInventory, Confidence, ExtensionTally, scan_assets};
pub use batch::{BatchRunner, BatchSummary, LevelOutcome, LevelReport};
pub use curve::{
    ApplyCurve, CurveConfig, CurveConfigError, CurveGenerator, GeneratedLevel, LevelKind,
    StageConfig, StageSummary, summarize,
};
pub use display::{
    DisplayPair, config_to_display, difficulty_ratio, display_steps, display_target,
    display_target_to_config, display_to_config,
};
pub use level::{LevelConfig, LevelError, MapLayer};
pub use migrate::{
    AddSteps, CapRatio, Change, Direction, FromReference, Migration, MigrationKind,
    ReferenceField, RepairTargets, Rescale, RescaleMode, SetDisplay,
};
pub use redistribute::{SplitMode, Strategy, redistribute};
pub use seed::{derive_level_seed, level_rng};
pub use similarity::{AuditError, AuditRisk, SimilarityAuditor, SimilarityBucket, SimilarityReport};
pub use store::{LevelRange, LevelStore, RangeParseError};
