//! Typed view of one level's JSON document.
//!
//! Only the fields the maintenance tooling edits are typed; every other key
//! (both at the top level and inside map layers) is kept in an `extra` map and
//! written back untouched.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::display::{DisplayPair, config_to_display};

/// Errors raised while loading, editing or saving level documents.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level {level}: config file not found at {}", path.display())]
    Missing { level: u32, path: PathBuf },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level {level}: malformed level JSON: {source}")]
    Json {
        level: u32,
        #[source]
        source: serde_json::Error,
    },
    #[error("level {level}: mapData has no layers")]
    MissingLayer { level: u32 },
    #[error("level {level}: no target counts in m_ct")]
    EmptyTargets { level: u32 },
    #[error("level {level}: reference level is required but was not provided")]
    MissingReference { level: u32 },
    #[error("level {level}: target ratio {value} must be positive and finite")]
    InvalidRatio { level: u32, value: f64 },
    #[error("adjustment list {}: {message}", path.display())]
    Adjustments { path: PathBuf, message: String },
}

/// One entry of `mapData`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapLayer {
    /// Target type identifiers, one per win-condition slot.
    #[serde(default)]
    pub m_id: Vec<i64>,
    /// Required count per slot. Legacy files often hold a single aggregate.
    #[serde(default)]
    pub m_ct: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m_mk: Option<Vec<i64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapLayer {
    /// `m_id` lists more slots than `m_ct` has counts for.
    #[must_use]
    pub fn target_slot_mismatch(&self) -> bool {
        self.m_id.len() > 1 && self.m_ct.len() < self.m_id.len()
    }
}

/// A level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    #[serde(rename = "moveCount")]
    pub move_count: i64,
    #[serde(rename = "mapData", default, skip_serializing_if = "Vec::is_empty")]
    pub map_data: Vec<MapLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<i64>>,
    #[serde(
        rename = "blockRatio",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub block_ratio: Option<Vec<i64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LevelConfig {
    /// Minimal document with one layer, mostly for tests and generators.
    #[must_use]
    pub fn new(move_count: i64, m_id: Vec<i64>, m_ct: Vec<i64>) -> Self {
        Self {
            move_count,
            map_data: vec![MapLayer {
                m_id,
                m_ct,
                ..MapLayer::default()
            }],
            scores: None,
            block_ratio: None,
            extra: Map::new(),
        }
    }

    /// Parse a level document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or `moveCount` is missing or
    /// not an integer.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Compact form used when rewriting level files in place.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_compact_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Two-space indented form used for backups.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Layer 0, the only layer the tooling edits.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::MissingLayer`] when `mapData` is empty.
    pub fn primary_layer(&self, level: u32) -> Result<&MapLayer, LevelError> {
        self.map_data
            .first()
            .ok_or(LevelError::MissingLayer { level })
    }

    /// Mutable layer 0.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::MissingLayer`] when `mapData` is empty.
    pub fn primary_layer_mut(&mut self, level: u32) -> Result<&mut MapLayer, LevelError> {
        self.map_data
            .first_mut()
            .ok_or(LevelError::MissingLayer { level })
    }

    /// First count of layer 0, or 0 when absent.
    #[must_use]
    pub fn primary_target(&self) -> i64 {
        self.map_data
            .first()
            .and_then(|layer| layer.m_ct.first())
            .copied()
            .unwrap_or(0)
    }

    /// First count of layer 0, failing when the level records none.
    ///
    /// # Errors
    ///
    /// Returns an error when there is no layer or `m_ct` is empty.
    pub fn require_primary_target(&self, level: u32) -> Result<i64, LevelError> {
        self.primary_layer(level)?
            .m_ct
            .first()
            .copied()
            .ok_or(LevelError::EmptyTargets { level })
    }

    /// Sum of every `m_ct` entry over all layers.
    #[must_use]
    pub fn target_total(&self) -> i64 {
        self.map_data
            .iter()
            .flat_map(|layer| layer.m_ct.iter())
            .sum()
    }

    /// Display pair from `moveCount` and the primary target count.
    #[must_use]
    pub fn display(&self) -> DisplayPair {
        config_to_display(self.move_count, self.primary_target())
    }

    /// Display pair from `moveCount` and the summed target counts.
    #[must_use]
    pub fn display_total(&self) -> DisplayPair {
        config_to_display(self.move_count, self.target_total())
    }

    /// Layer 0 lists more target slots than counts.
    #[must_use]
    pub fn target_slot_mismatch(&self) -> bool {
        self.map_data
            .first()
            .is_some_and(MapLayer::target_slot_mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"moveCount":30,"blockCount":5,"mapData":[{"m_id":[1,2],"m_ct":[50],"m_mk":[3,4],"tiles":[[0,1],[1,0]]}],"scores":[1000,2000,3000],"blockRatio":[50,60,70],"version":2}"#;

    #[test]
    fn parses_known_and_unknown_fields() {
        let cfg = LevelConfig::from_json(SAMPLE).unwrap();
        assert_eq!(cfg.move_count, 30);
        assert_eq!(cfg.scores.as_deref(), Some(&[1000, 2000, 3000][..]));
        assert_eq!(cfg.extra.get("blockCount"), Some(&Value::from(5)));
        let layer = cfg.primary_layer(1).unwrap();
        assert_eq!(layer.m_mk.as_deref(), Some(&[3, 4][..]));
        assert!(layer.extra.contains_key("tiles"));
    }

    #[test]
    fn round_trip_keeps_unknown_keys() {
        let cfg = LevelConfig::from_json(SAMPLE).unwrap();
        let text = cfg.to_compact_json().unwrap();
        let reparsed: Value = serde_json::from_str(&text).unwrap();
        let original: Value = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(reparsed, original);
        assert!(!text.contains(' '));
    }

    #[test]
    fn pretty_output_is_indented() {
        let cfg = LevelConfig::new(20, vec![1], vec![12]);
        let text = cfg.to_pretty_json().unwrap();
        assert!(text.contains("\n  \"moveCount\": 20"));
    }

    #[test]
    fn missing_move_count_is_rejected() {
        assert!(LevelConfig::from_json(r#"{"mapData":[]}"#).is_err());
        assert!(LevelConfig::from_json(r#"{"moveCount":"ten"}"#).is_err());
    }

    #[test]
    fn empty_map_data_reports_missing_layer() {
        let cfg = LevelConfig::from_json(r#"{"moveCount":12}"#).unwrap();
        assert!(matches!(
            cfg.primary_layer(7),
            Err(LevelError::MissingLayer { level: 7 })
        ));
        assert_eq!(cfg.primary_target(), 0);
        assert!(!cfg.target_slot_mismatch());
    }

    #[test]
    fn empty_targets_are_reported() {
        let cfg = LevelConfig::new(12, vec![4], Vec::new());
        assert!(matches!(
            cfg.require_primary_target(3),
            Err(LevelError::EmptyTargets { level: 3 })
        ));
    }

    #[test]
    fn display_pairs_follow_transform() {
        let cfg = LevelConfig::new(30, vec![1], vec![20]);
        assert_eq!(cfg.display(), DisplayPair::new(20, 30));
        let multi = LevelConfig::new(25, vec![1, 2], vec![20, 15]);
        assert_eq!(multi.display(), DisplayPair::new(15, 30));
        assert_eq!(multi.display_total(), DisplayPair::new(15, 45));
    }

    #[test]
    fn detects_slot_mismatch() {
        assert!(LevelConfig::new(30, vec![1, 2], vec![50]).target_slot_mismatch());
        assert!(!LevelConfig::new(30, vec![1, 2], vec![25, 25]).target_slot_mismatch());
        assert!(!LevelConfig::new(30, vec![1], Vec::new()).target_slot_mismatch());
    }
}
