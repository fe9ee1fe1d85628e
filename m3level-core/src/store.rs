//! Flat directory of `<level>.json` documents.

use std::fmt;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::level::{LevelConfig, LevelError};

/// Errors raised while parsing a level range argument.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeParseError {
    #[error("level range is empty")]
    Empty,
    #[error("invalid level number '{0}'")]
    InvalidNumber(String),
    #[error("level numbers start at 1")]
    Zero,
    #[error("level range start {start} is after end {end}")]
    Inverted { start: u32, end: u32 },
}

/// Inclusive band of level numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelRange {
    pub start: u32,
    pub end: u32,
}

impl LevelRange {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn single(level: u32) -> Self {
        Self::new(level, level)
    }

    #[must_use]
    pub const fn levels(self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    #[must_use]
    pub const fn contains(self, level: u32) -> bool {
        level >= self.start && level <= self.end
    }

    #[must_use]
    pub const fn len(self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl Default for LevelRange {
    fn default() -> Self {
        Self::new(1, 1700)
    }
}

impl fmt::Display for LevelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

fn parse_level(raw: &str) -> Result<u32, RangeParseError> {
    let trimmed = raw.trim();
    let level = trimmed
        .parse::<u32>()
        .map_err(|_| RangeParseError::InvalidNumber(trimmed.to_string()))?;
    if level == 0 {
        return Err(RangeParseError::Zero);
    }
    Ok(level)
}

impl FromStr for LevelRange {
    type Err = RangeParseError;

    /// Accepts `N`, `A-B` and `A..=B` (inclusive) and `A..B` (half-open).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RangeParseError::Empty);
        }
        let (start, end) = if let Some((a, b)) = trimmed.split_once("..=") {
            (parse_level(a)?, parse_level(b)?)
        } else if let Some((a, b)) = trimmed.split_once("..") {
            let start = parse_level(a)?;
            let end = parse_level(b)?;
            if end <= start {
                return Err(RangeParseError::Inverted { start, end });
            }
            (start, end - 1)
        } else if let Some((a, b)) = trimmed.split_once('-') {
            (parse_level(a)?, parse_level(b)?)
        } else {
            let level = parse_level(trimmed)?;
            (level, level)
        };
        if start > end {
            return Err(RangeParseError::Inverted { start, end });
        }
        Ok(Self::new(start, end))
    }
}

/// Level documents stored as `<dir>/<level>.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStore {
    dir: PathBuf,
}

impl LevelStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, level: u32) -> PathBuf {
        self.dir.join(format!("{level}.json"))
    }

    #[must_use]
    pub fn exists(&self, level: u32) -> bool {
        self.path_for(level).is_file()
    }

    /// Levels in `range` that have a file.
    #[must_use]
    pub fn levels_present(&self, range: LevelRange) -> Vec<u32> {
        range.levels().filter(|level| self.exists(*level)).collect()
    }

    /// Read and parse one level.
    ///
    /// # Errors
    ///
    /// [`LevelError::Missing`] when the file does not exist, otherwise I/O or
    /// JSON errors.
    pub fn load(&self, level: u32) -> Result<LevelConfig, LevelError> {
        let path = self.path_for(level);
        if !path.is_file() {
            return Err(LevelError::Missing { level, path });
        }
        let text = fs::read_to_string(&path).map_err(|source| LevelError::Io {
            path: path.clone(),
            source,
        })?;
        LevelConfig::from_json(&text).map_err(|source| LevelError::Json { level, source })
    }

    /// Rewrite one level in compact form. The document is fully serialized
    /// before the file is touched.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, level: u32, config: &LevelConfig) -> Result<(), LevelError> {
        let text = config
            .to_compact_json()
            .map_err(|source| LevelError::Json { level, source })?;
        let path = self.path_for(level);
        fs::write(&path, text).map_err(|source| LevelError::Io { path, source })
    }

    /// Write a pretty copy of `config` into `backup_dir` unless a backup for
    /// the level already exists. Returns whether a file was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the write fails.
    pub fn backup_to(
        backup_dir: &Path,
        level: u32,
        config: &LevelConfig,
    ) -> Result<bool, LevelError> {
        fs::create_dir_all(backup_dir).map_err(|source| LevelError::Io {
            path: backup_dir.to_path_buf(),
            source,
        })?;
        let path = backup_dir.join(format!("{level}.json"));
        if path.exists() {
            return Ok(false);
        }
        let text = config
            .to_pretty_json()
            .map_err(|source| LevelError::Json { level, source })?;
        fs::write(&path, text).map_err(|source| LevelError::Io { path, source })?;
        Ok(true)
    }
}
