//! Originality audit comparing two project trees.
//!
//! Code files are paired by relative path. Byte-identical pairs are detected
//! by SHA-256 digest; the rest are scored with a Ratcliff/Obershelp matcher
//! over comment-stripped tokens and lines. Image files are compared purely by
//! digest, wherever they live in either tree.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

use crate::numbers::{percent, usize_to_f64};

/// Extensions compared as code when none are given.
pub const DEFAULT_CODE_EXTENSIONS: &[&str] = &["ts"];
/// Extensions treated as images, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

static LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"//[^\n]*").expect("line comment regex"));
static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Errors raised while walking or reading audited trees.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },
    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Similarity band of a compared file pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBucket {
    Identical,
    High,
    Moderate,
    Low,
    Different,
}

impl SimilarityBucket {
    /// Band for a non-identical pair scored in percent.
    #[must_use]
    pub fn for_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::High
        } else if score >= 70.0 {
            Self::Moderate
        } else if score >= 50.0 {
            Self::Low
        } else {
            Self::Different
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Identical => "identical",
            Self::High => "highly similar (>=90%)",
            Self::Moderate => "moderately similar (70-90%)",
            Self::Low => "low similarity (50-70%)",
            Self::Different => "different (<50%)",
        }
    }
}

/// Overall originality verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditRisk {
    Critical,
    High,
    Medium,
    Low,
}

impl AuditRisk {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// One file present in both trees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileComparison {
    pub path: String,
    pub similarity: f64,
    pub bucket: SimilarityBucket,
    pub left_size: u64,
    pub right_size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodeStatistics {
    pub total_files: usize,
    pub identical_files: usize,
    pub highly_similar_files: usize,
    pub identical_percentage: f64,
    pub high_similarity_percentage: f64,
    pub left_only_count: usize,
    pub right_only_count: usize,
}

/// Code comparison over paired files.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodeComparison {
    pub files: Vec<FileComparison>,
    pub left_only: Vec<String>,
    pub right_only: Vec<String>,
    pub statistics: CodeStatistics,
}

impl CodeComparison {
    pub fn in_bucket(&self, bucket: SimilarityBucket) -> impl Iterator<Item = &FileComparison> {
        self.files.iter().filter(move |file| file.bucket == bucket)
    }

    #[must_use]
    pub fn bucket_count(&self, bucket: SimilarityBucket) -> usize {
        self.in_bucket(bucket).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedImage {
    pub digest: String,
    pub left_files: Vec<String>,
    pub right_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageOverlap {
    pub left_total: usize,
    pub right_total: usize,
    pub left_unique_digests: usize,
    pub right_unique_digests: usize,
    pub shared: Vec<SharedImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub originality_percentage: f64,
    pub risk_level: AuditRisk,
    pub risk_score: f64,
    pub pass_probability: f64,
}

impl RiskAssessment {
    #[must_use]
    pub fn from_statistics(stats: &CodeStatistics) -> Self {
        let copied = stats.identical_files + stats.highly_similar_files;
        let originality = if stats.total_files == 0 {
            100.0
        } else {
            percent(stats.total_files - copied, stats.total_files)
        };
        let total = usize_to_f64(stats.total_files.max(1));
        let risk_level = if stats.total_files == 0 {
            AuditRisk::Low
        } else if usize_to_f64(stats.identical_files) / total > 0.5 {
            AuditRisk::Critical
        } else if usize_to_f64(copied) / total > 0.3 {
            AuditRisk::High
        } else if usize_to_f64(copied) / total > 0.1 {
            AuditRisk::Medium
        } else {
            AuditRisk::Low
        };
        Self {
            originality_percentage: originality,
            risk_level,
            risk_score: (100.0 - originality).max(0.0),
            pass_probability: (originality - 10.0).clamp(0.0, 100.0),
        }
    }
}

/// Full audit result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityReport {
    pub left_root: String,
    pub right_root: String,
    pub extensions: Vec<String>,
    pub code: CodeComparison,
    pub images: ImageOverlap,
    pub risk: RiskAssessment,
}

impl SimilarityReport {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Compares a left project tree against a right one.
#[derive(Debug, Clone)]
pub struct SimilarityAuditor {
    left: PathBuf,
    right: PathBuf,
    extensions: Vec<String>,
}

impl SimilarityAuditor {
    #[must_use]
    pub fn new(left: impl Into<PathBuf>, right: impl Into<PathBuf>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            extensions: DEFAULT_CODE_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
        }
    }

    /// Replace the code extensions; an empty list keeps the defaults.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        if !extensions.is_empty() {
            self.extensions = extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect();
        }
        self
    }

    /// Run the code and image comparisons.
    ///
    /// # Errors
    ///
    /// Returns an error when either root is not a directory or a file
    /// cannot be read.
    pub fn run(&self) -> Result<SimilarityReport, AuditError> {
        for root in [&self.left, &self.right] {
            if !root.is_dir() {
                return Err(AuditError::NotADirectory { path: root.clone() });
            }
        }
        let code = self.compare_code()?;
        let images = self.compare_images()?;
        let risk = RiskAssessment::from_statistics(&code.statistics);
        log::info!(
            "similarity audit: {} paired files, {} identical, risk {}",
            code.statistics.total_files,
            code.statistics.identical_files,
            risk.risk_level.label()
        );
        Ok(SimilarityReport {
            left_root: self.left.display().to_string(),
            right_root: self.right.display().to_string(),
            extensions: self.extensions.clone(),
            code,
            images,
            risk,
        })
    }

    /// Pair code files by relative path and score each pair.
    ///
    /// # Errors
    ///
    /// Returns an error when a tree cannot be walked or a file read.
    pub fn compare_code(&self) -> Result<CodeComparison, AuditError> {
        let exts: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        let left = collect_files(&self.left, &exts)?;
        let right = collect_files(&self.right, &exts)?;

        let mut comparison = CodeComparison::default();
        for (rel, left_path) in &left {
            let Some(right_path) = right.get(rel) else {
                comparison.left_only.push(rel.clone());
                continue;
            };
            comparison.files.push(compare_pair(rel, left_path, right_path)?);
        }
        comparison.right_only = right
            .keys()
            .filter(|rel| !left.contains_key(*rel))
            .cloned()
            .collect();

        let total = comparison.files.len();
        let identical = comparison.bucket_count(SimilarityBucket::Identical);
        let high = comparison.bucket_count(SimilarityBucket::High);
        comparison.statistics = CodeStatistics {
            total_files: total,
            identical_files: identical,
            highly_similar_files: high,
            identical_percentage: percent(identical, total),
            high_similarity_percentage: percent(high, total),
            left_only_count: comparison.left_only.len(),
            right_only_count: comparison.right_only.len(),
        };
        Ok(comparison)
    }

    /// Digest every image in both trees and list the shared digests.
    ///
    /// # Errors
    ///
    /// Returns an error when a tree cannot be walked or a file read.
    pub fn compare_images(&self) -> Result<ImageOverlap, AuditError> {
        let left = digest_index(&collect_files(&self.left, IMAGE_EXTENSIONS)?)?;
        let right = digest_index(&collect_files(&self.right, IMAGE_EXTENSIONS)?)?;

        let shared = left
            .iter()
            .filter_map(|(digest, left_files)| {
                right.get(digest).map(|right_files| SharedImage {
                    digest: digest.clone(),
                    left_files: left_files.clone(),
                    right_files: right_files.clone(),
                })
            })
            .collect();

        Ok(ImageOverlap {
            left_total: left.values().map(Vec::len).sum(),
            right_total: right.values().map(Vec::len).sum(),
            left_unique_digests: left.len(),
            right_unique_digests: right.len(),
            shared,
        })
    }
}

fn compare_pair(rel: &str, left: &Path, right: &Path) -> Result<FileComparison, AuditError> {
    let left_bytes = read_bytes(left)?;
    let right_bytes = read_bytes(right)?;
    let left_size = u64::try_from(left_bytes.len()).unwrap_or(u64::MAX);
    let right_size = u64::try_from(right_bytes.len()).unwrap_or(u64::MAX);

    if sha256_hex(&left_bytes) == sha256_hex(&right_bytes) {
        return Ok(FileComparison {
            path: rel.to_string(),
            similarity: 100.0,
            bucket: SimilarityBucket::Identical,
            left_size,
            right_size,
        });
    }
    let similarity = text_similarity(
        &String::from_utf8_lossy(&left_bytes),
        &String::from_utf8_lossy(&right_bytes),
    );
    log::debug!("{rel}: {similarity:.1}% similar");
    Ok(FileComparison {
        path: rel.to_string(),
        similarity,
        bucket: SimilarityBucket::for_score(similarity),
        left_size,
        right_size,
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, AuditError> {
    fs::read(path).map_err(|source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Remove `//` and `/* */` comments, keeping line structure.
#[must_use]
pub fn strip_comments(source: &str) -> String {
    let without_line = LINE_COMMENT.replace_all(source, "");
    BLOCK_COMMENT.replace_all(&without_line, "").into_owned()
}

/// Comment-free source with every whitespace run collapsed to one space.
#[must_use]
pub fn normalize_code(source: &str) -> String {
    WHITESPACE
        .replace_all(&strip_comments(source), " ")
        .trim()
        .to_string()
}

/// Mean of token-sequence and line-sequence ratios, in percent. Either side
/// being empty after normalization scores zero.
#[must_use]
pub fn text_similarity(left: &str, right: &str) -> f64 {
    let left_clean = strip_comments(left);
    let right_clean = strip_comments(right);
    let left_tokens: Vec<&str> = left_clean.split_whitespace().collect();
    let right_tokens: Vec<&str> = right_clean.split_whitespace().collect();
    if left_tokens.is_empty() || right_tokens.is_empty() {
        return 0.0;
    }
    let left_lines = non_blank_lines(&left_clean);
    let right_lines = non_blank_lines(&right_clean);
    let token_ratio = sequence_ratio(&left_tokens, &right_tokens);
    let line_ratio = sequence_ratio(&left_lines, &right_lines);
    f64::midpoint(token_ratio, line_ratio) * 100.0
}

fn non_blank_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Ratcliff/Obershelp similarity `2*M / (len(a) + len(b))` where `M` counts
/// elements in recursively found longest common blocks.
#[must_use]
pub fn sequence_ratio<T: Eq + Hash>(a: &[T], b: &[T]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let mut b_index: HashMap<&T, Vec<usize>> = HashMap::new();
    for (j, item) in b.iter().enumerate() {
        b_index.entry(item).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b_index, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    2.0 * usize_to_f64(matched) / usize_to_f64(total)
}

fn longest_match<T: Eq + Hash>(
    a: &[T],
    b_index: &HashMap<&T, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();
    for (i, item) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_runs = HashMap::new();
        if let Some(positions) = b_index.get(item) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let run = j
                    .checked_sub(1)
                    .and_then(|prev| run_lengths.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_runs.insert(j, run);
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            }
        }
        run_lengths = next_runs;
    }
    (best_i, best_j, best_size)
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
}

/// Files under `root` with one of `extensions`, keyed by `/`-separated
/// relative path.
pub(crate) fn collect_files(
    root: &Path,
    extensions: &[&str],
) -> Result<BTreeMap<String, PathBuf>, AuditError> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| AuditError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(rel, entry.into_path());
    }
    Ok(files)
}

fn digest_index(
    files: &BTreeMap<String, PathBuf>,
) -> Result<BTreeMap<String, Vec<String>>, AuditError> {
    let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (rel, path) in files {
        let digest = sha256_hex(&read_bytes(path)?);
        index.entry(digest).or_default().push(rel.clone());
    }
    Ok(index)
}
