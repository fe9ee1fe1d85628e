//! Inventory of image and audio assets that no script or scene mentions.
//!
//! An asset counts as referenced when its file stem appears anywhere in the
//! concatenated text of the source roots. Dynamic loads built from string
//! fragments are invisible to this check, so the unused list is a candidate
//! list for review, not a deletion list.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::numbers::{percent, usize_to_f64};
use crate::similarity::{AuditError, collect_files};

/// Asset file types inventoried.
pub const ASSET_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "mp3", "wav", "ogg"];
/// File types searched for asset names.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "js", "json", "prefab", "scene", "anim", "plist", "fnt"];
/// Unused files at least this large are reported with high confidence.
pub const HIGH_CONFIDENCE_BYTES: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    #[must_use]
    pub const fn for_size(size: u64) -> Self {
        if size >= HIGH_CONFIDENCE_BYTES {
            Self::High
        } else {
            Self::Medium
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFile {
    /// Path relative to the asset root, `/`-separated.
    pub path: String,
    pub file_name: String,
    pub stem: String,
    /// Lowercase, with the leading dot.
    pub extension: String,
    pub size: u64,
}

impl AssetFile {
    #[must_use]
    pub const fn confidence(&self) -> Confidence {
        Confidence::for_size(self.size)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionTally {
    pub count: usize,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetInventory {
    pub asset_root: String,
    /// Sorted by size, largest first.
    pub referenced: Vec<AssetFile>,
    /// Sorted by size, largest first.
    pub unused: Vec<AssetFile>,
    pub referenced_by_extension: BTreeMap<String, ExtensionTally>,
    pub unused_by_extension: BTreeMap<String, ExtensionTally>,
}

impl AssetInventory {
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.referenced.len() + self.unused.len()
    }

    #[must_use]
    pub fn referenced_size(&self) -> u64 {
        self.referenced.iter().map(|file| file.size).sum()
    }

    #[must_use]
    pub fn unused_size(&self) -> u64 {
        self.unused.iter().map(|file| file.size).sum()
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.referenced_size() + self.unused_size()
    }

    #[must_use]
    pub fn unused_percentage(&self) -> f64 {
        percent(self.unused.len(), self.total_files())
    }

    /// Share of total bytes held by unused files.
    #[must_use]
    pub fn savings_percentage(&self) -> f64 {
        let total = self.total_size();
        if total == 0 {
            return 0.0;
        }
        bytes_to_f64(self.unused_size()) / bytes_to_f64(total) * 100.0
    }

    #[must_use]
    pub fn largest_unused(&self, limit: usize) -> &[AssetFile] {
        &self.unused[..limit.min(self.unused.len())]
    }
}

/// Kilobytes for display.
#[must_use]
pub fn kilobytes(size: u64) -> f64 {
    bytes_to_f64(size) / 1024.0
}

fn bytes_to_f64(size: u64) -> f64 {
    usize_to_f64(usize::try_from(size).unwrap_or(usize::MAX))
}

/// Inventory assets under `asset_root` against text found in `source_roots`.
///
/// # Errors
///
/// Returns an error when a root is missing or a file cannot be read.
pub fn scan_assets(
    asset_root: &Path,
    source_roots: &[PathBuf],
) -> Result<AssetInventory, AuditError> {
    if !asset_root.is_dir() {
        return Err(AuditError::NotADirectory {
            path: asset_root.to_path_buf(),
        });
    }
    let corpus = reference_text(source_roots)?;

    let mut inventory = AssetInventory {
        asset_root: asset_root.display().to_string(),
        ..AssetInventory::default()
    };
    for (rel, path) in collect_files(asset_root, ASSET_EXTENSIONS)? {
        let size = fs::metadata(&path)
            .map_err(|source| AuditError::Io {
                path: path.clone(),
                source,
            })?
            .len();
        let asset = asset_file(rel, &path, size);
        let referenced = !asset.stem.is_empty() && corpus.contains(&asset.stem);
        let (list, tallies) = if referenced {
            (&mut inventory.referenced, &mut inventory.referenced_by_extension)
        } else {
            (&mut inventory.unused, &mut inventory.unused_by_extension)
        };
        let tally = tallies.entry(asset.extension.clone()).or_default();
        tally.count += 1;
        tally.size += size;
        list.push(asset);
    }
    inventory.referenced.sort_by(|a, b| b.size.cmp(&a.size));
    inventory.unused.sort_by(|a, b| b.size.cmp(&a.size));
    log::info!(
        "asset inventory: {} files, {} unused ({} bytes)",
        inventory.total_files(),
        inventory.unused.len(),
        inventory.unused_size()
    );
    Ok(inventory)
}

fn asset_file(rel: String, path: &Path, size: u64) -> AssetFile {
    let os_str = |part: Option<&std::ffi::OsStr>| {
        part.map(|value| value.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let extension = os_str(path.extension()).to_ascii_lowercase();
    AssetFile {
        path: rel,
        file_name: os_str(path.file_name()),
        stem: os_str(path.file_stem()),
        extension: format!(".{extension}"),
        size,
    }
}

fn reference_text(source_roots: &[PathBuf]) -> Result<String, AuditError> {
    let mut corpus = String::new();
    for root in source_roots {
        if !root.is_dir() {
            log::warn!("source root {} not found; skipping", root.display());
            continue;
        }
        for path in collect_files(root, SOURCE_EXTENSIONS)?.into_values() {
            let bytes = fs::read(&path).map_err(|source| AuditError::Io {
                path: path.clone(),
                source,
            })?;
            corpus.push_str(&String::from_utf8_lossy(&bytes));
            corpus.push('\n');
        }
    }
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("m3level-assets-{label}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(root: &Path, rel: &str, size: usize) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'x'; size]).unwrap();
    }

    #[test]
    fn confidence_threshold() {
        assert_eq!(Confidence::for_size(5000), Confidence::High);
        assert_eq!(Confidence::for_size(4999), Confidence::Medium);
    }

    #[test]
    fn stems_found_in_sources_are_referenced() {
        let root = temp_dir("tree");
        let assets = root.join("res");
        let scripts = root.join("scripts");
        write(&assets, "ui/button_ok.png", 120);
        write(&assets, "ui/starfield.jpg", 9000);
        write(&assets, "sfx/pop.MP3", 300);
        write(&assets, "ui/notes.txt", 10);
        fs::create_dir_all(&scripts).unwrap();
        fs::write(
            scripts.join("Game.ts"),
            "load('ui/button_ok'); playSound('pop');",
        )
        .unwrap();

        let inventory = scan_assets(&assets, &[scripts, root.join("missing")]).unwrap();
        assert_eq!(inventory.total_files(), 3);
        let used: Vec<&str> = inventory
            .referenced
            .iter()
            .map(|a| a.file_name.as_str())
            .collect();
        assert_eq!(used, vec!["pop.MP3", "button_ok.png"]);
        assert_eq!(inventory.unused.len(), 1);
        assert_eq!(inventory.unused[0].path, "ui/starfield.jpg");
        assert_eq!(inventory.unused[0].confidence(), Confidence::High);
        assert_eq!(inventory.unused_by_extension[".jpg"].size, 9000);
        assert_eq!(inventory.referenced_by_extension[".mp3"].count, 1);
        assert_eq!(inventory.unused_size(), 9000);
        assert_eq!(inventory.total_size(), 9420);
        assert_eq!(inventory.largest_unused(20).len(), 1);

        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn empty_inventory_has_zero_shares() {
        let inventory = AssetInventory::default();
        assert!(inventory.savings_percentage().abs() < f64::EPSILON);
        assert!(inventory.unused_percentage().abs() < f64::EPSILON);
        assert!(inventory.largest_unused(5).is_empty());
    }
}
