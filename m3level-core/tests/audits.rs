use std::fs;
use std::path::{Path, PathBuf};

use m3level_core::{AuditRisk, Confidence, SimilarityAuditor, SimilarityBucket, scan_assets};

fn temp_path(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "m3level-audits-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, contents).expect("write file");
}

fn seed_project(root: &Path) {
    write(root, "assets/scripts/Board.ts", b"export class Board {\n  size = 9;\n}\n");
    write(root, "assets/scripts/Level.ts", b"export const LEVELS = 1700;\n");
    write(root, "assets/res/candy.png", b"\x89PNG-candy");
}

#[test]
fn identical_trees_are_fully_copied() {
    let left = temp_path("left");
    let right = temp_path("right");
    seed_project(&left);
    seed_project(&right);

    let report = SimilarityAuditor::new(&left, &right).run().expect("audit");
    assert_eq!(report.code.statistics.total_files, 2);
    assert_eq!(report.code.bucket_count(SimilarityBucket::Identical), 2);
    assert!((report.code.statistics.identical_percentage - 100.0).abs() < f64::EPSILON);
    assert_eq!(report.risk.risk_level, AuditRisk::Critical);
    assert!(report.risk.originality_percentage.abs() < f64::EPSILON);
    assert_eq!(report.images.shared.len(), 1);

    fs::remove_dir_all(left).ok();
    fs::remove_dir_all(right).ok();
}

#[test]
fn custom_extensions_widen_the_comparison() {
    let left = temp_path("ext-left");
    let right = temp_path("ext-right");
    seed_project(&left);
    seed_project(&right);
    write(&left, "tools/build.js", b"module.exports = 1;");
    write(&right, "tools/build.js", b"module.exports = 2;");

    let report = SimilarityAuditor::new(&left, &right)
        .with_extensions(vec![".ts".to_string(), "JS".to_string()])
        .run()
        .expect("audit");
    assert_eq!(report.code.statistics.total_files, 3);
    assert_eq!(report.extensions, vec!["ts".to_string(), "js".to_string()]);

    fs::remove_dir_all(left).ok();
    fs::remove_dir_all(right).ok();
}

#[test]
fn assets_named_in_scripts_are_referenced() {
    let root = temp_path("assets");
    seed_project(&root);
    write(&root, "assets/res/unused_bg.jpg", &[0_u8; 6000]);
    write(&root, "assets/res/tiny.gif", &[0_u8; 10]);
    write(
        &root,
        "assets/scripts/Skin.ts",
        b"resources.load('candy', SpriteFrame);",
    );

    let inventory = scan_assets(
        &root.join("assets/res"),
        &[root.join("assets/scripts")],
    )
    .expect("inventory");
    assert_eq!(inventory.referenced.len(), 1);
    assert_eq!(inventory.referenced[0].stem, "candy");
    let unused: Vec<(&str, Confidence)> = inventory
        .unused
        .iter()
        .map(|asset| (asset.file_name.as_str(), asset.confidence()))
        .collect();
    assert_eq!(
        unused,
        vec![
            ("unused_bg.jpg", Confidence::High),
            ("tiny.gif", Confidence::Medium)
        ]
    );

    fs::remove_dir_all(root).ok();
}
