use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use m3level_core::assets::kilobytes;
use m3level_core::{
    AssetInventory, BatchSummary, LevelOutcome, RatioStats, ScanOutcome, SimilarityBucket,
    SimilarityReport, Suggestion,
};

use super::commands::{AnalysisReport, CurveReport, ShowReport};
use crate::common::timestamp;

/// Largest unused assets listed in reports.
const TOP_UNUSED: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored terminal summary
    Console,
    /// Pretty-printed JSON document
    Json,
    /// Markdown document
    Markdown,
}

/// A command result that can be rendered in every report format.
pub trait Report: Serialize {
    fn write_console(&self, out: &mut dyn Write) -> Result<()>;
    fn write_markdown(&self, out: &mut dyn Write) -> Result<()>;
}

pub fn write_report<R: Report>(out: &mut dyn Write, format: ReportFormat, report: &R) -> Result<()> {
    match format {
        ReportFormat::Console => report.write_console(out),
        ReportFormat::Json => generate_json_report(out, report),
        ReportFormat::Markdown => report.write_markdown(out),
    }
}

pub fn generate_json_report<R: Serialize + ?Sized>(out: &mut dyn Write, report: &R) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

fn heading(out: &mut dyn Write, title: &str) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", title.bright_cyan().bold())?;
    writeln!(out, "{}", "=".repeat(title.chars().count()).cyan())?;
    Ok(())
}

fn ratio_text(ratio: f64) -> String {
    if ratio.is_finite() {
        format!("{ratio:.2}")
    } else {
        "inf".to_string()
    }
}

fn stats_line(stats: Option<&RatioStats>) -> String {
    stats.map_or_else(
        || "no usable ratios".to_string(),
        |s| {
            format!(
                "n={} min {:.2} max {:.2} mean {:.2} median {:.2} stdev {:.2}",
                s.count, s.min, s.max, s.mean, s.median, s.stdev
            )
        },
    )
}

fn suggestion_text(suggestion: Option<Suggestion>) -> String {
    match suggestion {
        Some(Suggestion::SetMoveCount {
            move_count,
            display_steps,
        }) => format!("set moveCount to {move_count} ({display_steps} steps)"),
        Some(Suggestion::ReduceTargets { display_target }) => {
            format!("reduce display target to {display_target}")
        }
        Some(Suggestion::RaiseTargets { display_target }) => {
            format!("raise display target to {display_target}")
        }
        None => "-".to_string(),
    }
}

impl Report for BatchSummary {
    fn write_console(&self, out: &mut dyn Write) -> Result<()> {
        let title = if self.dry_run {
            format!("📊 {} Summary (dry run)", self.migration)
        } else {
            format!("📊 {} Summary", self.migration)
        };
        heading(out, &title)?;
        writeln!(out, "Levels: {}", self.levels.len())?;
        writeln!(out, "Updated: {}", self.updated().to_string().green())?;
        writeln!(out, "Unchanged: {}", self.unchanged())?;
        writeln!(out, "Skipped: {}", self.skipped().to_string().yellow())?;
        writeln!(out, "Failed: {}", self.failed().to_string().red())?;
        writeln!(out, "Success rate: {:.1}%", self.success_rate())?;
        let failures = self.failures();
        if !failures.is_empty() {
            writeln!(out, "Failures:")?;
            for (level, error) in failures {
                writeln!(out, "  • level {level}: {}", error.red())?;
            }
        }
        Ok(())
    }

    fn write_markdown(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "# {} Results\n", self.migration)?;
        writeln!(out, "_Generated {}_\n", timestamp())?;
        writeln!(out, "## Summary\n")?;
        writeln!(out, "- **Levels**: {}", self.levels.len())?;
        writeln!(out, "- **Dry run**: {}", self.dry_run)?;
        writeln!(out, "- **Updated**: {}", self.updated())?;
        writeln!(out, "- **Unchanged**: {}", self.unchanged())?;
        writeln!(out, "- **Skipped**: {}", self.skipped())?;
        writeln!(out, "- **Failed**: {}", self.failed())?;
        writeln!(out, "- **Success rate**: {:.1}%\n", self.success_rate())?;

        writeln!(out, "## Levels\n")?;
        writeln!(out, "| Level | Status | Before | After | Note |")?;
        writeln!(out, "|-------|--------|--------|-------|------|")?;
        for report in &self.levels {
            let (before, after, note) = match &report.outcome {
                LevelOutcome::Updated { change } | LevelOutcome::Unchanged { change } => (
                    format!("{}/{}", change.before.steps, change.before.target),
                    format!("{}/{}", change.after.steps, change.after.target),
                    change.description.clone(),
                ),
                LevelOutcome::Skipped { reason } => ("-".into(), "-".into(), reason.clone()),
                LevelOutcome::Failed { error } => ("-".into(), "-".into(), error.clone()),
            };
            writeln!(
                out,
                "| {} | {} | {before} | {after} | {note} |",
                report.level,
                report.outcome.label()
            )?;
        }
        Ok(())
    }
}

impl Report for ShowReport {
    fn write_console(&self, out: &mut dyn Write) -> Result<()> {
        heading(out, "🔍 Level Overview")?;
        if self.levels.is_empty() {
            writeln!(out, "No level files found.")?;
        }
        for row in &self.levels {
            let line = format!(
                "Level {:>4}: moveCount {:>3} m_ct {:?} -> {} steps / {} target (ratio {})",
                row.level,
                row.move_count,
                row.m_ct,
                row.display_steps,
                row.display_target,
                row.ratio.map_or_else(|| "inf".to_string(), ratio_text),
            );
            if row.slot_mismatch {
                writeln!(out, "{} {}", line, "⚠ slot mismatch".yellow())?;
            } else {
                writeln!(out, "{line}")?;
            }
            if row.slot_display_targets.len() > 1 {
                writeln!(
                    out,
                    "            slots {:?} total {}",
                    row.slot_display_targets, row.display_total
                )?;
            }
        }
        for (level, error) in &self.failures {
            writeln!(out, "Level {level:>4}: {}", error.red())?;
        }
        Ok(())
    }

    fn write_markdown(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "# Level Overview\n")?;
        writeln!(out, "_Generated {}_\n", timestamp())?;
        writeln!(
            out,
            "| Level | moveCount | m_id | m_ct | Steps | Target | Slot targets | Ratio |"
        )?;
        writeln!(
            out,
            "|-------|-----------|------|------|-------|--------|--------------|-------|"
        )?;
        for row in &self.levels {
            writeln!(
                out,
                "| {} | {} | {:?} | {:?} | {} | {} | {:?} | {} |",
                row.level,
                row.move_count,
                row.m_id,
                row.m_ct,
                row.display_steps,
                row.display_target,
                row.slot_display_targets,
                row.ratio.map_or_else(|| "inf".to_string(), ratio_text),
            )?;
        }
        if !self.failures.is_empty() {
            writeln!(out, "\n## Unreadable levels\n")?;
            for (level, error) in &self.failures {
                writeln!(out, "- {level}: {error}")?;
            }
        }
        Ok(())
    }
}

/// Scan result together with where its list was written.
#[derive(Debug, Serialize)]
pub struct ScanReport<'a> {
    pub list_path: String,
    #[serde(flatten)]
    pub outcome: &'a ScanOutcome,
}

impl Report for ScanReport<'_> {
    fn write_console(&self, out: &mut dyn Write) -> Result<()> {
        let outcome = self.outcome;
        heading(out, "📐 Ratio Scan")?;
        writeln!(out, "Checked: {}", outcome.checked)?;
        writeln!(
            out,
            "Above {:.1}: {}",
            outcome.threshold,
            outcome.adjustments.len().to_string().yellow()
        )?;
        for adj in &outcome.adjustments {
            writeln!(
                out,
                "  Level {:>4}: {}/{} = {} -> moveCount {} ({} steps, ratio {:.2})",
                adj.level,
                adj.current_targets,
                adj.current_steps,
                ratio_text(adj.current_ratio),
                adj.new_move_count,
                adj.new_steps,
                adj.new_ratio()
            )?;
        }
        for (level, error) in &outcome.failures {
            writeln!(out, "  Level {level:>4}: {}", error.red())?;
        }
        writeln!(out, "Adjustment list: {}", self.list_path)?;
        Ok(())
    }

    fn write_markdown(&self, out: &mut dyn Write) -> Result<()> {
        let outcome = self.outcome;
        writeln!(out, "# Ratio Scan\n")?;
        writeln!(out, "_Generated {}_\n", timestamp())?;
        writeln!(out, "- **Checked**: {}", outcome.checked)?;
        writeln!(out, "- **Threshold**: {:.1}", outcome.threshold)?;
        writeln!(out, "- **Target ratio**: {:.1}", outcome.target_ratio)?;
        writeln!(out, "- **Flagged**: {}", outcome.adjustments.len())?;
        writeln!(out, "- **Adjustment list**: `{}`\n", self.list_path)?;
        writeln!(out, "| Level | moveCount | Steps | Target | Ratio | New moveCount | New ratio |")?;
        writeln!(out, "|-------|-----------|-------|--------|-------|---------------|-----------|")?;
        for adj in &outcome.adjustments {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {:.2} |",
                adj.level,
                adj.current_move_count,
                adj.current_steps,
                adj.current_targets,
                ratio_text(adj.current_ratio),
                adj.new_move_count,
                adj.new_ratio()
            )?;
        }
        Ok(())
    }
}

impl Report for AnalysisReport {
    fn write_console(&self, out: &mut dyn Write) -> Result<()> {
        heading(out, &format!("📈 Difficulty Analysis ({})", self.range))?;
        writeln!(out, "Levels analyzed: {}", self.analyzed)?;
        writeln!(
            out,
            "Problem levels: {} ({:.1}%)",
            self.problems.len().to_string().yellow(),
            self.problem_share()
        )?;
        writeln!(out, "Ratios: {}", stats_line(self.stats.as_ref()))?;
        writeln!(out, "Risk distribution:")?;
        for (risk, count) in &self.risk_counts {
            writeln!(out, "  {:<22} {count}", risk.label())?;
        }

        if !self.problems.is_empty() {
            heading(out, "⚠️  Problem Levels")?;
            for problem in &self.problems {
                let m = &problem.metrics;
                writeln!(
                    out,
                    "Level {:>4}: {} steps / {} target, ratio {} [{}] -> {}",
                    m.level,
                    m.display_steps,
                    m.display_targets,
                    ratio_text(m.ratio),
                    m.risk.label().red(),
                    suggestion_text(problem.suggestion)
                )?;
            }
        }

        if !self.jumps.is_empty() {
            heading(out, "📉 Difficulty Jumps")?;
            for jump in &self.jumps {
                let direction = if jump.is_harder() {
                    "harder".red()
                } else {
                    "easier".green()
                };
                writeln!(
                    out,
                    "Level {} -> {}: {:.2} -> {:.2} (x{:.2}, {direction})",
                    jump.from_level, jump.to_level, jump.from_ratio, jump.to_ratio, jump.change
                )?;
            }
        }

        if let Some(reference) = &self.reference {
            heading(out, "🧭 Reference Comparison")?;
            writeln!(out, "Reference: {}", reference.reference_dir)?;
            writeln!(
                out,
                "Reference ratios: {}",
                stats_line(reference.reference_stats.as_ref())
            )?;
            writeln!(out, "Abnormal levels: {}", reference.abnormal.len())?;
            for row in &reference.abnormal {
                let issues: Vec<&str> = row.issues.iter().map(|issue| issue.label()).collect();
                let fix = row.recommendation.map_or_else(String::new, |rec| {
                    format!(
                        " -> moveCount {} target count {} (ratio {:.2})",
                        rec.config_steps, rec.config_target, rec.ratio
                    )
                });
                writeln!(
                    out,
                    "  Level {:>4}: ratio {} [{}]{fix}",
                    row.level,
                    ratio_text(row.ratio),
                    issues.join(", ")
                )?;
            }
        }

        for (level, error) in &self.failures {
            writeln!(out, "Level {level:>4}: {}", error.red())?;
        }
        Ok(())
    }

    fn write_markdown(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "# Difficulty Analysis\n")?;
        writeln!(out, "_Generated {}_\n", timestamp())?;
        writeln!(out, "## Summary\n")?;
        writeln!(out, "- **Levels**: {}", self.range)?;
        writeln!(out, "- **Analyzed**: {}", self.analyzed)?;
        writeln!(
            out,
            "- **Problem levels**: {} ({:.1}%)",
            self.problems.len(),
            self.problem_share()
        )?;
        writeln!(out, "- **Ratios**: {}\n", stats_line(self.stats.as_ref()))?;

        writeln!(out, "## Risk Distribution\n")?;
        writeln!(out, "| Risk | Levels |")?;
        writeln!(out, "|------|--------|")?;
        for (risk, count) in &self.risk_counts {
            writeln!(out, "| {} | {count} |", risk.label())?;
        }

        writeln!(out, "\n## Problem Levels\n")?;
        if self.problems.is_empty() {
            writeln!(out, "_None._")?;
        } else {
            writeln!(out, "| Level | Steps | Target | Ratio | Risk | Suggestion |")?;
            writeln!(out, "|-------|-------|--------|-------|------|------------|")?;
            for problem in &self.problems {
                let m = &problem.metrics;
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} |",
                    m.level,
                    m.display_steps,
                    m.display_targets,
                    ratio_text(m.ratio),
                    m.risk.label(),
                    suggestion_text(problem.suggestion)
                )?;
            }
        }

        writeln!(out, "\n## Difficulty Jumps\n")?;
        if self.jumps.is_empty() {
            writeln!(out, "_None._")?;
        }
        for jump in &self.jumps {
            writeln!(
                out,
                "- Level {} -> {}: {:.2} -> {:.2} (x{:.2})",
                jump.from_level, jump.to_level, jump.from_ratio, jump.to_ratio, jump.change
            )?;
        }

        if let Some(reference) = &self.reference {
            writeln!(out, "\n## Reference Comparison\n")?;
            writeln!(out, "- **Reference**: `{}`", reference.reference_dir)?;
            writeln!(
                out,
                "- **Reference ratios**: {}\n",
                stats_line(reference.reference_stats.as_ref())
            )?;
            for row in &reference.abnormal {
                let issues: Vec<&str> = row.issues.iter().map(|issue| issue.label()).collect();
                writeln!(
                    out,
                    "- Level {}: ratio {} ({})",
                    row.level,
                    ratio_text(row.ratio),
                    issues.join(", ")
                )?;
            }
        }
        Ok(())
    }
}

impl Report for CurveReport {
    fn write_console(&self, out: &mut dyn Write) -> Result<()> {
        heading(out, &format!("🎢 Difficulty Curve (seed {})", self.seed))?;
        writeln!(out, "Levels generated: {}", self.levels.len())?;
        for stage in &self.stages {
            writeln!(
                out,
                "  {:<9} {:>4} levels  ratio {:.2}-{:.2} (mean {:.2})  target {}-{}  steps {}-{}",
                stage.stage.bold(),
                stage.count,
                stage.min_ratio,
                stage.max_ratio,
                stage.mean_ratio,
                stage.min_target,
                stage.max_target,
                stage.min_steps,
                stage.max_steps
            )?;
        }
        if let Some(applied) = &self.applied {
            applied.write_console(out)?;
        }
        Ok(())
    }

    fn write_markdown(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "# Difficulty Curve\n")?;
        writeln!(out, "_Generated {} with seed {}_\n", timestamp(), self.seed)?;
        writeln!(out, "## Stages\n")?;
        writeln!(out, "| Stage | Levels | Ratio | Mean ratio | Target | Steps |")?;
        writeln!(out, "|-------|--------|-------|------------|--------|-------|")?;
        for stage in &self.stages {
            writeln!(
                out,
                "| {} | {} | {:.2}-{:.2} | {:.2} | {}-{} | {}-{} |",
                stage.stage,
                stage.count,
                stage.min_ratio,
                stage.max_ratio,
                stage.mean_ratio,
                stage.min_target,
                stage.max_target,
                stage.min_steps,
                stage.max_steps
            )?;
        }
        writeln!(out, "\n## Levels\n")?;
        writeln!(out, "| Level | Stage | Kind | Steps | Target | moveCount | Target count | Ratio |")?;
        writeln!(out, "|-------|-------|------|-------|--------|-----------|--------------|-------|")?;
        for row in &self.levels {
            writeln!(
                out,
                "| {} | {} | {:?} | {} | {} | {} | {} | {:.2} |",
                row.level,
                row.stage,
                row.kind,
                row.display_steps,
                row.display_target,
                row.config_steps,
                row.config_target,
                row.ratio
            )?;
        }
        Ok(())
    }
}

impl Report for SimilarityReport {
    fn write_console(&self, out: &mut dyn Write) -> Result<()> {
        let stats = &self.code.statistics;
        heading(out, "🔎 Similarity Audit")?;
        writeln!(out, "Left:  {}", self.left_root)?;
        writeln!(out, "Right: {}", self.right_root)?;
        writeln!(out, "Paired files: {}", stats.total_files)?;
        writeln!(
            out,
            "Identical: {} ({:.1}%)",
            stats.identical_files.to_string().red(),
            stats.identical_percentage
        )?;
        writeln!(
            out,
            "Highly similar: {} ({:.1}%)",
            stats.highly_similar_files.to_string().yellow(),
            stats.high_similarity_percentage
        )?;
        for bucket in [
            SimilarityBucket::Moderate,
            SimilarityBucket::Low,
            SimilarityBucket::Different,
        ] {
            writeln!(out, "{}: {}", bucket.label(), self.code.bucket_count(bucket))?;
        }
        writeln!(
            out,
            "Only in left: {}  Only in right: {}",
            stats.left_only_count, stats.right_only_count
        )?;
        writeln!(
            out,
            "Images: {} left, {} right, {} shared digests",
            self.images.left_total,
            self.images.right_total,
            self.images.shared.len()
        )?;
        writeln!(
            out,
            "Originality: {:.1}%  Risk: {}  Pass probability: {:.1}%",
            self.risk.originality_percentage,
            self.risk.risk_level.label().bold(),
            self.risk.pass_probability
        )?;
        Ok(())
    }

    fn write_markdown(&self, out: &mut dyn Write) -> Result<()> {
        let stats = &self.code.statistics;
        writeln!(out, "# Similarity Audit\n")?;
        writeln!(out, "_Generated {}_\n", timestamp())?;
        writeln!(out, "- **Left**: `{}`", self.left_root)?;
        writeln!(out, "- **Right**: `{}`", self.right_root)?;
        writeln!(out, "- **Extensions**: {}\n", self.extensions.join(", "))?;
        writeln!(out, "## Code\n")?;
        writeln!(out, "- **Paired files**: {}", stats.total_files)?;
        writeln!(
            out,
            "- **Identical**: {} ({:.1}%)",
            stats.identical_files, stats.identical_percentage
        )?;
        writeln!(
            out,
            "- **Highly similar**: {} ({:.1}%)",
            stats.highly_similar_files, stats.high_similarity_percentage
        )?;
        writeln!(out, "- **Only in left**: {}", stats.left_only_count)?;
        writeln!(out, "- **Only in right**: {}\n", stats.right_only_count)?;
        writeln!(out, "| File | Similarity | Band |")?;
        writeln!(out, "|------|------------|------|")?;
        for file in &self.code.files {
            writeln!(
                out,
                "| `{}` | {:.1}% | {} |",
                file.path,
                file.similarity,
                file.bucket.label()
            )?;
        }
        writeln!(out, "\n## Images\n")?;
        writeln!(out, "- **Left images**: {}", self.images.left_total)?;
        writeln!(out, "- **Right images**: {}", self.images.right_total)?;
        writeln!(out, "- **Shared digests**: {}\n", self.images.shared.len())?;
        for shared in &self.images.shared {
            writeln!(
                out,
                "- {}: {} / {}",
                &shared.digest[..12.min(shared.digest.len())],
                shared.left_files.join(", "),
                shared.right_files.join(", ")
            )?;
        }
        writeln!(out, "\n## Risk\n")?;
        writeln!(
            out,
            "- **Originality**: {:.1}%",
            self.risk.originality_percentage
        )?;
        writeln!(out, "- **Risk level**: {}", self.risk.risk_level.label())?;
        writeln!(out, "- **Risk score**: {:.1}", self.risk.risk_score)?;
        writeln!(
            out,
            "- **Pass probability**: {:.1}%",
            self.risk.pass_probability
        )?;
        Ok(())
    }
}

impl Report for AssetInventory {
    fn write_console(&self, out: &mut dyn Write) -> Result<()> {
        heading(out, "🗂️  Asset Inventory")?;
        writeln!(out, "Asset root: {}", self.asset_root)?;
        writeln!(out, "Files: {}", self.total_files())?;
        writeln!(out, "Referenced: {}", self.referenced.len().to_string().green())?;
        writeln!(
            out,
            "Unused: {} ({:.1}%)",
            self.unused.len().to_string().yellow(),
            self.unused_percentage()
        )?;
        writeln!(
            out,
            "Unused size: {:.1} KB of {:.1} KB ({:.1}%)",
            kilobytes(self.unused_size()),
            kilobytes(self.total_size()),
            self.savings_percentage()
        )?;
        for asset in self.largest_unused(TOP_UNUSED) {
            writeln!(
                out,
                "  {:>9} B  {}  [{}]",
                asset.size,
                asset.path,
                asset.confidence().label()
            )?;
        }
        Ok(())
    }

    fn write_markdown(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "# Unused Asset Report\n")?;
        writeln!(out, "_Generated {}_\n", timestamp())?;
        writeln!(out, "## Totals\n")?;
        writeln!(out, "- **Asset files**: {}", self.total_files())?;
        writeln!(
            out,
            "- **Referenced**: {} ({:.1}%)",
            self.referenced.len(),
            100.0 - self.unused_percentage()
        )?;
        writeln!(
            out,
            "- **Unused**: {} ({:.1}%)",
            self.unused.len(),
            self.unused_percentage()
        )?;
        writeln!(
            out,
            "- **Total size**: {} bytes ({:.1} KB)",
            self.total_size(),
            kilobytes(self.total_size())
        )?;
        writeln!(
            out,
            "- **Unused size**: {} bytes ({:.1} KB)",
            self.unused_size(),
            kilobytes(self.unused_size())
        )?;
        writeln!(out, "- **Savings**: {:.1}%\n", self.savings_percentage())?;

        writeln!(out, "## By Type\n")?;
        writeln!(out, "### Unused\n")?;
        for (ext, tally) in &self.unused_by_extension {
            writeln!(
                out,
                "- **{ext}**: {} files, {} bytes ({:.1} KB)",
                tally.count,
                tally.size,
                kilobytes(tally.size)
            )?;
        }
        writeln!(out, "\n### Referenced\n")?;
        for (ext, tally) in &self.referenced_by_extension {
            writeln!(
                out,
                "- **{ext}**: {} files, {} bytes ({:.1} KB)",
                tally.count,
                tally.size,
                kilobytes(tally.size)
            )?;
        }

        writeln!(out, "\n## Largest Unused Files\n")?;
        writeln!(out, "| File | Path | Size | Confidence |")?;
        writeln!(out, "|------|------|------|------------|")?;
        for asset in self.largest_unused(TOP_UNUSED) {
            writeln!(
                out,
                "| {} | `{}` | {} B | {} |",
                asset.file_name,
                asset.path,
                asset.size,
                asset.confidence().label()
            )?;
        }
        Ok(())
    }
}
