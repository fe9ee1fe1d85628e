mod common;
mod logic;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;

use common::split_csv;
use logic::{
    ReportFormat, ScanReport, analyze_levels, generate_curve, load_curve_config,
    require_config_dir, show_levels, write_report,
};
use m3level_core::{
    BatchRunner, BatchSummary, LevelOutcome, LevelRange, LevelStore, MigrationKind,
    ReferenceField, RescaleMode, SimilarityAuditor, SplitMode, load_adjustments,
    save_adjustments, scan_assets, scan_ratios,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SplitArg {
    /// Split the total evenly across slots
    Even,
    /// Seeded random weights per slot
    Weighted,
}

impl From<SplitArg> for SplitMode {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Even => Self::Even,
            SplitArg::Weighted => Self::Weighted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    /// Copy steps and targets through the display transform
    Targets,
    /// Copy raw moveCount and m_mk
    Marks,
}

impl From<FieldArg> for ReferenceField {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Targets => Self::Targets,
            FieldArg::Marks => Self::Marks,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print stored and display values for each level
    Show,
    /// Add display steps to every level
    AddSteps {
        #[arg(long, default_value_t = 5, allow_hyphen_values = true)]
        delta: i64,
    },
    /// Force every level to the given display steps and target
    SetDisplay {
        #[arg(long)]
        steps: i64,
        #[arg(long)]
        target: i64,
    },
    /// Find levels above a ratio and write an adjustment list
    ScanRatio {
        #[arg(long, default_value_t = 5.0)]
        threshold: f64,
        #[arg(long, default_value_t = 4.5)]
        target_ratio: f64,
        #[arg(long, default_value = "ratio_adjustments.json")]
        list: PathBuf,
    },
    /// Apply a previously written adjustment list
    ApplyAdjustments {
        #[arg(long, default_value = "ratio_adjustments.json")]
        list: PathBuf,
    },
    /// Raise moveCount wherever the ratio exceeds the threshold
    CapRatio {
        #[arg(long, default_value_t = 5.0)]
        threshold: f64,
        #[arg(long, default_value_t = 4.5)]
        target_ratio: f64,
    },
    /// Make m_ct match m_id slot for slot
    RepairTargets {
        #[arg(long, value_enum, default_value_t = SplitArg::Even)]
        split: SplitArg,
        /// Also re-split levels whose slot counts already match
        #[arg(long)]
        rebalance: bool,
    },
    /// Randomly rescale steps and targets
    Rescale {
        /// Pick easier or harder per level before rescaling
        #[arg(long)]
        directed: bool,
    },
    /// Copy values from the reference project
    FromReference {
        #[arg(long, value_enum, default_value_t = FieldArg::Targets)]
        field: FieldArg,
    },
    /// Generate a difficulty curve, optionally writing it into the levels
    Generate {
        /// JSON curve config; the stock curve is used when omitted
        #[arg(long)]
        curve_config: Option<PathBuf>,
        #[arg(long)]
        apply: bool,
    },
    /// Difficulty analysis with risk classes and jumps
    Analyze,
    /// Compare two project trees for copied code and images
    Similarity {
        #[arg(long)]
        left: PathBuf,
        #[arg(long)]
        right: PathBuf,
        /// Code extensions to compare (comma-separated)
        #[arg(long, default_value = "ts")]
        extensions: String,
    },
    /// Find image and audio assets no script refers to
    Assets {
        #[arg(long, default_value = "assets/res")]
        asset_dir: PathBuf,
        /// Source roots to search (comma-separated)
        #[arg(long, default_value = "assets/scripts")]
        sources: String,
    },
}

#[derive(Debug, Parser)]
#[command(name = "m3level-tool", version = "0.1.0")]
#[command(about = "Batch maintenance for match-3 level configuration files")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding `<level>.json` files
    #[arg(long, global = true, default_value = "assets/resources/config")]
    config_dir: PathBuf,

    /// Reference project config directory
    #[arg(long, global = true)]
    reference_dir: Option<PathBuf>,

    /// Levels to process: N, A-B, A..=B or A..B
    #[arg(long, global = true, default_value = "1-1700")]
    levels: LevelRange,

    /// Seed for every randomized policy
    #[arg(long, global = true, default_value_t = 12345)]
    seed: u64,

    /// Output report format
    #[arg(long, global = true, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Print one line per level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Report changes without writing level files
    #[arg(long, global = true)]
    dry_run: bool,

    /// Keep a pristine copy of each level before its first rewrite
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    if shows_banner(args) {
        announce_banner(args);
    }

    let mut output_target = OutputTarget::new(args.output.clone())?;

    match &args.command {
        Command::Similarity {
            left,
            right,
            extensions,
        } => {
            let report = SimilarityAuditor::new(left.clone(), right.clone())
                .with_extensions(split_csv(extensions))
                .run()
                .context("similarity audit failed")?;
            write_report(output_target.writer(), args.report, &report)?;
        }
        Command::Assets { asset_dir, sources } => {
            let roots: Vec<PathBuf> = split_csv(sources).into_iter().map(PathBuf::from).collect();
            let inventory = scan_assets(asset_dir, &roots).context("asset scan failed")?;
            write_report(output_target.writer(), args.report, &inventory)?;
        }
        Command::Generate {
            curve_config,
            apply,
        } => {
            let config = load_curve_config(curve_config.as_deref())?;
            let runner = if *apply {
                Some(build_runner(args, open_store(args)?))
            } else {
                None
            };
            let report = generate_curve(config, args.seed, args.levels, runner.as_ref())?;
            if let Some(applied) = &report.applied {
                finish_batch(args, applied);
            }
            write_report(output_target.writer(), args.report, &report)?;
        }
        Command::Show => {
            let report = show_levels(&open_store(args)?, args.levels);
            write_report(output_target.writer(), args.report, &report)?;
        }
        Command::Analyze => {
            let reference = reference_store(args);
            let report = analyze_levels(&open_store(args)?, args.levels, reference.as_ref());
            write_report(output_target.writer(), args.report, &report)?;
        }
        Command::ScanRatio {
            threshold,
            target_ratio,
            list,
        } => {
            check_ratio("--threshold", *threshold)?;
            check_ratio("--target-ratio", *target_ratio)?;
            let outcome = scan_ratios(&open_store(args)?, args.levels, *threshold, *target_ratio);
            save_adjustments(list, &outcome.adjustments)
                .with_context(|| format!("failed to write {}", list.display()))?;
            let report = ScanReport {
                list_path: list.display().to_string(),
                outcome: &outcome,
            };
            write_report(output_target.writer(), args.report, &report)?;
        }
        Command::ApplyAdjustments { list } => {
            let runner = build_runner(args, open_store(args)?);
            let adjustments = load_adjustments(list)
                .with_context(|| format!("failed to read adjustment list {}", list.display()))?;
            let summary = runner.apply_adjustments(&adjustments);
            finish_batch(args, &summary);
            write_report(output_target.writer(), args.report, &summary)?;
        }
        Command::AddSteps { .. }
        | Command::SetDisplay { .. }
        | Command::CapRatio { .. }
        | Command::RepairTargets { .. }
        | Command::Rescale { .. }
        | Command::FromReference { .. } => {
            let summary = run_migration(args)?;
            write_report(output_target.writer(), args.report, &summary)?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

fn shows_banner(args: &Args) -> bool {
    !(args.report == ReportFormat::Json && args.output.is_none())
}

/// Progress lines share stdout with the banner, or go to stderr when stdout
/// carries the JSON report.
fn status(args: &Args, line: &str) {
    if shows_banner(args) {
        println!("{line}");
    } else {
        eprintln!("{line}");
    }
}

fn check_ratio(flag: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        bail!("{flag} must be a positive number, got {value}");
    }
    Ok(())
}

fn announce_banner(args: &Args) {
    println!("{}", "🍬 Match-3 Level Tool".bright_cyan().bold());
    println!("{}", "=====================".cyan());
    if args.dry_run {
        println!("{}", "🧪 Dry run: level files will not be written".yellow());
    }
}

fn open_store(args: &Args) -> Result<LevelStore> {
    let store = LevelStore::new(args.config_dir.clone());
    require_config_dir(&store)?;
    Ok(store)
}

fn reference_store(args: &Args) -> Option<LevelStore> {
    args.reference_dir
        .as_ref()
        .map(|dir| LevelStore::new(dir.clone()))
}

fn build_runner(args: &Args, store: LevelStore) -> BatchRunner {
    BatchRunner::new(store)
        .with_reference(reference_store(args))
        .with_dry_run(args.dry_run)
        .with_backup_dir(args.backup_dir.clone())
}

fn migration_kind(command: &Command) -> Option<MigrationKind> {
    match *command {
        Command::AddSteps { delta } => Some(MigrationKind::AddSteps { delta }),
        Command::SetDisplay { steps, target } => Some(MigrationKind::SetDisplay { steps, target }),
        Command::CapRatio {
            threshold,
            target_ratio,
        } => Some(MigrationKind::CapRatio {
            threshold,
            target_ratio,
        }),
        Command::RepairTargets { split, rebalance } => Some(MigrationKind::RepairTargets {
            mode: split.into(),
            rebalance_existing: rebalance,
        }),
        Command::Rescale { directed } => Some(MigrationKind::Rescale {
            mode: if directed {
                RescaleMode::Directed
            } else {
                RescaleMode::Symmetric
            },
        }),
        Command::FromReference { field } => Some(MigrationKind::FromReference {
            field: field.into(),
        }),
        _ => None,
    }
}

fn run_migration(args: &Args) -> Result<BatchSummary> {
    let Some(kind) = migration_kind(&args.command) else {
        bail!("{:?} is not a level migration", args.command);
    };
    if matches!(kind, MigrationKind::FromReference { .. }) && args.reference_dir.is_none() {
        bail!("from-reference needs --reference-dir");
    }
    if let MigrationKind::CapRatio {
        threshold,
        target_ratio,
    } = kind
    {
        check_ratio("--threshold", threshold)?;
        check_ratio("--target-ratio", target_ratio)?;
    }
    let runner = build_runner(args, open_store(args)?);
    status(
        args,
        &format!(
            "{} {} over levels {}",
            "🔧".bold(),
            kind.label().bright_yellow().bold(),
            args.levels
        ),
    );
    let policy = kind.create(args.seed);
    let summary = runner.run(args.levels, policy.as_ref());
    finish_batch(args, &summary);
    Ok(summary)
}

fn finish_batch(args: &Args, summary: &BatchSummary) {
    if args.verbose {
        print_level_lines(args, summary);
    }
    // A console or Markdown report on stdout already ends with the tally.
    if args.output.is_some() || !shows_banner(args) {
        status(
            args,
            &format!(
                "🏁 {} updated, {} unchanged, {} skipped, {} failed ({:.1}% success)",
                summary.updated(),
                summary.unchanged(),
                summary.skipped(),
                summary.failed(),
                summary.success_rate()
            ),
        );
    }
}

fn print_level_lines(args: &Args, summary: &BatchSummary) {
    for report in &summary.levels {
        match &report.outcome {
            LevelOutcome::Updated { change } => status(
                args,
                &format!(
                    "✅ Level {}: {}/{} -> {}/{} ({})",
                    report.level,
                    change.before.steps,
                    change.before.target,
                    change.after.steps.to_string().green(),
                    change.after.target.to_string().green(),
                    change.description
                ),
            ),
            LevelOutcome::Unchanged { change } => {
                status(args, &format!("➖ Level {}: {}", report.level, change.description));
            }
            LevelOutcome::Skipped { reason } => {
                status(args, &format!("⏭️  Level {}: {}", report.level, reason.yellow()));
            }
            LevelOutcome::Failed { error } => {
                eprintln!("❌ Level {}: {}", report.level, error.red());
            }
        }
    }
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
