pub mod commands;
pub mod reports;

pub use commands::{
    analyze_levels, generate_curve, load_curve_config, require_config_dir, show_levels,
};
pub use reports::{ReportFormat, ScanReport, write_report};
