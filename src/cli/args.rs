//! Command-line arguments

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::cli::commands::abs_height::AbsHeightArgs;
use crate::cli::commands::completions::CompletionsArgs;
use crate::cli::commands::delta::DeltaArgs;
use crate::cli::commands::flatness::FlatnessArgs;
use crate::cli::commands::report::ReportArgs;

/// Metrology data analysis: flatness and absolute height of scanned surfaces
#[derive(Parser, Debug)]
#[command(name = "metrology", version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Analysis configuration file (YAML)
    #[arg(long, global = true, env = "METROLOGY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output format for results printed to stdout
    #[arg(short = 'o', long, global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table on a terminal, YAML when piped
    Auto,
    Yaml,
    Json,
    Table,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Flatness: residuals against the robust best-fit plane
    Flatness(FlatnessArgs),

    /// Absolute height: residuals against the nominal sensor height
    #[command(name = "abs-height")]
    AbsHeight(AbsHeightArgs),

    /// Thermal flatness delta between the best warm and cold scans
    Delta(DeltaArgs),

    /// Show a saved analysis record
    Report(ReportArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Scan inputs shared by the analysis commands
#[derive(clap::Args, Debug, Clone)]
pub struct ScanArgs {
    /// Scan files, concatenated in the order given
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Sensor or raft identifier used to name output files
    #[arg(long, short = 'u')]
    pub unit_id: String,

    /// Scanner file format
    #[arg(long, short = 'f', value_enum, ignore_case = true, default_value = "OGP")]
    pub format: crate::formats::MetrologyFormat,

    /// Directory for residual and quantile table files
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Save the full analysis record (JSON for .json, YAML otherwise)
    #[arg(long)]
    pub persist: Option<PathBuf>,
}

/// Terminal renderings of the residuals
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Show a histogram of the clipped residuals
    #[arg(long)]
    pub histogram: bool,

    /// Number of histogram bins
    #[arg(long, default_value_t = 20)]
    pub bins: usize,

    /// Show a plan view of points above the reference plane
    #[arg(long)]
    pub surface: bool,
}
