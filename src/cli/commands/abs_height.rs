//! `metrology abs-height` command - residuals against the nominal sensor height

use clap::ValueEnum;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{finish, load_config};
use crate::cli::{GlobalOpts, RenderArgs, ScanArgs};
use crate::core::session::{AbsoluteHeightReference, AnalysisSession};
use crate::formats::MetrologyFormat;

/// Sensor vendor whose configured nominal height applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Vendor {
    #[value(name = "ITL")]
    Itl,
    #[value(name = "e2v")]
    E2v,
}

impl From<Vendor> for MetrologyFormat {
    fn from(vendor: Vendor) -> Self {
        match vendor {
            Vendor::Itl => MetrologyFormat::Itl,
            Vendor::E2v => MetrologyFormat::E2v,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct AbsHeightArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Nominal height in µm
    #[arg(long, conflicts_with = "vendor")]
    pub znom: Option<f64>,

    /// Take the nominal height from the config entry of this vendor
    #[arg(long, value_enum, ignore_case = true)]
    pub vendor: Option<Vendor>,

    /// Measure against the gauge-block reference plane instead of a
    /// horizontal plane at the nominal height
    #[arg(long)]
    pub use_reference: bool,

    /// Symmetric tolerance half-width in µm around the configured nominal
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Clip width of the residual statistics (overrides config)
    #[arg(long)]
    pub clip_nsigma: Option<f64>,

    #[command(flatten)]
    pub render: RenderArgs,
}

pub fn run(args: AbsHeightArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = load_config(global)?;
    if let Some(half_width) = args.tolerance {
        let band = config.absolute_height.tolerance;
        config.absolute_height.tolerance = band.with_half_width(half_width);
    }
    if let Some(nsigma) = args.clip_nsigma {
        config.residuals.nsigma = nsigma;
    }
    config.validate()?;

    let session = AnalysisSession::new(config);
    let znom = args
        .znom
        .or_else(|| args.vendor.and_then(|v| session.nominal_height(v.into())));
    let reference = if args.use_reference {
        AbsoluteHeightReference::GaugeBlocks
    } else {
        AbsoluteHeightReference::Nominal
    };

    let record = session
        .absolute_height(
            &args.scan.unit_id,
            args.scan.format,
            &args.scan.files,
            znom,
            reference,
        )
        .into_diagnostic()?;

    finish(
        &record,
        &args.scan.out_dir,
        args.scan.persist.as_deref(),
        &args.render,
        global,
    )
}
