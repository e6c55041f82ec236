//! `metrology flatness` command - residuals against the robust best-fit plane

use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{finish, load_config};
use crate::cli::{GlobalOpts, RenderArgs, ScanArgs};
use crate::core::session::AnalysisSession;

#[derive(clap::Args, Debug)]
pub struct FlatnessArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Clip width of the iterative plane fit (overrides config)
    #[arg(long)]
    pub nsigma: Option<f64>,

    /// Clip width of the residual statistics (overrides config)
    #[arg(long)]
    pub clip_nsigma: Option<f64>,

    #[command(flatten)]
    pub render: RenderArgs,
}

pub fn run(args: FlatnessArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = load_config(global)?;
    if let Some(nsigma) = args.nsigma {
        config.fit.nsigma = nsigma;
    }
    if let Some(nsigma) = args.clip_nsigma {
        config.residuals.nsigma = nsigma;
    }
    config.validate()?;

    let session = AnalysisSession::new(config);
    let record = session
        .flatness(&args.scan.unit_id, args.scan.format, &args.scan.files)
        .into_diagnostic()?;

    finish(
        &record,
        &args.scan.out_dir,
        args.scan.persist.as_deref(),
        &args.render,
        global,
    )
}
