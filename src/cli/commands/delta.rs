//! `metrology delta` command - thermal flatness delta across temperature scans

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{finish, load_config};
use crate::cli::{GlobalOpts, RenderArgs, ScanArgs};
use crate::core::session::AnalysisSession;

#[derive(clap::Args, Debug)]
pub struct DeltaArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Clip width used to rank scans at the same temperature (overrides config)
    #[arg(long)]
    pub rank_nsigma: Option<f64>,

    #[command(flatten)]
    pub render: RenderArgs,
}

pub fn run(args: DeltaArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = load_config(global)?;
    if let Some(nsigma) = args.rank_nsigma {
        config.delta.nsigma = nsigma;
    }
    config.validate()?;

    let session = AnalysisSession::new(config);
    let record = session
        .flatness_delta(&args.scan.unit_id, args.scan.format, &args.scan.files)
        .into_diagnostic()?;

    if let Some(selection) = &record.delta {
        for (label, scan) in [("warm", &selection.warm), ("cold", &selection.cold)] {
            eprintln!(
                "{} {} {} ({} °C, clipped stdev {:.3} µm)",
                style("→").blue(),
                label,
                style(scan.path.display()).cyan(),
                scan.temperature,
                scan.clipped_stdev
            );
        }
    }

    finish(
        &record,
        &args.scan.out_dir,
        args.scan.persist.as_deref(),
        &args.render,
        global,
    )
}
