//! `metrology report` command - show a saved analysis record

use std::path::PathBuf;

use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{check_render, render_extras};
use crate::cli::output::print_analysis;
use crate::cli::{GlobalOpts, RenderArgs};
use crate::entities::analysis::MetrologyAnalysis;

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    /// Record written by `--persist`
    pub file: PathBuf,

    #[command(flatten)]
    pub render: RenderArgs,
}

pub fn run(args: ReportArgs, global: &GlobalOpts) -> Result<()> {
    check_render(&args.render)?;
    let record = MetrologyAnalysis::load(&args.file).into_diagnostic()?;
    print_analysis(&record, global.output)?;
    render_extras(&record, &args.render);
    Ok(())
}
