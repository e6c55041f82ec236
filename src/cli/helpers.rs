//! Shared helper functions for CLI commands

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use console::style;
use miette::{IntoDiagnostic, Result};
use tracing::info;

use crate::cli::viz::{
    render_histogram, render_quantile_bar, render_surface_map, MAP_HEIGHT, MAP_WIDTH,
};
use crate::cli::{GlobalOpts, RenderArgs};
use crate::core::config::AnalysisConfig;
use crate::entities::analysis::MetrologyAnalysis;

pub const RESIDUALS_SUFFIX: &str = "residuals.txt";
pub const QUANTILE_TABLE_SUFFIX: &str = "quantile_table.txt";

/// Config from `--config` (or `METROLOGY_CONFIG`), defaults otherwise
pub fn load_config(global: &GlobalOpts) -> Result<AnalysisConfig> {
    match &global.config {
        Some(path) => {
            let config = AnalysisConfig::load(path)?;
            info!(path = %path.display(), "loaded analysis config");
            Ok(config)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Write the residual and quantile table files, returning their paths
pub fn write_outputs(record: &MetrologyAnalysis, out_dir: &Path) -> Result<[PathBuf; 2]> {
    fs::create_dir_all(out_dir).into_diagnostic()?;

    let residuals = out_dir.join(record.output_name(RESIDUALS_SUFFIX));
    write_buffered(&residuals, |out| record.write_residuals(out, 1)).into_diagnostic()?;

    let table = out_dir.join(record.output_name(QUANTILE_TABLE_SUFFIX));
    write_buffered(&table, |out| record.write_quantile_table(out)).into_diagnostic()?;

    info!(residuals = %residuals.display(), table = %table.display(), "wrote outputs");
    Ok([residuals, table])
}

/// Create `path` and write it through a buffer that is flushed before returning
fn write_buffered<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut out = BufWriter::new(File::create(path)?);
    write(&mut out)?;
    out.flush()
}

/// Save the full record when `--persist` was given
pub fn persist(record: &MetrologyAnalysis, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        record.save(path).into_diagnostic()?;
        eprintln!(
            "{} Saved analysis to {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }
    Ok(())
}

/// Report written files on stderr so stdout stays parseable
pub fn report_written(paths: &[PathBuf]) {
    for path in paths {
        eprintln!("{} Wrote {}", style("✓").green(), style(path.display()).cyan());
    }
}

/// Reject render options that cannot produce output
pub fn check_render(render: &RenderArgs) -> Result<()> {
    if render.histogram && render.bins == 0 {
        return Err(miette::miette!("--bins must be at least 1"));
    }
    Ok(())
}

/// Terminal renderings requested by `--histogram` / `--surface`
pub fn render_extras(record: &MetrologyAnalysis, render: &RenderArgs) {
    if render.histogram {
        let clipped = record.clipped_residuals();
        let stats = record.reference.clipped_stats().unwrap_or(record.reference.window);
        println!();
        println!(
            "{}",
            render_histogram(&clipped, render.bins, &stats, record.reference.nsigma)
        );
        println!("{}", render_quantile_bar(&record.quantiles.clipped));
    }
    if render.surface {
        println!();
        println!(
            "{}",
            render_surface_map(record.residual_points(), MAP_WIDTH, MAP_HEIGHT)
        );
    }
}

/// Outputs common to every analysis command
pub fn finish(
    record: &MetrologyAnalysis,
    out_dir: &Path,
    persist_to: Option<&Path>,
    render: &RenderArgs,
    global: &GlobalOpts,
) -> Result<()> {
    check_render(render)?;
    let written = write_outputs(record, out_dir)?;
    report_written(&written);
    persist(record, persist_to)?;
    crate::cli::output::print_analysis(record, global.output)?;
    render_extras(record, render);
    Ok(())
}
