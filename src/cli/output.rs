//! Output formatting utilities

use std::io::IsTerminal;

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::OutputFormat;
use crate::core::fit::FitResult;
use crate::core::plane::PlaneModel;
use crate::core::residuals::QuantileTables;
use crate::core::stats::ClipStats;
use crate::entities::analysis::{AnalysisMode, Metrics, MetrologyAnalysis};

/// Determine the effective output format based on context
pub fn effective_format(format: OutputFormat) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if std::io::stdout().is_terminal() {
                OutputFormat::Table
            } else {
                OutputFormat::Yaml
            }
        }
        other => other,
    }
}

/// Record contents worth printing; residual arrays stay in the files
#[derive(Debug, Serialize)]
pub struct AnalysisSummary<'a> {
    pub unit_id: &'a str,
    pub mode: AnalysisMode,
    pub points: usize,
    pub plane: PlaneModel,
    pub z_offset: f64,
    pub clip: ClipStats,
    pub clipped_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitSummary>,
    pub metrics: &'a Metrics,
    pub quantiles: &'a QuantileTables,
}

#[derive(Debug, Serialize)]
pub struct FitSummary {
    pub nsigma: f64,
    pub iterations: usize,
    pub inliers: usize,
    pub mean_filt: f64,
    pub stdev_filt: f64,
}

impl FitSummary {
    fn of(fit: &FitResult) -> Self {
        Self {
            nsigma: fit.nsigma,
            iterations: fit.iterations,
            inliers: fit.inliers.len(),
            mean_filt: fit.mean_filt(),
            stdev_filt: fit.stdev_filt(),
        }
    }
}

impl<'a> AnalysisSummary<'a> {
    pub fn of(record: &'a MetrologyAnalysis) -> Self {
        Self {
            unit_id: &record.unit_id,
            mode: record.mode,
            points: record.cloud.len(),
            plane: record.reference.plane,
            z_offset: record.reference.z_offset,
            clip: record.reference.window,
            clipped_points: record.reference.clipped_index.len(),
            fit: record.fit.as_ref().map(FitSummary::of),
            metrics: &record.metrics,
            quantiles: &record.quantiles,
        }
    }
}

#[derive(Tabled)]
struct QuantileRow {
    #[tabled(rename = "quantile")]
    level: String,
    #[tabled(rename = "z (µm)")]
    raw: String,
    #[tabled(rename = "clipped z (µm)")]
    clipped: String,
}

/// Raw and clipped quantiles side by side, highest level first
pub fn quantile_table(tables: &QuantileTables) -> String {
    let rows: Vec<QuantileRow> = tables
        .raw
        .iter()
        .rev()
        .map(|(key, raw)| QuantileRow {
            level: key.to_string(),
            raw: format!("{:.3}", raw),
            clipped: tables
                .clipped
                .get_key(key)
                .map_or_else(|| "-".to_string(), |v| format!("{:.3}", v)),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print an analysis record in the requested format
pub fn print_analysis(record: &MetrologyAnalysis, format: OutputFormat) -> Result<()> {
    let summary = AnalysisSummary::of(record);
    match effective_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&summary).into_diagnostic()?);
        }
        OutputFormat::Table | OutputFormat::Auto => print_human(&summary),
    }
    Ok(())
}

fn print_human(summary: &AnalysisSummary<'_>) {
    println!(
        "{} {}",
        style(summary.mode.title()).bold().cyan(),
        style(summary.unit_id).bold()
    );
    println!();
    println!(
        "  Reference plane: z = {:.6}·x + {:.6}·y + {:.3}  (offset {:.3} µm)",
        summary.plane.a, summary.plane.b, summary.plane.c, summary.z_offset
    );
    if let Some(fit) = &summary.fit {
        println!(
            "  Robust fit:      {}-sigma, {} iterations, {}/{} inliers, stdev {:.3} µm",
            fit.nsigma, fit.iterations, fit.inliers, summary.points, fit.stdev_filt
        );
    }
    println!(
        "  Residual clip:   mean {:.3} µm, stdev {:.3} µm, {}/{} points kept",
        summary.clip.mean, summary.clip.stdev, summary.clipped_points, summary.points
    );

    let m = summary.metrics;
    if let Some(pv) = m.peak_valley_95 {
        println!("  Peak-valley 95%: {:.3} µm", pv);
    }
    if let Some(pv) = m.peak_valley_100 {
        println!("  Peak-valley:     {:.3} µm", pv);
    }
    if let Some(abs) = &m.absolute_height {
        println!(
            "  Nominal height:  {:.1} µm, mean height {:.3} µm",
            abs.znom, abs.zmean
        );
        let frac = format!("{:.4}", abs.frac_outside);
        let frac = if abs.frac_outside > 0.0 {
            style(frac).yellow()
        } else {
            style(frac).green()
        };
        println!("  Fraction outside tolerance: {}", frac);
    }
    println!();
    println!("{}", quantile_table(summary.quantiles));
}
