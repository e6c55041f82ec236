//! Analysis runs: flatness, absolute height and thermal flatness delta
//!
//! A session turns scan files into [`MetrologyAnalysis`] records using the
//! clip widths and quantile levels of its [`AnalysisConfig`].

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::AnalysisConfig;
use crate::core::delta::{
    clipped_stdev, parse_temperature, select_warm_cold, DeltaSelection, ScanSummary,
};
use crate::core::error::MetrologyError;
use crate::core::fit::{FitResult, RobustPlaneFitter};
use crate::core::plane::PlaneModel;
use crate::core::point_cloud::PointCloud;
use crate::core::residuals::{QuantileTables, ResidualAnalyzer, ResidualSet};
use crate::core::tolerance::{ToleranceBand, ToleranceEvaluator};
use crate::entities::analysis::{
    AbsoluteHeightMetrics, AnalysisMode, Metrics, MetrologyAnalysis, SourceFile,
};
use crate::formats::{load_scan, FormatError, MetrologyFormat, ScanData};

/// Errors raised by an analysis run
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Metrology(#[from] MetrologyError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("failed to read {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no temperature in file name {0} (expected ..._<T>C.<ext>)")]
    MissingTemperature(PathBuf),

    #[error("scan has no gauge-block reference points")]
    NoReference,

    #[error("no nominal height for {0}; pass one explicitly")]
    NoNominalHeight(MetrologyFormat),

    #[error("no scan files given")]
    NoInput,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Plane absolute heights are measured against
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbsoluteHeightReference {
    /// Horizontal plane at the nominal height, zero offset
    Nominal,
    /// Robust fit of the gauge-block points, offset by minus the nominal height
    GaugeBlocks,
}

/// Residuals and tables of one analyzed cloud, before they become a record
struct Analyzed {
    cloud: PointCloud,
    set: ResidualSet,
    fit: Option<FitResult>,
    quantiles: QuantileTables,
}

/// Runs analyses with one configuration
#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    config: AnalysisConfig,
}

impl AnalysisSession {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Fitter configured from the `fit` section
    pub fn fitter(&self) -> SessionResult<RobustPlaneFitter> {
        Ok(RobustPlaneFitter::new(self.config.fit.nsigma)?
            .with_max_iterations(self.config.fit.max_iterations))
    }

    /// Nominal sensor height for a scanner format, if the config has one
    pub fn nominal_height(&self, format: MetrologyFormat) -> Option<f64> {
        let znom = &self.config.absolute_height.znom;
        match format {
            MetrologyFormat::Itl => Some(znom.itl),
            MetrologyFormat::E2v => Some(znom.e2v),
            _ => None,
        }
    }

    /// Flatness: residuals against the robust fit of the scanned surface
    pub fn flatness(
        &self,
        unit_id: &str,
        format: MetrologyFormat,
        paths: &[PathBuf],
    ) -> SessionResult<MetrologyAnalysis> {
        let scan = load_scan(non_empty(paths)?, format)?;
        let analyzed = self.fit_and_analyze(scan.sensor)?;
        let mut record = self.record(
            unit_id,
            AnalysisMode::Flatness,
            format,
            sources(paths)?,
            analyzed,
        );
        record.metadata = scan.metadata;
        Ok(record)
    }

    /// Absolute height: residuals against a fixed nominal plane or the
    /// gauge-block reference
    pub fn absolute_height(
        &self,
        unit_id: &str,
        format: MetrologyFormat,
        paths: &[PathBuf],
        znom: Option<f64>,
        reference: AbsoluteHeightReference,
    ) -> SessionResult<MetrologyAnalysis> {
        let znom = znom
            .or_else(|| self.nominal_height(format))
            .ok_or(SessionError::NoNominalHeight(format))?;
        let scan = load_scan(non_empty(paths)?, format)?;
        self.absolute_height_of(unit_id, format, scan, sources(paths)?, znom, reference)
    }

    /// Absolute height of already loaded scan data
    pub fn absolute_height_of(
        &self,
        unit_id: &str,
        format: MetrologyFormat,
        scan: ScanData,
        sources: Vec<SourceFile>,
        znom: f64,
        reference: AbsoluteHeightReference,
    ) -> SessionResult<MetrologyAnalysis> {
        let (plane, z_offset, fit) = match reference {
            AbsoluteHeightReference::Nominal => (PlaneModel::horizontal(znom), 0.0, None),
            AbsoluteHeightReference::GaugeBlocks => {
                let blocks = scan.reference.as_ref().ok_or(SessionError::NoReference)?;
                let fit = self.fitter()?.fit(blocks)?;
                info!(
                    a = fit.plane.a,
                    b = fit.plane.b,
                    c = fit.plane.c,
                    points = blocks.len(),
                    "gauge-block reference plane"
                );
                (fit.plane, -znom, Some(fit))
            }
        };

        let zmean = scan.sensor.mean_z().ok_or(MetrologyError::EmptyPointCloud)?;
        let mut analyzer = ResidualAnalyzer::new(scan.sensor, self.config.residuals.nsigma)?;
        analyzer.set_reference(plane, z_offset)?;
        let quantiles = analyzer.quantile_table(&self.config.residuals.quantiles)?;
        let (cloud, set) = analyzer.into_reference()?;

        let band: ToleranceBand = self.config.absolute_height.tolerance;
        let frac_outside = ToleranceEvaluator::from_table(&quantiles.raw)?.fraction_outside(&band);
        info!(znom, zmean, frac_outside, "absolute height evaluated");

        let analyzed = Analyzed {
            cloud,
            set,
            fit,
            quantiles,
        };
        let mut record =
            self.record(unit_id, AnalysisMode::AbsoluteHeight, format, sources, analyzed);
        record.tolerance = Some(band);
        record.metadata = scan.metadata;
        record.metrics.absolute_height = Some(AbsoluteHeightMetrics {
            dzdx: plane.a,
            dzdy: plane.b,
            z0: plane.c,
            zmean,
            znom,
            frac_outside,
        });
        Ok(record)
    }

    /// Thermal delta: flatness of the best warm scan combined with the best
    /// cold scan
    pub fn flatness_delta(
        &self,
        unit_id: &str,
        format: MetrologyFormat,
        paths: &[PathBuf],
    ) -> SessionResult<MetrologyAnalysis> {
        let reader = format.reader();
        let fitter = self.fitter()?;

        let mut scans = Vec::with_capacity(paths.len());
        let mut summaries = Vec::with_capacity(paths.len());
        for path in non_empty(paths)? {
            let temperature = parse_temperature(path)
                .ok_or_else(|| SessionError::MissingTemperature(path.clone()))?;
            let scan = reader.read_file(path)?;
            let stdev = clipped_stdev(&scan.sensor, &fitter, self.config.delta.nsigma)?;
            info!(path = %path.display(), temperature, stdev, "delta scan summarized");
            summaries.push(ScanSummary {
                path: path.clone(),
                temperature,
                clipped_stdev: stdev,
            });
            scans.push(scan);
        }

        let (warm, cold) = select_warm_cold(&summaries).ok_or(SessionError::NoInput)?;
        info!(
            warm = %summaries[warm].path.display(),
            cold = %summaries[cold].path.display(),
            "selected warm and cold scans"
        );

        let combined = &scans[warm].sensor + &scans[cold].sensor;
        let metadata = scans[warm].metadata.take();
        let analyzed = self.fit_and_analyze(combined)?;
        let used = [summaries[warm].path.clone(), summaries[cold].path.clone()];

        let mut record = self.record(
            unit_id,
            AnalysisMode::FlatnessDelta,
            format,
            sources(&used)?,
            analyzed,
        );
        record.metadata = metadata;
        record.delta = Some(DeltaSelection {
            warm: summaries[warm].clone(),
            cold: summaries[cold].clone(),
            scans: summaries,
        });
        Ok(record)
    }

    /// Robust fit, then residuals against it using the fit's clip window
    fn fit_and_analyze(&self, cloud: PointCloud) -> SessionResult<Analyzed> {
        let fit = self.fitter()?.fit(&cloud)?;
        info!(
            a = fit.plane.a,
            b = fit.plane.b,
            c = fit.plane.c,
            stdev = fit.stdev_filt(),
            rejected = fit.rejected(cloud.len()),
            iterations = fit.iterations,
            "robust plane fit"
        );

        let mut analyzer =
            ResidualAnalyzer::new(cloud, self.config.residuals.nsigma)?.with_fit(&fit);
        analyzer.set_reference(fit.plane, 0.0)?;
        let quantiles = analyzer.quantile_table(&self.config.residuals.quantiles)?;
        let (cloud, set) = analyzer.into_reference()?;
        debug!(clipped = set.clipped_index.len(), "residual clip applied");

        Ok(Analyzed {
            cloud,
            set,
            fit: Some(fit),
            quantiles,
        })
    }

    fn record(
        &self,
        unit_id: &str,
        mode: AnalysisMode,
        format: MetrologyFormat,
        sources: Vec<SourceFile>,
        analyzed: Analyzed,
    ) -> MetrologyAnalysis {
        let metrics = Metrics::from_quantiles(&analyzed.quantiles.raw);
        MetrologyAnalysis {
            unit_id: unit_id.to_string(),
            mode,
            format,
            sources,
            created: Utc::now(),
            cloud: analyzed.cloud,
            reference: analyzed.set,
            fit: analyzed.fit,
            quantiles: analyzed.quantiles,
            tolerance: None,
            metrics,
            metadata: None,
            delta: None,
        }
    }
}

fn non_empty(paths: &[PathBuf]) -> SessionResult<&[PathBuf]> {
    if paths.is_empty() {
        Err(SessionError::NoInput)
    } else {
        Ok(paths)
    }
}

fn sources(paths: &[PathBuf]) -> SessionResult<Vec<SourceFile>> {
    paths.iter().map(|p| source(p)).collect()
}

fn source(path: &Path) -> SessionResult<SourceFile> {
    SourceFile::from_path(path).map_err(|source| SessionError::Source {
        path: path.to_path_buf(),
        source,
    })
}
