//! Warm/cold scan selection for thermal flatness deltas

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{MetrologyError, MetrologyResult};
use crate::core::fit::RobustPlaneFitter;
use crate::core::point_cloud::PointCloud;
use crate::core::stats::ClipStats;

/// Per-scan inputs to the warm/cold selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub path: PathBuf,
    /// Temperature in °C taken from the file name
    pub temperature: f64,
    /// Stdev of the once-clipped residuals against the scan's own fit
    pub clipped_stdev: f64,
}

/// Scans picked for the delta analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaSelection {
    pub warm: ScanSummary,
    pub cold: ScanSummary,
    /// Every scan considered, in input order
    pub scans: Vec<ScanSummary>,
}

/// Temperature encoded as the last `_` piece of the file stem, e.g.
/// `RSA-002_scan_20180412_-40C.csv` → `-40`
pub fn parse_temperature(path: &Path) -> Option<f64> {
    let stem = path.file_stem()?.to_str()?;
    let last = stem.rsplit('_').next()?;
    let end = last.find('C')?;
    last[..end].trim().parse().ok()
}

/// Stdev of a scan's residuals against its robust fit after one clip pass
pub fn clipped_stdev(
    cloud: &PointCloud,
    fitter: &RobustPlaneFitter,
    nsigma: f64,
) -> MetrologyResult<f64> {
    if !(nsigma.is_finite() && nsigma > 0.0) {
        return Err(MetrologyError::InvalidClipWidth(nsigma));
    }
    let fit = fitter.fit(cloud)?;
    let dz: Vec<f64> = cloud
        .points()
        .map(|[x, y, z]| z - fit.plane.at(x, y))
        .collect();
    let stats = ClipStats::clipped_once(&dz, nsigma).ok_or(MetrologyError::EmptyResiduals)?;
    debug!(points = dz.len(), stdev = stats.stdev, "scan clipped stdev");
    Ok(stats.stdev)
}

/// Indices of the best warm and best cold scans
///
/// Warm is the lowest clipped stdev among the scans at the maximum
/// temperature, cold likewise at the minimum; ties go to the earlier scan.
pub fn select_warm_cold(scans: &[ScanSummary]) -> Option<(usize, usize)> {
    let first = scans.first()?;
    let (t_min, t_max) = scans
        .iter()
        .fold((first.temperature, first.temperature), |(lo, hi), s| {
            (lo.min(s.temperature), hi.max(s.temperature))
        });

    let best_at = |temperature: f64| {
        scans
            .iter()
            .enumerate()
            .filter(|(_, s)| s.temperature == temperature)
            .fold(None, |best: Option<(usize, f64)>, (i, s)| match best {
                Some((_, stdev)) if stdev <= s.clipped_stdev => best,
                _ => Some((i, s.clipped_stdev)),
            })
            .map(|(i, _)| i)
    };

    Some((best_at(t_max)?, best_at(t_min)?))
}
