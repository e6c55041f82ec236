//! Residuals against a reference plane and nearest-rank quantile tables

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{MetrologyError, MetrologyResult};
use crate::core::fit::FitResult;
use crate::core::plane::PlaneModel;
use crate::core::point_cloud::PointCloud;
use crate::core::stats::ClipStats;

/// Quantile levels reported by default, highest first
pub const DEFAULT_QUANTILES: [f64; 11] = [
    1.0, 0.995, 0.990, 0.975, 0.75, 0.5, 0.25, 0.025, 0.01, 0.005, 0.0,
];

/// Quantile level → residual value, keyed by the 3-decimal level string
///
/// Keys between `"0.000"` and `"1.000"` sort lexicographically in numeric
/// order, so iteration runs from the lowest level to the highest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuantileTable(BTreeMap<String, f64>);

impl QuantileTable {
    /// Key under which `level` is stored
    pub fn key(level: f64) -> String {
        format!("{:.3}", level)
    }

    pub fn insert(&mut self, level: f64, value: f64) {
        self.0.insert(Self::key(level), value);
    }

    /// Value at `level` (matched on its 3-decimal key)
    pub fn get(&self, level: f64) -> Option<f64> {
        self.0.get(&Self::key(level)).copied()
    }

    /// Value stored under a literal key such as `"0.975"`
    pub fn get_key(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// (key, value) pairs in ascending level order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `q(high) - q(low)`, e.g. the 95% peak-to-valley for (0.025, 0.975)
    pub fn peak_to_valley(&self, low: f64, high: f64) -> Option<f64> {
        Some(self.get(high)? - self.get(low)?)
    }

    /// Copy with every value moved by `delta`
    pub fn shifted(&self, delta: f64) -> Self {
        Self(self.0.iter().map(|(k, v)| (k.clone(), v + delta)).collect())
    }

    /// Write the table as `quantile     z (um)` rows, highest level first
    pub fn write_to<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "quantile     z (um)")?;
        for (key, value) in self.iter().rev() {
            writeln!(out, " {}   {:12.6}", key, value)?;
        }
        Ok(())
    }
}

/// Raw and sigma-clipped quantile tables from one evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantileTables {
    pub raw: QuantileTable,
    pub clipped: QuantileTable,
}

/// Reference plane and everything derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualSet {
    pub plane: PlaneModel,
    pub z_offset: f64,
    /// `z - plane(x, y) + z_offset` per point, in cloud order
    pub residuals: Vec<f64>,
    /// Indices of residuals inside the clip window
    pub clipped_index: Vec<usize>,
    /// Stats defining the clip window
    pub window: ClipStats,
    pub nsigma: f64,
}

impl ResidualSet {
    /// Residuals inside the clip window, in cloud order
    pub fn clipped(&self) -> Vec<f64> {
        self.clipped_index
            .iter()
            .map(|&i| self.residuals[i])
            .collect()
    }

    /// Mean/stdev of the clipped residuals
    pub fn clipped_stats(&self) -> Option<ClipStats> {
        ClipStats::of_subset(&self.residuals, &self.clipped_index)
    }
}

/// Computes residuals of a point cloud against a reference plane
#[derive(Debug, Clone)]
pub struct ResidualAnalyzer {
    cloud: PointCloud,
    nsigma: f64,
    /// Filtered stats from an earlier estimate, in residual convention
    filtered: Option<ClipStats>,
    reference: Option<ResidualSet>,
}

impl ResidualAnalyzer {
    /// Analyzer clipping residuals at `nsigma`
    pub fn new(cloud: PointCloud, nsigma: f64) -> MetrologyResult<Self> {
        if !(nsigma.is_finite() && nsigma > 0.0) {
            return Err(MetrologyError::InvalidClipWidth(nsigma));
        }
        Ok(Self {
            cloud,
            nsigma,
            filtered: None,
            reference: None,
        })
    }

    /// Reuse the filtered mean/stdev of a robust fit as the clip window
    ///
    /// The fitter measures `model - z`; the analyzer measures
    /// `z - model + offset`, so the mean flips sign here and picks up the
    /// offset in [`set_reference`](Self::set_reference).
    pub fn with_fit(mut self, fit: &FitResult) -> Self {
        self.filtered = Some(ClipStats {
            mean: -fit.filtered.mean,
            stdev: fit.filtered.stdev,
        });
        self
    }

    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    pub fn nsigma(&self) -> f64 {
        self.nsigma
    }

    /// Compute residuals against `plane`, shifted by `z_offset`
    pub fn set_reference(&mut self, plane: PlaneModel, z_offset: f64) -> MetrologyResult<()> {
        if self.cloud.is_empty() {
            return Err(MetrologyError::EmptyPointCloud);
        }

        let residuals: Vec<f64> = self
            .cloud
            .points()
            .map(|[x, y, z]| z - plane.at(x, y) + z_offset)
            .collect();

        let window = match self.filtered {
            Some(prior) => ClipStats {
                mean: prior.mean + z_offset,
                stdev: prior.stdev,
            },
            None => {
                let lazy = ClipStats::clipped_once(&residuals, self.nsigma)
                    .ok_or(MetrologyError::EmptyResiduals)?;
                debug!(
                    mean = lazy.mean,
                    stdev = lazy.stdev,
                    "filtered stats computed from raw residuals"
                );
                lazy
            }
        };
        let clipped_index = window.select(&residuals, self.nsigma);
        debug!(
            points = residuals.len(),
            clipped = clipped_index.len(),
            nsigma = self.nsigma,
            "residuals set"
        );

        self.reference = Some(ResidualSet {
            plane,
            z_offset,
            residuals,
            clipped_index,
            window,
            nsigma: self.nsigma,
        });
        Ok(())
    }

    /// Residual set, or `ReferenceNotSet`
    pub fn reference(&self) -> MetrologyResult<&ResidualSet> {
        self.reference
            .as_ref()
            .ok_or(MetrologyError::ReferenceNotSet)
    }

    /// Consume the analyzer, returning the residual set
    pub fn into_reference(self) -> MetrologyResult<(PointCloud, ResidualSet)> {
        match self.reference {
            Some(set) => Ok((self.cloud, set)),
            None => Err(MetrologyError::ReferenceNotSet),
        }
    }

    pub fn residuals(&self) -> MetrologyResult<&[f64]> {
        Ok(&self.reference()?.residuals)
    }

    pub fn clipped_residuals(&self) -> MetrologyResult<Vec<f64>> {
        Ok(self.reference()?.clipped())
    }

    /// Window used for the residual clip
    pub fn clip_stats(&self) -> MetrologyResult<ClipStats> {
        Ok(self.reference()?.window)
    }

    /// Nearest-rank quantiles of the raw and clipped residuals
    pub fn quantile_table(&self, levels: &[f64]) -> MetrologyResult<QuantileTables> {
        let set = self.reference()?;
        if let Some(&bad) = levels
            .iter()
            .find(|q| !(q.is_finite() && (0.0..=1.0).contains(*q)))
        {
            return Err(MetrologyError::InvalidQuantileLevel(bad));
        }

        Ok(QuantileTables {
            raw: nearest_rank(set.residuals.clone(), levels)?,
            clipped: nearest_rank(set.clipped(), levels)?,
        })
    }

    /// (x, y, residual) triples in cloud order
    pub fn residual_points(&self) -> MetrologyResult<Vec<[f64; 3]>> {
        let set = self.reference()?;
        Ok(self
            .cloud
            .positions()
            .zip(&set.residuals)
            .map(|([x, y], &dz)| [x, y, dz])
            .collect())
    }

    /// Write residuals as a `Contour` block of `x  y  dz mm` lines
    pub fn write_residuals<W: Write>(&self, out: W, contour_id: u32) -> MetrologyResult<()> {
        write_residual_points(out, contour_id, self.residual_points()?)?;
        Ok(())
    }
}

/// Write (x, y, residual) triples in the OGP contour layout
pub fn write_residual_points<W: Write>(
    mut out: W,
    contour_id: u32,
    points: impl IntoIterator<Item = [f64; 3]>,
) -> std::io::Result<()> {
    writeln!(out, "Contour {}", contour_id)?;
    for [x, y, dz] in points {
        writeln!(out, "{:.6}  {:.6}  {:.6} mm", x, y, dz)?;
    }
    Ok(())
}

/// Value at index `min(floor(n·q), n-1)` of the ascending sort, per level
fn nearest_rank(mut values: Vec<f64>, levels: &[f64]) -> MetrologyResult<QuantileTable> {
    if values.is_empty() {
        return Err(MetrologyError::EmptyResiduals);
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();

    let mut table = QuantileTable::default();
    for &q in levels {
        let index = ((n as f64 * q) as usize).min(n - 1);
        table.insert(q, values[index]);
    }
    Ok(table)
}
