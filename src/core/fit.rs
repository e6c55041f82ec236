//! Robust plane fitting by iterative sigma clipping
//!
//! The fit starts from an unweighted least-squares plane over every point,
//! then alternates between selecting the points whose deviation lies within
//! `nsigma` filtered standard deviations of the filtered mean and refitting on
//! that selection. Iteration stops once the filtered standard deviation is
//! bit-for-bit unchanged between two refits.
//!
//! Every solve is linearised about the configured seed, so a refit is a pure
//! function of its inlier set: once the selection repeats, the stdev repeats
//! exactly and the loop terminates. Selections that cycle without settling are
//! cut off by the iteration cap.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{DivergenceReason, MetrologyError, MetrologyResult};
use crate::core::plane::{least_squares, PlaneModel};
use crate::core::point_cloud::PointCloud;
use crate::core::stats::ClipStats;

/// Default cap on clip-and-refit iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Outcome of a converged robust fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Fitted plane
    pub plane: PlaneModel,

    /// Mean/stdev of `model - z` over the final inliers
    pub filtered: ClipStats,

    /// Indices (into the fitted cloud) used for the final solve
    pub inliers: Vec<usize>,

    /// Clip width used
    pub nsigma: f64,

    /// Number of refits performed after the initial solve
    pub iterations: usize,
}

impl FitResult {
    pub fn mean_filt(&self) -> f64 {
        self.filtered.mean
    }

    pub fn stdev_filt(&self) -> f64 {
        self.filtered.stdev
    }

    /// Number of points rejected by the final clip, given the cloud size
    pub fn rejected(&self, cloud_len: usize) -> usize {
        cloud_len.saturating_sub(self.inliers.len())
    }
}

/// Iterative sigma-clipped least-squares plane fitter
#[derive(Debug, Clone)]
pub struct RobustPlaneFitter {
    nsigma: f64,
    seed: PlaneModel,
    max_iterations: usize,
}

impl RobustPlaneFitter {
    /// Fitter clipping at `nsigma` filtered standard deviations
    pub fn new(nsigma: f64) -> MetrologyResult<Self> {
        if !(nsigma.is_finite() && nsigma > 0.0) {
            return Err(MetrologyError::InvalidClipWidth(nsigma));
        }
        Ok(Self {
            nsigma,
            seed: PlaneModel::ORIGIN,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        })
    }

    /// Initial parameter guess (defaults to the origin plane)
    pub fn with_seed(mut self, seed: PlaneModel) -> Self {
        self.seed = seed;
        self
    }

    /// Cap on refits; at least two are needed to observe a stable stdev
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn nsigma(&self) -> f64 {
        self.nsigma
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Fit a plane to `cloud`, excluding outliers by iterative clipping
    pub fn fit(&self, cloud: &PointCloud) -> MetrologyResult<FitResult> {
        if cloud.is_empty() {
            return Err(DivergenceReason::EmptyCloud.into());
        }
        let (positions, z) = cloud.as_fit_input();

        let mut plane = least_squares(&positions, z, 0..z.len(), &self.seed)?;
        let mut dz = deviations(&plane, &positions, z);
        let initial = ClipStats::of(&dz).ok_or(DivergenceReason::EmptyCloud)?;
        let mut inliers = initial.select(&dz, self.nsigma);
        debug!(
            points = z.len(),
            mean = initial.mean,
            stdev = initial.stdev,
            inliers = inliers.len(),
            "initial plane fit"
        );

        let mut previous_stdev: Option<f64> = None;
        for iteration in 1..=self.max_iterations {
            if inliers.is_empty() {
                return Err(DivergenceReason::EmptyInlierSet { iteration }.into());
            }

            plane = least_squares(&positions, z, inliers.iter().copied(), &self.seed)?;
            dz = deviations(&plane, &positions, z);
            let filtered = ClipStats::of_subset(&dz, &inliers)
                .ok_or(DivergenceReason::EmptyInlierSet { iteration })?;
            debug!(
                iteration,
                inliers = inliers.len(),
                mean = filtered.mean,
                stdev = filtered.stdev,
                "clipped refit"
            );

            if previous_stdev == Some(filtered.stdev) {
                return Ok(FitResult {
                    plane,
                    filtered,
                    inliers,
                    nsigma: self.nsigma,
                    iterations: iteration,
                });
            }
            previous_stdev = Some(filtered.stdev);
            inliers = filtered.select(&dz, self.nsigma);
        }

        warn!(
            max_iterations = self.max_iterations,
            "plane fit did not converge"
        );
        Err(DivergenceReason::NotConverged {
            iterations: self.max_iterations,
        }
        .into())
    }
}

/// `model(x, y) - z` for every point
fn deviations(plane: &PlaneModel, positions: &[[f64; 2]], z: &[f64]) -> Vec<f64> {
    positions
        .iter()
        .zip(z)
        .map(|(&[x, y], &zi)| plane.at(x, y) - zi)
        .collect()
}
