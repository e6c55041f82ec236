//! Error types for the plane-fit and residual-statistics engine

use thiserror::Error;

/// Result type alias for core metrology operations
pub type MetrologyResult<T> = Result<T, MetrologyError>;

/// Why an iterative plane fit could not produce a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DivergenceReason {
    #[error("point cloud is empty")]
    EmptyCloud,

    #[error("positions are degenerate (colinear or coincident), normal equations are singular")]
    Degenerate,

    #[error("sigma clip selected no inliers at iteration {iteration}")]
    EmptyInlierSet { iteration: usize },

    #[error("filtered stdev did not settle within {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// Errors raised by the core engine
#[derive(Debug, Error)]
pub enum MetrologyError {
    #[error("coordinate sequences differ in length: x={x}, y={y}, z={z}")]
    ShapeMismatch { x: usize, y: usize, z: usize },

    #[error("plane fit failed: {0}")]
    FitDivergence(DivergenceReason),

    #[error("reference plane not set")]
    ReferenceNotSet,

    #[error("quantile level {0} is outside [0, 1]")]
    InvalidQuantileLevel(f64),

    #[error("clip width must be a positive number of sigma, got {0}")]
    InvalidClipWidth(f64),

    #[error("point cloud is empty")]
    EmptyPointCloud,

    #[error("no residuals available for quantile evaluation")]
    EmptyResiduals,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DivergenceReason> for MetrologyError {
    fn from(reason: DivergenceReason) -> Self {
        MetrologyError::FitDivergence(reason)
    }
}
