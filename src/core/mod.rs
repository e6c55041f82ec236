//! Core module - plane fitting and residual statistics

pub mod config;
pub mod delta;
pub mod error;
pub mod fit;
pub mod plane;
pub mod point_cloud;
pub mod residuals;
pub mod session;
pub mod stats;
pub mod tolerance;

pub use config::{AnalysisConfig, ConfigError};
pub use delta::{parse_temperature, select_warm_cold, DeltaSelection, ScanSummary};
pub use error::{DivergenceReason, MetrologyError, MetrologyResult};
pub use fit::{FitResult, RobustPlaneFitter};
pub use plane::PlaneModel;
pub use point_cloud::PointCloud;
pub use residuals::{
    QuantileTable, QuantileTables, ResidualAnalyzer, ResidualSet, DEFAULT_QUANTILES,
};
pub use session::{AbsoluteHeightReference, AnalysisSession, SessionError};
pub use stats::ClipStats;
pub use tolerance::{ToleranceBand, ToleranceEvaluator};
