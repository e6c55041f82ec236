//! Persisted analysis records

pub mod analysis;

pub use analysis::{
    AbsoluteHeightMetrics, AnalysisMode, AnalysisStoreError, Metrics, MetrologyAnalysis,
    SourceFile,
};
