//! Analysis record - everything a flatness or absolute height run produced
//!
//! Records are written next to the residual and quantile files so that the
//! `report` command (and downstream tooling) can recompute nothing and still
//! see every number the run derived.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::delta::DeltaSelection;
use crate::core::fit::FitResult;
use crate::core::point_cloud::PointCloud;
use crate::core::residuals::{write_residual_points, QuantileTable, QuantileTables, ResidualSet};
use crate::core::tolerance::ToleranceBand;
use crate::formats::{MetrologyFormat, Ts5Metadata};
use crate::yaml::{parse_yaml_file, YamlError};

/// Errors raised while saving or loading analysis records
#[derive(Debug, Error)]
pub enum AnalysisStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] YamlError),

    #[error("YAML serialization error: {0}")]
    YamlWrite(#[from] serde_yml::Error),
}

/// Kind of analysis a record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Flatness,
    AbsoluteHeight,
    FlatnessDelta,
}

impl AnalysisMode {
    /// Infix of the output file names, e.g. `<id>_abs_height_residuals.txt`
    pub fn file_tag(&self) -> &'static str {
        match self {
            AnalysisMode::Flatness => "flatness",
            AnalysisMode::AbsoluteHeight => "abs_height",
            AnalysisMode::FlatnessDelta => "flatness_delta",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AnalysisMode::Flatness => "Flatness",
            AnalysisMode::AbsoluteHeight => "Absolute Height",
            AnalysisMode::FlatnessDelta => "Flatness (warm - cold)",
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_tag())
    }
}

/// Input file with its SHA-256 digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub sha256: String,
}

impl SourceFile {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            sha256: format!("{:x}", Sha256::digest(&bytes)),
        })
    }
}

/// Absolute height numbers relative to the nominal sensor height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteHeightMetrics {
    pub dzdx: f64,
    pub dzdy: f64,
    pub z0: f64,
    /// Mean measured height of the sensor points
    pub zmean: f64,
    pub znom: f64,
    pub frac_outside: f64,
}

/// Summary numbers derived from the raw quantile table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual_025: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual_975: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_valley_95: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_valley_100: Option<f64>,
    /// Quantile keys, ascending, comma separated
    pub flatness_quantile: String,
    /// Quantile values matching `flatness_quantile`, two decimals
    pub flatness_z: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_height: Option<AbsoluteHeightMetrics>,
}

impl Metrics {
    pub fn from_quantiles(table: &QuantileTable) -> Self {
        let (keys, values): (Vec<&str>, Vec<String>) = table
            .iter()
            .map(|(k, v)| (k, format!("{:.2}", v)))
            .unzip();
        Self {
            residual_025: table.get(0.025),
            residual_975: table.get(0.975),
            peak_valley_95: table.peak_to_valley(0.025, 0.975),
            peak_valley_100: table.peak_to_valley(0.0, 1.0),
            flatness_quantile: keys.join(", "),
            flatness_z: values.join(", "),
            absolute_height: None,
        }
    }
}

/// Persisted result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetrologyAnalysis {
    pub unit_id: String,
    pub mode: AnalysisMode,
    pub format: MetrologyFormat,
    pub sources: Vec<SourceFile>,
    pub created: DateTime<Utc>,

    /// Points the residuals were computed for
    pub cloud: PointCloud,
    /// Reference plane, offset, residuals and clip window
    pub reference: ResidualSet,
    /// Robust fit that produced the reference plane, if one was fitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitResult>,

    pub quantiles: QuantileTables,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<ToleranceBand>,
    pub metrics: Metrics,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Ts5Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaSelection>,
}

impl MetrologyAnalysis {
    pub fn residuals(&self) -> &[f64] {
        &self.reference.residuals
    }

    pub fn clipped_residuals(&self) -> Vec<f64> {
        self.reference.clipped()
    }

    /// (x, y, residual) triples in cloud order
    pub fn residual_points(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.cloud
            .positions()
            .zip(&self.reference.residuals)
            .map(|([x, y], &dz)| [x, y, dz])
    }

    /// `<unit_id>_<mode>_<suffix>`
    pub fn output_name(&self, suffix: &str) -> String {
        format!("{}_{}_{}", self.unit_id, self.mode.file_tag(), suffix)
    }

    pub fn write_residuals<W: Write>(&self, out: W, contour_id: u32) -> std::io::Result<()> {
        write_residual_points(out, contour_id, self.residual_points())
    }

    pub fn write_quantile_table<W: Write>(&self, out: W) -> std::io::Result<()> {
        self.quantiles.raw.write_to(out)
    }

    /// Save as JSON when the extension is `.json`, YAML otherwise
    pub fn save(&self, path: &Path) -> Result<(), AnalysisStoreError> {
        let text = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yml::to_string(self)?
        };
        fs::write(path, text)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, AnalysisStoreError> {
        if is_json(path) {
            let text = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        } else {
            Ok(parse_yaml_file(path)?)
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
