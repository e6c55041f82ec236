//! Analysis configuration
//!
//! Every section defaults independently, so a config file only needs the
//! values it changes:
//!
//! ```yaml
//! fit:
//!   nsigma: 3.5
//! absolute_height:
//!   tolerance: { nominal: 0.0, low: -9.0, high: 9.0 }
//! ```

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::fit::DEFAULT_MAX_ITERATIONS;
use crate::core::residuals::DEFAULT_QUANTILES;
use crate::core::tolerance::ToleranceBand;
use crate::yaml::{parse_yaml, parse_yaml_file, YamlError};

/// Configuration errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Yaml(#[from] YamlError),

    #[error("invalid value for {field}: {message}")]
    #[diagnostic(code(metrology::config::invalid))]
    Invalid { field: &'static str, message: String },
}

/// Robust plane fit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Clip width of the iterative fit
    pub nsigma: f64,
    /// Cap on clip-and-refit iterations
    pub max_iterations: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            nsigma: 4.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Residual clip and quantile settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidualConfig {
    pub nsigma: f64,
    pub quantiles: Vec<f64>,
}

impl Default for ResidualConfig {
    fn default() -> Self {
        Self {
            nsigma: 5.0,
            quantiles: DEFAULT_QUANTILES.to_vec(),
        }
    }
}

/// Nominal sensor heights (µm) per vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZnomConfig {
    #[serde(rename = "ITL")]
    pub itl: f64,
    #[serde(rename = "e2v")]
    pub e2v: f64,
}

impl Default for ZnomConfig {
    fn default() -> Self {
        Self {
            itl: 12998.0,
            e2v: 13000.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsoluteHeightConfig {
    pub znom: ZnomConfig,
    pub tolerance: ToleranceBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaConfig {
    /// Clip width of the per-scan stdev used to rank scans
    pub nsigma: f64,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self { nsigma: 4.0 }
    }
}

/// Top-level analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub fit: FitConfig,
    pub residuals: ResidualConfig,
    pub absolute_height: AbsoluteHeightConfig,
    pub delta: DeltaConfig,
}

impl AnalysisConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = parse_yaml(content, "<config>")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = parse_yaml_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_nsigma("fit.nsigma", self.fit.nsigma)?;
        check_nsigma("residuals.nsigma", self.residuals.nsigma)?;
        check_nsigma("delta.nsigma", self.delta.nsigma)?;

        if self.fit.max_iterations < 2 {
            return Err(ConfigError::Invalid {
                field: "fit.max_iterations",
                message: "must be at least 2; convergence compares two refits".to_string(),
            });
        }
        if self.residuals.quantiles.is_empty() {
            return Err(ConfigError::Invalid {
                field: "residuals.quantiles",
                message: "at least one level is required".to_string(),
            });
        }
        if let Some(q) = self
            .residuals
            .quantiles
            .iter()
            .find(|q| !(0.0..=1.0).contains(*q))
        {
            return Err(ConfigError::Invalid {
                field: "residuals.quantiles",
                message: format!("level {} is outside [0, 1]", q),
            });
        }
        Ok(())
    }
}

fn check_nsigma(field: &'static str, nsigma: f64) -> Result<(), ConfigError> {
    if nsigma.is_finite() && nsigma > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("clip width must be positive, got {}", nsigma),
        })
    }
}
