//! Scanner file formats
//!
//! Each vendor layout has a [`ScanReader`]; [`MetrologyFormat::reader`] picks
//! the right one. Readers return heights in micrometers.

mod e2v;
mod itl;
mod ogp;
mod ts5;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::core::{MetrologyError, PointCloud};

pub use e2v::E2vReader;
pub use itl::ItlReader;
pub use ogp::{OgpReader, SENSOR_Y_WINDOW};
pub use ts5::{Ts5Metadata, Ts5Reader};

/// Scanner heights are recorded in mm, analysis runs in µm
pub const MM_TO_UM: f64 = 1e3;

/// Errors raised while reading scan files
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unrecognized metrology format: {0}")]
    UnknownFormat(String),

    #[error("no scan points found in {0}")]
    EmptyScan(String),

    #[error(transparent)]
    Shape(#[from] MetrologyError),
}

/// Supported scanner layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum MetrologyFormat {
    /// OGP contour blocks, sensor plus gauge-block reference
    #[value(name = "OGP", alias = "ogp")]
    #[serde(rename = "OGP")]
    Ogp,
    /// OGP contour blocks of a raft surface, no reference
    #[value(name = "OGP-RSA", alias = "ogp-rsa")]
    #[serde(rename = "OGP-RSA")]
    OgpRsa,
    /// ITL `ImagePoint` listing
    #[value(name = "ITL", alias = "itl")]
    #[serde(rename = "ITL")]
    Itl,
    /// e2v header-less x,y,z CSV
    #[value(name = "e2v", alias = "E2V")]
    #[serde(rename = "e2v")]
    E2v,
    /// TS5 raft scan CSV with `#` metadata
    #[value(name = "TS5", alias = "ts5")]
    #[serde(rename = "TS5")]
    Ts5,
}

impl MetrologyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetrologyFormat::Ogp => "OGP",
            MetrologyFormat::OgpRsa => "OGP-RSA",
            MetrologyFormat::Itl => "ITL",
            MetrologyFormat::E2v => "e2v",
            MetrologyFormat::Ts5 => "TS5",
        }
    }

    /// Reader for this layout
    pub fn reader(&self) -> Box<dyn ScanReader> {
        match self {
            MetrologyFormat::Ogp => Box::new(OgpReader::with_reference()),
            MetrologyFormat::OgpRsa => Box::new(OgpReader::raft_surface()),
            MetrologyFormat::Itl => Box::new(ItlReader),
            MetrologyFormat::E2v => Box::new(E2vReader),
            MetrologyFormat::Ts5 => Box::new(Ts5Reader),
        }
    }
}

impl fmt::Display for MetrologyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetrologyFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OGP" => Ok(MetrologyFormat::Ogp),
            "OGP-RSA" => Ok(MetrologyFormat::OgpRsa),
            "ITL" => Ok(MetrologyFormat::Itl),
            "E2V" => Ok(MetrologyFormat::E2v),
            "TS5" => Ok(MetrologyFormat::Ts5),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

/// Point clouds recovered from one or more scan files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanData {
    /// Surface under test
    pub sensor: PointCloud,
    /// Gauge-block reference points, when the layout records them
    pub reference: Option<PointCloud>,
    /// Run metadata from TS5 headers
    pub metadata: Option<Ts5Metadata>,
}

impl ScanData {
    pub fn sensor_only(sensor: PointCloud) -> Self {
        Self {
            sensor,
            reference: None,
            metadata: None,
        }
    }

    /// Append another file's scan; the first metadata seen is kept
    pub fn append(&mut self, other: ScanData) {
        self.sensor = &self.sensor + &other.sensor;
        self.reference = match (self.reference.take(), other.reference) {
            (Some(a), Some(b)) => Some(&a + &b),
            (a, b) => a.or(b),
        };
        if self.metadata.is_none() {
            self.metadata = other.metadata;
        }
    }
}

/// Parser for one scanner layout
pub trait ScanReader {
    /// Parse the text of one scan file; `source` names it in errors
    fn parse(&self, content: &str, source: &str) -> Result<ScanData, FormatError>;

    /// Read and parse one scan file
    fn read_file(&self, path: &Path) -> Result<ScanData, FormatError> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content, &path.display().to_string())
    }
}

/// Read `paths` in order and concatenate their clouds
pub fn load_scan(paths: &[PathBuf], format: MetrologyFormat) -> Result<ScanData, FormatError> {
    let reader = format.reader();
    let mut data = ScanData::default();
    for path in paths {
        let scan = reader.read_file(path)?;
        info!(
            path = %path.display(),
            format = %format,
            sensor_points = scan.sensor.len(),
            reference_points = scan.reference.as_ref().map_or(0, PointCloud::len),
            "loaded scan file"
        );
        data.append(scan);
    }
    if data.sensor.is_empty() {
        let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        return Err(FormatError::EmptyScan(names.join(", ")));
    }
    Ok(data)
}

/// Parse a float token, reporting the 1-based line on failure
pub(crate) fn parse_f64(token: &str, line: usize) -> Result<f64, FormatError> {
    token.trim().parse().map_err(|_| FormatError::Parse {
        line,
        message: format!("invalid number '{}'", token.trim()),
    })
}
