//! TS5 raft scan CSV
//!
//! Data rows start with commanded x, commanded y and measured z (mm); the
//! remaining columns (temperatures, pressure, timestamps) are not used by
//! the analysis. Lines starting with `#` carry run metadata:
//!
//! ```text
//! # start time = 1523456789.0 s, end time = 1523460389.0
//! # temperature A start = 20.1 C, end = 20.3 C
//! ```

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::core::PointCloud;
use crate::formats::{parse_f64, FormatError, ScanData, ScanReader, MM_TO_UM};

/// Run metadata from TS5 `#` header lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ts5Metadata {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    /// Start temperature per sensor, in header order (A, B, C, D)
    pub temp_start: Vec<f64>,
    /// End temperature per sensor, in header order
    pub temp_end: Vec<f64>,
}

impl Ts5Metadata {
    /// Collect metadata from the `#` lines of a scan
    pub fn from_header(content: &str) -> Result<Self, FormatError> {
        let mut meta = Self::default();
        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            if line.starts_with("# start time =") {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                meta.start_time = Some(token(&tokens, 4, line_no)?);
                meta.end_time = Some(token(&tokens, 9, line_no)?);
            } else if line.starts_with("# temperature") {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                meta.temp_start.push(token(&tokens, 5, line_no)?);
                meta.temp_end.push(token(&tokens, 9, line_no)?);
            }
        }
        Ok(meta)
    }

    pub fn is_empty(&self) -> bool {
        self.start_time.is_none() && self.temp_start.is_empty()
    }
}

fn token(tokens: &[&str], index: usize, line: usize) -> Result<f64, FormatError> {
    let raw = tokens.get(index).ok_or_else(|| FormatError::Parse {
        line,
        message: format!("metadata line has no token {}", index),
    })?;
    parse_f64(raw.trim_end_matches(','), line)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ts5Reader;

impl ScanReader for Ts5Reader {
    fn parse(&self, content: &str, _source: &str) -> Result<ScanData, FormatError> {
        let metadata = Ts5Metadata::from_header(content)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut points = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            if record.len() < 3 {
                return Err(FormatError::Parse {
                    line,
                    message: format!("expected at least 3 columns, found {}", record.len()),
                });
            }
            points.push([
                parse_f64(&record[0], line)?,
                parse_f64(&record[1], line)?,
                parse_f64(&record[2], line)?,
            ]);
        }

        Ok(ScanData {
            sensor: PointCloud::from_points(points).scale_z(MM_TO_UM),
            reference: None,
            metadata: (!metadata.is_empty()).then_some(metadata),
        })
    }
}
