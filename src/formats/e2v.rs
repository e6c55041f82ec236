//! e2v header-less `x,y,z` CSV

use csv::ReaderBuilder;

use crate::core::PointCloud;
use crate::formats::{parse_f64, FormatError, ScanData, ScanReader, MM_TO_UM};

#[derive(Debug, Clone, Copy, Default)]
pub struct E2vReader;

impl ScanReader for E2vReader {
    fn parse(&self, content: &str, _source: &str) -> Result<ScanData, FormatError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut points = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            if record.len() < 3 {
                return Err(FormatError::Parse {
                    line,
                    message: format!("expected 3 columns, found {}", record.len()),
                });
            }
            points.push([
                parse_f64(&record[0], line)?,
                parse_f64(&record[1], line)?,
                parse_f64(&record[2], line)?,
            ]);
        }

        Ok(ScanData::sensor_only(
            PointCloud::from_points(points).scale_z(MM_TO_UM),
        ))
    }
}
