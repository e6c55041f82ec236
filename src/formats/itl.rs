//! ITL vendor metrology listings
//!
//! Each scan coordinate is its own `ImagePoint` line:
//!
//! ```text
//! ImagePoint X = 1.250
//! ImagePoint Y = 3.500
//! ImagePoint Z = 12.9991
//! ```
//!
//! Lines with more than five tokens belong to the scan summary and are
//! skipped.

use crate::core::PointCloud;
use crate::formats::{parse_f64, FormatError, ScanData, ScanReader, MM_TO_UM};

#[derive(Debug, Clone, Copy, Default)]
pub struct ItlReader;

impl ScanReader for ItlReader {
    fn parse(&self, content: &str, _source: &str) -> Result<ScanData, FormatError> {
        let (mut x, mut y, mut z) = (Vec::new(), Vec::new(), Vec::new());

        for (index, line) in content.lines().enumerate() {
            if !line.starts_with("ImagePoint") {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() > 5 {
                continue;
            }
            let line_no = index + 1;
            let (axis, value) = match (tokens.get(1), tokens.get(3)) {
                (Some(axis), Some(value)) => (*axis, parse_f64(value, line_no)?),
                _ => {
                    return Err(FormatError::Parse {
                        line: line_no,
                        message: "truncated ImagePoint line".to_string(),
                    })
                }
            };
            match axis {
                "X" => x.push(value),
                "Y" => y.push(value),
                "Z" => z.push(value),
                other => {
                    return Err(FormatError::Parse {
                        line: line_no,
                        message: format!("unknown axis '{}'", other),
                    })
                }
            }
        }

        let sensor = PointCloud::from_xyz(x, y, z)?.scale_z(MM_TO_UM);
        Ok(ScanData::sensor_only(sensor))
    }
}
