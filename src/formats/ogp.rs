//! OGP coordinate-measuring machine contour files
//!
//! ```text
//! Contour 1
//! 12.5  3.0  13.0012
//! 12.5  4.0  13.0009
//!
//! Contour 2
//! ...
//! ```
//!
//! A blank line closes the current contour. Lines inside a contour that do
//! not start with three numbers are skipped.

use tracing::debug;

use crate::core::PointCloud;
use crate::formats::{FormatError, ScanData, ScanReader, MM_TO_UM};

/// Contours whose mean y (mm) lies in this closed range are sensor surface
pub const SENSOR_Y_WINDOW: [f64; 2] = [0.0, 42.0];

#[derive(Debug, Clone, Copy)]
pub struct OgpReader {
    split_reference: bool,
}

impl OgpReader {
    /// Single-sensor scans: gauge-block contours go to the reference cloud
    pub fn with_reference() -> Self {
        Self {
            split_reference: true,
        }
    }

    /// Raft scans: every contour is surface
    pub fn raft_surface() -> Self {
        Self {
            split_reference: false,
        }
    }
}

impl ScanReader for OgpReader {
    fn parse(&self, content: &str, source: &str) -> Result<ScanData, FormatError> {
        let contours = read_contours(content);
        debug!(source, contours = contours.len(), "parsed OGP contours");

        let mut sensor = PointCloud::default();
        let mut reference: Option<PointCloud> = None;
        for contour in contours.into_iter().filter(|c| !c.is_empty()) {
            let on_sensor = contour
                .mean_y()
                .is_some_and(|y| y >= SENSOR_Y_WINDOW[0] && y <= SENSOR_Y_WINDOW[1]);
            if on_sensor || !self.split_reference {
                sensor = &sensor + &contour;
            } else {
                reference = Some(match reference {
                    Some(r) => &r + &contour,
                    None => contour,
                });
            }
        }

        Ok(ScanData {
            sensor,
            reference,
            metadata: None,
        })
    }
}

/// Split the file into contour blocks of (x, y, z µm) points
fn read_contours(content: &str) -> Vec<PointCloud> {
    let mut contours = Vec::new();
    let mut current: Option<Vec<[f64; 3]>> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Contour") {
            if let Some(points) = current.take() {
                contours.push(points);
            }
            current = Some(Vec::new());
            continue;
        }
        if trimmed.is_empty() {
            if let Some(points) = current.take() {
                contours.push(points);
            }
            continue;
        }
        if let Some(points) = current.as_mut() {
            if let Some(xyz) = xyz(trimmed) {
                points.push(xyz);
            }
        }
    }
    if let Some(points) = current {
        contours.push(points);
    }

    contours
        .into_iter()
        .map(|points| PointCloud::from_points(points).scale_z(MM_TO_UM))
        .collect()
}

fn xyz(line: &str) -> Option<[f64; 3]> {
    let mut tokens = line.split_whitespace().map(str::parse::<f64>);
    let x = tokens.next()?.ok()?;
    let y = tokens.next()?.ok()?;
    let z = tokens.next()?.ok()?;
    Some([x, y, z])
}
