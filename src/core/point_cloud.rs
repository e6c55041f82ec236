//! Point cloud container for surface scans
//!
//! x and y are in millimeters, z in micrometers. Readers in
//! [`crate::formats`] perform the unit conversion before a cloud is built.

use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::core::error::{MetrologyError, MetrologyResult};

/// Ordered (x, y, z) samples of a scanned surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl PointCloud {
    /// Build a cloud from three coordinate sequences of equal length
    pub fn from_xyz(
        x: impl Into<Vec<f64>>,
        y: impl Into<Vec<f64>>,
        z: impl Into<Vec<f64>>,
    ) -> MetrologyResult<Self> {
        let (x, y, z) = (x.into(), y.into(), z.into());
        if x.len() != y.len() || y.len() != z.len() {
            return Err(MetrologyError::ShapeMismatch {
                x: x.len(),
                y: y.len(),
                z: z.len(),
            });
        }
        Ok(Self { x, y, z })
    }

    /// Build a cloud from (x, y, z) triples
    pub fn from_points(points: impl IntoIterator<Item = [f64; 3]>) -> Self {
        let mut cloud = Self::default();
        for [x, y, z] in points {
            cloud.x.push(x);
            cloud.y.push(y);
            cloud.z.push(z);
        }
        cloud
    }

    /// Concatenate two clouds, keeping operand order
    pub fn concat(&self, other: &PointCloud) -> PointCloud {
        let join = |a: &[f64], b: &[f64]| {
            let mut v = Vec::with_capacity(a.len() + b.len());
            v.extend_from_slice(a);
            v.extend_from_slice(b);
            v
        };
        PointCloud {
            x: join(&self.x, &other.x),
            y: join(&self.y, &other.y),
            z: join(&self.z, &other.z),
        }
    }

    /// Positions and heights in the shape consumed by the plane fitter
    pub fn as_fit_input(&self) -> (Vec<[f64; 2]>, &[f64]) {
        (self.positions().collect(), &self.z)
    }

    /// Iterate over (x, y) positions
    pub fn positions(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.x.iter().zip(&self.y).map(|(&x, &y)| [x, y])
    }

    /// Iterate over (x, y, z) triples
    pub fn points(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((&x, &y), &z)| [x, y, z])
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    /// Mean height, `None` for an empty cloud
    pub fn mean_z(&self) -> Option<f64> {
        if self.z.is_empty() {
            None
        } else {
            Some(self.z.iter().sum::<f64>() / self.z.len() as f64)
        }
    }

    /// Mean y coordinate, used to classify OGP contours
    pub fn mean_y(&self) -> Option<f64> {
        if self.y.is_empty() {
            None
        } else {
            Some(self.y.iter().sum::<f64>() / self.y.len() as f64)
        }
    }

    /// Multiply every height by `factor` (mm → µm conversion in readers)
    pub fn scale_z(mut self, factor: f64) -> Self {
        for z in &mut self.z {
            *z *= factor;
        }
        self
    }

    /// Bounding box in the xy plane as `([x_min, x_max], [y_min, y_max])`
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        if self.is_empty() {
            return None;
        }
        let span = |v: &[f64]| {
            v.iter().fold([f64::INFINITY, f64::NEG_INFINITY], |[lo, hi], &x| {
                [lo.min(x), hi.max(x)]
            })
        };
        Some((span(&self.x), span(&self.y)))
    }
}

impl Add for &PointCloud {
    type Output = PointCloud;

    fn add(self, other: &PointCloud) -> PointCloud {
        self.concat(other)
    }
}
