//! Plane model z = a·x + b·y + c and its linear least-squares solve
//!
//! The solve accumulates the 3×3 normal equations over a subset of rows and
//! computes the correction to a seed plane, so a refit started from the
//! previous parameters only has to move by the residual change.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::error::DivergenceReason;

/// Smallest accepted ratio between the extreme singular values of the
/// normal matrix before the positions are treated as degenerate
const RANK_TOLERANCE: f64 = 1e-12;

/// Plane as a function of position: z = a·x + b·y + c
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaneModel {
    /// dz/dx (µm per mm)
    pub a: f64,
    /// dz/dy (µm per mm)
    pub b: f64,
    /// Height at the origin (µm)
    pub c: f64,
}

impl PlaneModel {
    /// The z = 0 plane, default seed of the fitter
    pub const ORIGIN: PlaneModel = PlaneModel::new(0.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Horizontal plane at height `z0`, the nominal plane of absolute height runs
    pub const fn horizontal(z0: f64) -> Self {
        Self::new(0.0, 0.0, z0)
    }

    /// Parameters as `[a, b, c]`
    pub fn pars(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    /// Height of the plane at (x, y)
    #[inline]
    pub fn at(&self, x: f64, y: f64) -> f64 {
        self.a * x + self.b * y + self.c
    }

    /// Evaluate over a sequence of positions
    pub fn evaluate(&self, positions: &[[f64; 2]]) -> Vec<f64> {
        positions.iter().map(|&[x, y]| self.at(x, y)).collect()
    }
}

/// Least-squares plane through the rows selected by `rows`, seeded at `seed`
///
/// Returns [`DivergenceReason::Degenerate`] when the selected positions do
/// not span a plane (fewer than three non-colinear points).
pub fn least_squares(
    positions: &[[f64; 2]],
    z: &[f64],
    rows: impl IntoIterator<Item = usize>,
    seed: &PlaneModel,
) -> Result<PlaneModel, DivergenceReason> {
    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();

    for i in rows {
        let [x, y] = positions[i];
        let row = Vector3::new(x, y, 1.0);
        let r = z[i] - seed.at(x, y);
        ata += row * row.transpose();
        atb += row * r;
    }

    let svd = ata.svd(true, true);
    let s_max = svd
        .singular_values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let s_min = svd
        .singular_values
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    if !(s_min > s_max * RANK_TOLERANCE) {
        return Err(DivergenceReason::Degenerate);
    }

    let delta = svd
        .solve(&atb, 0.0)
        .map_err(|_| DivergenceReason::Degenerate)?;
    if delta.iter().any(|v| !v.is_finite()) {
        return Err(DivergenceReason::Degenerate);
    }

    Ok(PlaneModel::new(
        seed.a + delta[0],
        seed.b + delta[1],
        seed.c + delta[2],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(plane: &PlaneModel) -> (Vec<[f64; 2]>, Vec<f64>) {
        let mut positions = Vec::new();
        let mut z = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                let (x, y) = (i as f64, j as f64);
                positions.push([x, y]);
                z.push(plane.at(x, y));
            }
        }
        (positions, z)
    }

    #[test]
    fn test_evaluate() {
        let plane = PlaneModel::new(5.0, 2.0, -1.0);
        assert_eq!(plane.evaluate(&[[0.0, 0.0], [1.0, 1.0]]), vec![-1.0, 6.0]);
        assert_eq!(plane.pars(), [5.0, 2.0, -1.0]);
    }

    #[test]
    fn test_exact_plane_recovered() {
        let truth = PlaneModel::new(0.5, -1.25, 12.0);
        let (positions, z) = grid(&truth);
        let fitted = least_squares(&positions, &z, 0..z.len(), &PlaneModel::ORIGIN).unwrap();
        assert!((fitted.a - 0.5).abs() < 1e-9);
        assert!((fitted.b + 1.25).abs() < 1e-9);
        assert!((fitted.c - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_seed_does_not_change_solution() {
        let truth = PlaneModel::new(3.0, 1.0, 2.0);
        let (positions, z) = grid(&truth);
        let seed = PlaneModel::new(-10.0, 4.0, 100.0);
        let fitted = least_squares(&positions, &z, 0..z.len(), &seed).unwrap();
        assert!((fitted.a - 3.0).abs() < 1e-9);
        assert!((fitted.b - 1.0).abs() < 1e-9);
        assert!((fitted.c - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_colinear_positions_are_degenerate() {
        let positions: Vec<[f64; 2]> = (0..20).map(|i| [i as f64, i as f64]).collect();
        let z: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let err = least_squares(&positions, &z, 0..20, &PlaneModel::ORIGIN).unwrap_err();
        assert_eq!(err, DivergenceReason::Degenerate);
    }

    #[test]
    fn test_no_rows_is_degenerate() {
        let err = least_squares(&[], &[], std::iter::empty(), &PlaneModel::ORIGIN).unwrap_err();
        assert_eq!(err, DivergenceReason::Degenerate);
    }
}
