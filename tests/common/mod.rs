//! Shared test helpers for integration tests
//!
//! Scan fixtures are generated from a seeded RNG so every run sees the same
//! points.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo;
use assert_cmd::Command;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use metrology::core::{PlaneModel, PointCloud};

/// Helper to get a metrology command
pub fn metrology() -> Command {
    Command::new(cargo::cargo_bin!("metrology"))
}

/// Seeded standard normal samples (Box-Muller)
pub struct Gaussian {
    rng: StdRng,
}

impl Gaussian {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn sample(&mut self) -> f64 {
        let u1: f64 = 1.0 - self.rng.random::<f64>();
        let u2: f64 = self.rng.random();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// `n × n` grid at unit spacing with z = plane + N(0, sigma)
pub fn noisy_plane(plane: PlaneModel, n: usize, sigma: f64, seed: u64) -> PointCloud {
    let mut noise = Gaussian::new(seed);
    PointCloud::from_points((0..n * n).map(|k| {
        let (x, y) = ((k % n) as f64, (k / n) as f64);
        [x, y, plane.at(x, y) + sigma * noise.sample()]
    }))
}

/// Points (x, y in mm; z in mm) of a gently tilted sensor surface at
/// `z0_mm` with micron-level noise
pub fn sensor_points_mm(z0_mm: f64, seed: u64) -> Vec<[f64; 3]> {
    let mut noise = Gaussian::new(seed);
    (0..400)
        .map(|k| {
            let x = 2.0 + (k % 20) as f64 * 2.0;
            let y = 2.0 + (k / 20) as f64 * 2.0;
            let z = z0_mm + 2e-5 * x - 1e-5 * y + 1e-3 * noise.sample();
            [x, y, z]
        })
        .collect()
}

/// Header-less `x,y,z` CSV in mm
pub fn write_e2v(dir: &Path, name: &str, points: &[[f64; 3]]) -> PathBuf {
    let mut text = String::new();
    for [x, y, z] in points {
        writeln!(text, "{:.4},{:.4},{:.6}", x, y, z).unwrap();
    }
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

/// OGP contour file: the sensor points in one contour, plus a gauge-block
/// contour below the sensor window at `block_z_mm` with a ±0.5 µm ripple
pub fn write_ogp(dir: &Path, name: &str, sensor: &[[f64; 3]], block_z_mm: f64) -> PathBuf {
    let mut text = String::from("Contour 1\n");
    for [x, y, z] in sensor {
        writeln!(text, "{:.4}  {:.4}  {:.6}", x, y, z).unwrap();
    }
    text.push_str("\nContour 2\n");
    for k in 0..30 {
        let x = (k % 10) as f64 * 4.0;
        let y = -10.0 - (k / 10) as f64;
        let ripple = if k % 2 == 0 { 5e-4 } else { -5e-4 };
        writeln!(text, "{:.4}  {:.4}  {:.6}", x, y, block_z_mm + ripple).unwrap();
    }
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

/// TS5 CSV with run metadata header lines
pub fn write_ts5(dir: &Path, name: &str, points: &[[f64; 3]]) -> PathBuf {
    let mut text = String::new();
    text.push_str("# start time = 1523456789.0 s, end time = 1523460389.0\n");
    text.push_str("# temperature A start = 20.1 C, end = 20.3 C\n");
    for [x, y, z] in points {
        writeln!(text, "{:.4},{:.4},{:.6},20.1,20.2,1.0e-3", x, y, z).unwrap();
    }
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}
