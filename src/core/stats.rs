//! Mean / standard deviation and sigma-clip window helpers

use serde::{Deserialize, Serialize};

/// Mean and population standard deviation of a residual set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipStats {
    pub mean: f64,
    pub stdev: f64,
}

impl ClipStats {
    /// Stats over every value, `None` when empty
    pub fn of(values: &[f64]) -> Option<Self> {
        Self::of_iter(values.iter().copied())
    }

    /// Stats over the values at `index`, `None` when the index is empty
    pub fn of_subset(values: &[f64], index: &[usize]) -> Option<Self> {
        Self::of_iter(index.iter().map(|&i| values[i]))
    }

    fn of_iter(values: impl Iterator<Item = f64> + Clone) -> Option<Self> {
        let (n, sum) = values
            .clone()
            .fold((0usize, 0.0f64), |(n, s), v| (n + 1, s + v));
        if n == 0 {
            return None;
        }
        let mean = sum / n as f64;
        let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        Some(Self {
            mean,
            stdev: variance.sqrt(),
        })
    }

    /// Closed window `[mean - nsigma·stdev, mean + nsigma·stdev]`
    pub fn window(&self, nsigma: f64) -> [f64; 2] {
        [
            self.mean - nsigma * self.stdev,
            self.mean + nsigma * self.stdev,
        ]
    }

    /// Whether `value` lies inside the clip window
    #[inline]
    pub fn contains(&self, value: f64, nsigma: f64) -> bool {
        let [lo, hi] = self.window(nsigma);
        value >= lo && value <= hi
    }

    /// Indices of the values inside the clip window
    pub fn select(&self, values: &[f64], nsigma: f64) -> Vec<usize> {
        let [lo, hi] = self.window(nsigma);
        values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v >= lo && v <= hi)
            .map(|(i, _)| i)
            .collect()
    }

    /// One clip pass: stats of the values surviving an nsigma cut around
    /// their own mean/stdev
    pub fn clipped_once(values: &[f64], nsigma: f64) -> Option<Self> {
        let raw = Self::of(values)?;
        let index = raw.select(values, nsigma);
        Self::of_subset(values, &index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_stdev() {
        let stats = ClipStats::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.stdev - 2.0).abs() < 1e-12);
        assert!(ClipStats::of(&[]).is_none());
    }

    #[test]
    fn test_window_is_closed() {
        let stats = ClipStats {
            mean: 0.0,
            stdev: 1.0,
        };
        assert!(stats.contains(3.0, 3.0));
        assert!(stats.contains(-3.0, 3.0));
        assert!(!stats.contains(3.0001, 3.0));
        assert_eq!(stats.select(&[-4.0, -3.0, 0.0, 3.0, 4.0], 3.0), vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_stdev_keeps_everything() {
        let stats = ClipStats::of(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(stats.select(&[1.0, 1.0, 1.0], 4.0).len(), 3);
    }

    #[test]
    fn test_clipped_once_drops_outlier() {
        let mut values = vec![0.0; 99];
        for (i, v) in values.iter_mut().enumerate() {
            *v = if i % 2 == 0 { 1.0 } else { -1.0 };
        }
        values.push(1000.0);
        let clipped = ClipStats::clipped_once(&values, 3.0).unwrap();
        assert!(clipped.mean.abs() < 0.05);
        assert!((clipped.stdev - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_subset_stats() {
        let values = [10.0, 1.0, 3.0, -50.0];
        let stats = ClipStats::of_subset(&values, &[1, 2]).unwrap();
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!((stats.stdev - 1.0).abs() < 1e-12);
        assert!(ClipStats::of_subset(&values, &[]).is_none());
    }
}
