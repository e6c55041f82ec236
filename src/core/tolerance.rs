//! Fraction of a surface outside a height tolerance band
//!
//! The quantile table is read as an inverted cumulative distribution: level
//! as a function of residual height, linearly interpolated between table
//! entries and held at the end levels outside the observed range.

use serde::{Deserialize, Serialize};

use crate::core::error::{MetrologyError, MetrologyResult};
use crate::core::residuals::QuantileTable;

/// Allowed height range around a nominal value
///
/// `low` and `high` are signed offsets from `nominal`, so the default
/// absolute-height band is `{ nominal: 0, low: -9, high: 9 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceBand {
    pub nominal: f64,
    pub low: f64,
    pub high: f64,
}

impl Default for ToleranceBand {
    fn default() -> Self {
        Self::symmetric(0.0, 9.0)
    }
}

impl ToleranceBand {
    pub fn new(nominal: f64, low: f64, high: f64) -> Self {
        Self { nominal, low, high }
    }

    /// Band `nominal ± half_width`
    pub fn symmetric(nominal: f64, half_width: f64) -> Self {
        Self::new(nominal, -half_width, half_width)
    }

    /// Same nominal, symmetric `± half_width` limits
    pub fn with_half_width(self, half_width: f64) -> Self {
        Self::symmetric(self.nominal, half_width)
    }

    pub fn low_edge(&self) -> f64 {
        self.nominal + self.low
    }

    pub fn high_edge(&self) -> f64 {
        self.nominal + self.high
    }
}

/// Inverted quantile curve of one table
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceEvaluator {
    /// Residual values, ascending
    values: Vec<f64>,
    /// Quantile level paired with each value
    levels: Vec<f64>,
}

impl ToleranceEvaluator {
    pub fn from_table(table: &QuantileTable) -> MetrologyResult<Self> {
        if table.is_empty() {
            return Err(MetrologyError::EmptyResiduals);
        }

        let mut pairs = Vec::with_capacity(table.len());
        for (key, value) in table.iter() {
            let level: f64 = key
                .parse()
                .map_err(|_| MetrologyError::InvalidQuantileLevel(f64::NAN))?;
            if !(0.0..=1.0).contains(&level) {
                return Err(MetrologyError::InvalidQuantileLevel(level));
            }
            pairs.push((value, level));
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let (values, levels) = pairs.into_iter().unzip();
        Ok(Self { values, levels })
    }

    /// Interpolated quantile level at residual height `value`
    pub fn level_at(&self, value: f64) -> f64 {
        let n = self.values.len();
        let upper = self.values.partition_point(|&v| v <= value);
        if upper == 0 {
            return self.levels[0];
        }
        if upper == n {
            return self.levels[n - 1];
        }

        let (x0, x1) = (self.values[upper - 1], self.values[upper]);
        let (y0, y1) = (self.levels[upper - 1], self.levels[upper]);
        y0 + (value - x0) * (y1 - y0) / (x1 - x0)
    }

    /// `1 - (level(high edge) - level(low edge))`
    pub fn fraction_outside(&self, band: &ToleranceBand) -> f64 {
        1.0 - (self.level_at(band.high_edge()) - self.level_at(band.low_edge()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(f64, f64)]) -> QuantileTable {
        let mut t = QuantileTable::default();
        for &(q, v) in entries {
            t.insert(q, v);
        }
        t
    }

    #[test]
    fn test_empty_table() {
        assert!(matches!(
            ToleranceEvaluator::from_table(&QuantileTable::default()),
            Err(MetrologyError::EmptyResiduals)
        ));
    }

    #[test]
    fn test_level_interpolation_and_clamping() {
        let eval = ToleranceEvaluator::from_table(&table(&[(0.0, -2.0), (0.5, 0.0), (1.0, 2.0)]))
            .unwrap();
        assert_eq!(eval.level_at(-5.0), 0.0);
        assert_eq!(eval.level_at(5.0), 1.0);
        assert!((eval.level_at(1.0) - 0.75).abs() < 1e-12);
        assert!((eval.level_at(-2.0) - 0.0).abs() < 1e-12);
        assert!((eval.level_at(2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_inside_band() {
        let eval = ToleranceEvaluator::from_table(&table(&[(0.0, -3.0), (0.5, 0.5), (1.0, 4.0)]))
            .unwrap();
        assert_eq!(eval.fraction_outside(&ToleranceBand::default()), 0.0);
    }

    #[test]
    fn test_median_at_band_edge() {
        let base = table(&[(0.0, -1.0), (0.25, -0.5), (0.5, 0.0), (0.75, 0.5), (1.0, 1.0)]);
        let band = ToleranceBand::default();

        let low = ToleranceEvaluator::from_table(&base.shifted(-9.0)).unwrap();
        assert!((low.fraction_outside(&band) - 0.5).abs() < 1e-12);

        let high = ToleranceEvaluator::from_table(&base.shifted(9.0)).unwrap();
        assert!((high.fraction_outside(&band) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_band_is_not_clamped() {
        let eval = ToleranceEvaluator::from_table(&table(&[(0.0, -10.0), (1.0, 10.0)])).unwrap();
        let inverted = ToleranceBand::new(0.0, 5.0, -5.0);
        assert!((eval.fraction_outside(&inverted) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_half_width_keeps_nominal() {
        let band = ToleranceBand::new(20.0, -9.0, 12.0).with_half_width(5.0);
        assert_eq!(band, ToleranceBand::new(20.0, -5.0, 5.0));
        assert_eq!(band.low_edge(), 15.0);
        assert_eq!(band.high_edge(), 25.0);
    }

    #[test]
    fn test_band_edges() {
        let band = ToleranceBand::new(13000.0, -9.0, 12.0);
        assert_eq!(band.low_edge(), 12991.0);
        assert_eq!(band.high_edge(), 13012.0);
    }
}
