//! Terminal visualization of residuals
//!
//! Text histograms and range bars use box-drawing characters; the plan view
//! uses braille graphics so a few thousand scan points fit in one screen.

use console::style;
use drawille::Canvas;

use crate::core::residuals::QuantileTable;
use crate::core::stats::ClipStats;

/// Default canvas size for the plan view
pub const MAP_WIDTH: u32 = 120;
pub const MAP_HEIGHT: u32 = 60;

const BAR_MAX_WIDTH: usize = 50;

/// Render a histogram of residuals with the clip annotation
///
/// # Example Output
/// ```text
///   -2.812 │████████                                   12
///   -2.437 │██████████████████                          27
///   ...
///   mean=0.004  stdev=0.998  5-sigma clip
/// ```
pub fn render_histogram(values: &[f64], bins: usize, stats: &ClipStats, nsigma: f64) -> String {
    if values.is_empty() || bins == 0 {
        return "  (no residuals)".to_string();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let mut counts = vec![0usize; bins];
    if range > 0.0 {
        let bin_width = range / bins as f64;
        for &v in values {
            let bin = (((v - min) / bin_width) as usize).min(bins - 1);
            counts[bin] += 1;
        }
    } else {
        counts[0] = values.len();
    }
    let max_count = counts.iter().copied().max().unwrap_or(1).max(1);

    let mut lines = Vec::with_capacity(bins + 2);
    lines.push(format!(
        "  {} ({} residuals, {} bins):",
        style("z - z_model (µm)").bold(),
        values.len(),
        bins
    ));
    for (i, &count) in counts.iter().enumerate() {
        let center = min + (i as f64 + 0.5) * range / bins as f64;
        let bar = "█".repeat(count * BAR_MAX_WIDTH / max_count);
        lines.push(format!(
            "  {:>9.3} │{:<width$} {}",
            center,
            bar,
            count,
            width = BAR_MAX_WIDTH
        ));
    }
    lines.push(format!(
        "  mean={:.3}  stdev={:.3}  {}-sigma clip",
        stats.mean, stats.stdev, nsigma
    ));
    lines.join("\n")
}

/// Render the quantile spread as a box-and-whisker bar
///
/// Whiskers span q(0)..q(1), the box q(0.25)..q(0.75), `┃` marks the median.
pub fn render_quantile_bar(table: &QuantileTable) -> String {
    let (Some(lo), Some(hi)) = (table.get(0.0), table.get(1.0)) else {
        return "  (quantile table lacks 0.000/1.000)".to_string();
    };
    let bar_width = 60usize;
    let span = (hi - lo).max(f64::EPSILON);
    let pos = |v: f64| (((v - lo) / span) * (bar_width - 1) as f64).round() as usize;

    let mut bar: Vec<char> = vec!['─'; bar_width];
    bar[0] = '├';
    bar[bar_width - 1] = '┤';
    if let (Some(q1), Some(q3)) = (table.get(0.25), table.get(0.75)) {
        let (p1, p3) = (pos(q1).min(bar_width - 1), pos(q3).min(bar_width - 1));
        for c in bar.iter_mut().take(p3 + 1).skip(p1) {
            *c = '█';
        }
    }
    if let Some(median) = table.get(0.5) {
        bar[pos(median).min(bar_width - 1)] = '┃';
    }

    let bar_str: String = bar.into_iter().collect();
    format!("  {}\n  min={:.3}  max={:.3}  (µm)", bar_str, lo, hi)
}

/// Plan view (x right, y up) of the points whose residual is positive
pub fn render_surface_map(
    points: impl IntoIterator<Item = [f64; 3]>,
    width: u32,
    height: u32,
) -> String {
    let points: Vec<[f64; 3]> = points.into_iter().collect();
    if points.is_empty() || width < 2 || height < 2 {
        return "  (no points)".to_string();
    }

    let span = |axis: usize| {
        points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[axis]), hi.max(p[axis]))
        })
    };
    let (x_min, x_max) = span(0);
    let (y_min, y_max) = span(1);
    let scale_x = (width - 1) as f64 / (x_max - x_min).max(f64::EPSILON);
    let scale_y = (height - 1) as f64 / (y_max - y_min).max(f64::EPSILON);

    let mut canvas = Canvas::new(width, height);
    let mut above = 0usize;
    for &[x, y, dz] in &points {
        if dz > 0.0 {
            let px = ((x - x_min) * scale_x) as u32;
            let py = (height - 1) - ((y - y_min) * scale_y) as u32;
            canvas.set(px, py);
            above += 1;
        }
    }

    let mut output = String::new();
    output.push_str("Points above reference plane:\n");
    output.push_str(&canvas.frame());
    output.push_str(&format!(
        "\n  {}/{} points  x: {:.1}..{:.1} mm  y: {:.1}..{:.1} mm",
        above,
        points.len(),
        x_min,
        x_max,
        y_min,
        y_max
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_histogram() {
        let values: Vec<f64> = (0..100).map(|i| (i % 10) as f64 - 4.5).collect();
        let stats = ClipStats::of(&values).unwrap();
        let output = render_histogram(&values, 10, &stats, 5.0);
        assert!(output.contains("100 residuals, 10 bins"));
        assert!(output.contains("5-sigma clip"));
        assert!(output.contains("█"));
        assert_eq!(output.lines().count(), 12);
    }

    #[test]
    fn test_render_histogram_constant_values() {
        let values = [2.0; 5];
        let stats = ClipStats::of(&values).unwrap();
        let output = render_histogram(&values, 4, &stats, 4.0);
        assert!(output.contains("stdev=0.000"));
    }

    #[test]
    fn test_render_quantile_bar() {
        let mut table = QuantileTable::default();
        for (q, v) in [(0.0, -4.0), (0.25, -1.0), (0.5, 0.0), (0.75, 1.0), (1.0, 4.0)] {
            table.insert(q, v);
        }
        let output = render_quantile_bar(&table);
        assert!(output.contains("min=-4.000"));
        assert!(output.contains("max=4.000"));
        assert!(output.contains('┃'));
        assert!(output.contains('├'));
    }

    #[test]
    fn test_render_surface_map() {
        let points = (0..50).map(|i| {
            let x = (i % 10) as f64;
            let y = (i / 10) as f64;
            [x, y, if i % 2 == 0 { 1.0 } else { -1.0 }]
        });
        let output = render_surface_map(points, 40, 20);
        assert!(output.contains("25/50 points"));
        assert!(output
            .chars()
            .any(|c| c as u32 >= 0x2800 && c as u32 <= 0x28FF));
    }

    #[test]
    fn test_render_surface_map_empty() {
        assert!(render_surface_map(std::iter::empty(), 40, 20).contains("no points"));
    }
}
