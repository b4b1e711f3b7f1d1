//! Trend estimation
//!
//! Ordinary least-squares slope of a smoothed series against elapsed days since
//! its first point. Degenerate inputs (fewer than two points, or all points on
//! the same day) yield a flat trend rather than an error.

use crate::types::{SmoothedSeries, TrendEstimate};

/// Least-squares trend estimator
pub struct TrendEstimator;

impl TrendEstimator {
    /// Estimate the per-day slope of a smoothed series
    pub fn estimate(series: &SmoothedSeries) -> TrendEstimate {
        TrendEstimate {
            slope_per_day: Self::slope(series),
            points: series.len(),
        }
    }

    /// Slope in value units per day
    pub fn slope(series: &SmoothedSeries) -> f64 {
        let Some(origin) = series.first_date() else {
            return 0.0;
        };

        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .map(|p| ((p.date - origin).num_days() as f64, p.value))
            .collect();

        least_squares_slope(&points)
    }
}

/// Two-pass mean-centred OLS slope of `(x, y)` pairs
pub fn least_squares_slope(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    // Flat input must give exactly zero, independent of rounding in the means
    let first_y = points[0].1;
    if points.iter().all(|(_, y)| *y == first_y) {
        return 0.0;
    }

    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

    let (numerator, denominator) = points.iter().fold((0.0, 0.0), |(num, den), (x, y)| {
        let dx = x - mean_x;
        (num + dx * (y - mean_y), den + dx * dx)
    });

    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
