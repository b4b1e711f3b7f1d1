//! Exponential smoothing
//!
//! EWMA over a bucketed series, oldest bucket first:
//!
//! > s[0] = v[0]
//! > s[i] = alpha * v[i] + (1 - alpha) * s[i-1]
//!
//! Gaps between buckets are not filled; each present bucket is one step.

use crate::error::ComputeError;
use crate::types::{BucketedSeries, SeriesPoint, SmoothedSeries};

/// Default smoothing factor for intake (roughly a 7-day memory)
pub const DEFAULT_INTAKE_ALPHA: f64 = 0.25;

/// Default smoothing factor for daily weight before regression
pub const DEFAULT_WEIGHT_ALPHA: f64 = 0.25;

/// Exponentially weighted moving average smoother
pub struct Smoother;

impl Smoother {
    /// Smooth a series. Empty input yields an empty series.
    pub fn smooth(series: &BucketedSeries, alpha: f64) -> Result<SmoothedSeries, ComputeError> {
        validate_alpha(alpha)?;

        let mut points = Vec::with_capacity(series.len());
        let mut previous: Option<f64> = None;

        for (date, value) in series.iter() {
            let smoothed = match previous {
                None => value,
                Some(prev) => alpha * value + (1.0 - alpha) * prev,
            };
            points.push(SeriesPoint {
                date,
                value: smoothed,
            });
            previous = Some(smoothed);
        }

        Ok(SmoothedSeries { points })
    }

    /// The last smoothed value, or `None` for an empty series
    pub fn current(series: &BucketedSeries, alpha: f64) -> Result<Option<f64>, ComputeError> {
        Ok(Self::smooth(series, alpha)?.current())
    }
}

fn validate_alpha(alpha: f64) -> Result<(), ComputeError> {
    if alpha.is_finite() && alpha > 0.0 && alpha <= 1.0 {
        Ok(())
    } else {
        Err(ComputeError::InvalidAlpha(alpha))
    }
}
