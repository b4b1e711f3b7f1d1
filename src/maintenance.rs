//! Maintenance estimation
//!
//! Energy balance: when weight trends down the subject eats below maintenance,
//! so maintenance is the smoothed intake plus the energy released per day.
//!
//! > maintenance = smoothed_intake - weight_slope_per_day * energy_density
//!
//! The default energy density of 7700 kcal per kg of body-mass change is an
//! approximation for typical human body composition (mostly fat tissue). It is
//! configurable and overridable in tests.

use crate::types::{BucketedSeries, MaintenanceEstimate};

/// Energy density of body-mass change (kcal per kg)
pub const DEFAULT_ENERGY_DENSITY_KCAL_PER_KG: f64 = 7700.0;

/// Minimum span of the weight series for a trustworthy estimate (days)
pub const DEFAULT_MIN_WEIGHT_SPAN_DAYS: i64 = 14;

/// Maintenance rate estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaintenanceEstimator {
    /// kcal per kg of body-mass change
    pub energy_density: f64,
    /// Days the weight series must span for the estimate to be valid
    pub min_span_days: i64,
}

impl Default for MaintenanceEstimator {
    fn default() -> Self {
        Self {
            energy_density: DEFAULT_ENERGY_DENSITY_KCAL_PER_KG,
            min_span_days: DEFAULT_MIN_WEIGHT_SPAN_DAYS,
        }
    }
}

impl MaintenanceEstimator {
    pub fn new(energy_density: f64, min_span_days: i64) -> Self {
        Self {
            energy_density,
            min_span_days,
        }
    }

    /// Maintenance kcal/day; `None` when there is no smoothed intake
    pub fn maintenance(
        &self,
        smoothed_intake: Option<f64>,
        weight_slope_per_day: f64,
    ) -> Option<f64> {
        estimate(smoothed_intake, weight_slope_per_day, self.energy_density)
    }

    /// Whether a daily weight series spans enough calendar days
    pub fn is_valid(&self, daily_weights: &BucketedSeries) -> bool {
        daily_weights
            .span_days()
            .is_some_and(|span| span >= self.min_span_days)
    }

    /// Full estimate including validity, from the weight series the slope came from
    pub fn estimate(
        &self,
        smoothed_intake: Option<f64>,
        weight_slope_per_day: f64,
        daily_weights: &BucketedSeries,
    ) -> MaintenanceEstimate {
        MaintenanceEstimate {
            maintenance_calories_per_day: self.maintenance(smoothed_intake, weight_slope_per_day),
            is_valid: self.is_valid(daily_weights),
            smoothed_intake,
            weight_slope_per_day,
            weight_span_days: daily_weights.span_days().unwrap_or(0),
        }
    }
}

/// `smoothed_intake - weight_slope_per_day * energy_density`
pub fn estimate(
    smoothed_intake: Option<f64>,
    weight_slope_per_day: f64,
    energy_density: f64,
) -> Option<f64> {
    smoothed_intake.map(|intake| intake - weight_slope_per_day * energy_density)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Aggregation, Granularity};
    use chrono::{Duration, NaiveDate};

    fn weights_on(offsets: &[i64]) -> BucketedSeries {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        BucketedSeries::from_points(
            Granularity::Day,
            Aggregation::Mean,
            offsets.iter().map(|&d| (start + Duration::days(d), 80.0)),
        )
    }

    #[test]
    fn test_losing_weight_raises_maintenance() {
        // -0.1 kg/day at 7700 kcal/kg is a 770 kcal/day deficit
        let maintenance = estimate(Some(2000.0), -0.1, 7700.0).unwrap();
        assert!((maintenance - 2770.0).abs() < 1e-9);
        assert!(maintenance > 2000.0);
    }

    #[test]
    fn test_gaining_weight_lowers_maintenance() {
        let maintenance = estimate(Some(2500.0), 0.05, 7700.0).unwrap();
        assert!((maintenance - 2115.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_weight_equals_intake() {
        assert_eq!(estimate(Some(2200.0), 0.0, 7700.0), Some(2200.0));
    }

    #[test]
    fn test_missing_intake_propagates() {
        assert_eq!(estimate(None, -0.1, 7700.0), None);
    }

    #[test]
    fn test_energy_density_override() {
        let estimator = MaintenanceEstimator::new(3500.0, 14);
        let maintenance = estimator.maintenance(Some(2000.0), -0.2).unwrap();
        assert!((maintenance - 2700.0).abs() < 1e-9);
    }

    #[test]
    fn test_validity_depends_on_span_not_count() {
        let estimator = MaintenanceEstimator::default();

        // Many samples, short span
        assert!(!estimator.is_valid(&weights_on(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13])));
        // Two samples, long enough span
        assert!(estimator.is_valid(&weights_on(&[0, 14])));
        assert!(estimator.is_valid(&weights_on(&[0, 3, 20])));
        // Nothing at all
        assert!(!estimator.is_valid(&weights_on(&[])));
    }

    #[test]
    fn test_full_estimate() {
        let estimator = MaintenanceEstimator::default();
        let weights = weights_on(&[0, 7, 15]);
        let result = estimator.estimate(Some(2100.0), -0.05, &weights);

        assert!(result.is_valid);
        assert_eq!(result.weight_span_days, 15);
        assert!((result.usable().unwrap() - 2485.0).abs() < 1e-9);
    }
}
