//! Pipeline orchestration
//!
//! This module provides the public API for Kcal Flux.
//! It runs the full flow from base-unit samples to today's budget:
//! bucketing → smoothing → trend → maintenance → budget → macro budget.

use crate::budget::BudgetEngine;
use crate::bucketing::{Bucketer, Calendar};
use crate::config::EngineConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::macros::MacroAllocator;
use crate::maintenance::MaintenanceEstimator;
use crate::schema::SampleEventAdapter;
use crate::smoothing::Smoother;
use crate::trend::TrendEstimator;
use crate::types::{
    Aggregation, BucketedSeries, Budget, Granularity, MacroBudget, MacroTargets,
    MaintenanceEstimate, SampleSet, SmoothedSeries, TrendEstimate,
};
use chrono::{Days, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

/// Everything computed for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    /// Local date the snapshot was computed for
    pub today: NaiveDate,
    /// Smoothed daily intake over the trailing window ending yesterday
    pub smoothed_intake: SmoothedSeries,
    /// Smoothed daily weight over the trailing window ending today
    pub smoothed_weight: SmoothedSeries,
    pub weight_trend: TrendEstimate,
    pub maintenance: MaintenanceEstimate,
    pub budget: Budget,
    /// Per-macro budget, when a split is configured and a budget is available
    pub macro_budget: Option<MacroBudget>,
    /// Macro grams logged today
    pub macros_consumed_today: MacroTargets,
    /// Intake totals per week of the weight window, keyed by week start
    pub weekly_intake: BucketedSeries,
}

impl AnalyticsSnapshot {
    /// Latest smoothed weight (kg)
    pub fn current_weight(&self) -> Option<f64> {
        self.smoothed_weight.current()
    }
}

/// Compute today's snapshot from base-unit samples.
///
/// Missing history never fails: estimates that need it are `None` and the
/// budget is reported as unavailable. Errors come only from configuration.
///
/// # Example
/// ```ignore
/// let snapshot = analyze(&samples, &EngineConfig::default(), today)?;
/// println!("{:?}", snapshot.budget.remaining());
/// ```
pub fn analyze(
    samples: &SampleSet,
    config: &EngineConfig,
    today: NaiveDate,
) -> Result<AnalyticsSnapshot, ComputeError> {
    config.validate()?;
    let tz = config.tz()?;
    let calendar = Calendar::new(config.goal.first_weekday);

    // Stage 1: Daily buckets in the user's timezone
    let daily_intake = Bucketer::daily_sum(&samples.dietary_energy, &tz);
    let daily_weight = Bucketer::daily_mean(&samples.body_mass, &tz);
    debug!(
        "bucketed {} intake days and {} weight days",
        daily_intake.len(),
        daily_weight.len()
    );

    // Stage 2: Smoothed intake; today is still being logged so the window ends yesterday
    let yesterday = days_back(today, 1)?;
    let intake_from = days_back(today, config.intake_window_days)?;
    let intake_window = daily_intake.window(intake_from, yesterday);
    let smoothed_intake = Smoother::smooth(&intake_window, config.intake_alpha)?;

    // Stage 3: Smoothed weight and its trend
    let weight_from = days_back(today, config.weight_window_days)?;
    let weight_window = daily_weight.window(weight_from, today);
    let smoothed_weight = Smoother::smooth(&weight_window, config.weight_alpha)?;
    let weight_trend = TrendEstimator::estimate(&smoothed_weight);
    debug!(
        "smoothed intake {:?} kcal/day, weight slope {:.4} kg/day over {} points",
        smoothed_intake.current(),
        weight_trend.slope_per_day,
        weight_trend.points
    );

    // Stage 4: Maintenance
    let estimator = MaintenanceEstimator::new(
        config.energy_density_kcal_per_kg,
        config.min_weight_span_days,
    );
    let maintenance = estimator.estimate(
        smoothed_intake.current(),
        weight_trend.slope_per_day,
        &weight_window,
    );
    debug!(
        "maintenance {:?} kcal/day (valid: {}, span {} days)",
        maintenance.maintenance_calories_per_day,
        maintenance.is_valid,
        maintenance.weight_span_days
    );

    // Stage 5: Budget within the current cycle
    let budget = BudgetEngine::new(config.goal.unlogged_day_policy).compute_budget(
        maintenance.usable(),
        config.goal.adjustment_kcal,
        &config.goal.budget_cycle(),
        daily_intake.as_map(),
        today,
    )?;
    debug!(
        "budget base {:?}, credit {:.1}, {} days left in cycle starting {}",
        budget.base_budget, budget.carry_over_credit, budget.days_left_in_cycle, budget.cycle.start
    );

    // Stage 6: Macros, smoothed over the same window as intake
    let daily_protein = Bucketer::daily_sum(&samples.protein, &tz);
    let daily_carbs = Bucketer::daily_sum(&samples.carbohydrates, &tz);
    let daily_fat = Bucketer::daily_sum(&samples.fat, &tz);

    let macros_consumed_today = MacroTargets {
        protein_grams: daily_protein.get(today),
        carb_grams: daily_carbs.get(today),
        fat_grams: daily_fat.get(today),
    };

    let macro_budget = match (config.goal.macro_split, budget.base_budget) {
        (Some(split), Some(base)) => {
            let targets = MacroAllocator::allocate(base, &split)?;
            let smooth = |series: &BucketedSeries| {
                Smoother::current(&series.window(intake_from, yesterday), config.intake_alpha)
            };
            let smoothed = MacroTargets {
                protein_grams: smooth(&daily_protein)?,
                carb_grams: smooth(&daily_carbs)?,
                fat_grams: smooth(&daily_fat)?,
            };
            debug!("macro targets {:?}, smoothed intake {:?}", targets, smoothed);

            Some(MacroAllocator::budget(
                &targets,
                &smoothed,
                &macros_consumed_today,
                budget.days_left_in_cycle,
            ))
        }
        _ => None,
    };

    let weekly_intake = Bucketer::bucket(
        &samples.dietary_energy,
        Granularity::Week,
        Aggregation::Sum,
        &calendar,
        &tz,
    )
    .window(calendar.start_of_week(weight_from), today);

    Ok(AnalyticsSnapshot {
        today,
        smoothed_intake,
        smoothed_weight,
        weight_trend,
        maintenance,
        budget,
        macro_budget,
        macros_consumed_today,
        weekly_intake,
    })
}

/// The date `days` before `today`
fn days_back(today: NaiveDate, days: u32) -> Result<NaiveDate, ComputeError> {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| ComputeError::DateOutOfRange(format!("{days} days before {today}")))
}

/// Convert raw `health.sample.v1` events to a budget report.
///
/// # Arguments
/// * `events_json` - NDJSON or a JSON array of sample events
/// * `config` - Engine configuration
/// * `today` - Local date to compute the budget for
///
/// # Returns
/// Budget report JSON
pub fn samples_to_report(
    events_json: &str,
    config: &EngineConfig,
    today: NaiveDate,
) -> Result<String, ComputeError> {
    let samples = SampleEventAdapter::samples_from_json(events_json)?;
    let snapshot = analyze(&samples, config, today)?;
    ReportEncoder::new().encode_to_json(&snapshot, config)
}

/// Stateful processor that accumulates samples across calls.
///
/// Use this when the host app feeds data incrementally and asks for a fresh
/// report whenever something changes.
pub struct BudgetProcessor {
    config: EngineConfig,
    samples: SampleSet,
    encoder: ReportEncoder,
}

impl Default for BudgetProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            samples: SampleSet::default(),
            encoder: ReportEncoder::new(),
        }
    }

    /// Create a processor with a specific configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration from JSON
    pub fn load_config(&mut self, json: &str) -> Result<(), ComputeError> {
        let config =
            EngineConfig::from_json(json).map_err(|e| ComputeError::ParseError(e.to_string()))?;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Save the configuration to JSON
    pub fn save_config(&self) -> Result<String, ComputeError> {
        self.config
            .to_json()
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Restore accumulated samples from JSON
    pub fn load_samples(&mut self, json: &str) -> Result<(), ComputeError> {
        self.samples =
            serde_json::from_str(json).map_err(|e| ComputeError::ParseError(e.to_string()))?;
        Ok(())
    }

    /// Save accumulated samples to JSON
    pub fn save_samples(&self) -> Result<String, ComputeError> {
        serde_json::to_string(&self.samples).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Add already-normalised samples
    pub fn ingest(&mut self, samples: SampleSet) -> usize {
        let added = samples.len();
        self.samples.extend(samples);
        debug!("ingested {} samples, {} total", added, self.samples.len());
        added
    }

    /// Parse and add `health.sample.v1` events; returns how many were added
    pub fn ingest_events(&mut self, events_json: &str) -> Result<usize, ComputeError> {
        let samples = SampleEventAdapter::samples_from_json(events_json)?;
        Ok(self.ingest(samples))
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Drop all accumulated samples
    pub fn clear(&mut self) {
        self.samples = SampleSet::default();
    }

    /// Compute today's snapshot from everything ingested so far
    pub fn analyze(&self, today: NaiveDate) -> Result<AnalyticsSnapshot, ComputeError> {
        analyze(&self.samples, &self.config, today)
    }

    /// Compute and encode today's report
    pub fn report(&self, today: NaiveDate) -> Result<String, ComputeError> {
        let snapshot = self.analyze(today)?;
        self.encoder.encode_to_json(&snapshot, &self.config)
    }
}
