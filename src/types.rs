//! Core types for the Kcal Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw samples, bucketed and smoothed series, trend and maintenance
//! estimates, budgets, and macro targets. All magnitudes are kept in base units
//! (kilograms, kilocalories, seconds); display units only appear in the encoder.

use crate::units::Unit;
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Origin of a sample, for provenance tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Entered manually in the app
    Local,
    /// Read from the platform health store
    HealthKit,
    /// For other integrations, use Other with a name
    #[serde(untagged)]
    Other(String),
}

impl SourceTag {
    pub fn as_str(&self) -> &str {
        match self {
            SourceTag::Local => "local",
            SourceTag::HealthKit => "health_kit",
            SourceTag::Other(name) => name.as_str(),
        }
    }
}

/// A single immutable observation in base units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the observation was recorded (UTC)
    pub timestamp: DateTime<Utc>,
    /// Magnitude in the base unit of its dimension
    pub value: f64,
    /// Where the sample came from
    pub source: SourceTag,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64, source: SourceTag) -> Self {
        Self {
            timestamp,
            value,
            source,
        }
    }

    /// Create a manually-entered sample
    pub fn local(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self::new(timestamp, value, SourceTag::Local)
    }
}

/// Calendar bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
}

/// How samples within a bucket are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Cumulative quantities (dietary energy, macros)
    Sum,
    /// Point quantities (body mass)
    Mean,
}

/// Sparse, ordered mapping from calendar bucket to aggregate value.
///
/// Keys are the local date that starts the bucket. Buckets without samples are
/// absent, never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketedSeries {
    pub granularity: Granularity,
    pub aggregation: Aggregation,
    buckets: BTreeMap<NaiveDate, f64>,
}

impl BucketedSeries {
    /// Create an empty series
    pub fn new(granularity: Granularity, aggregation: Aggregation) -> Self {
        Self {
            granularity,
            aggregation,
            buckets: BTreeMap::new(),
        }
    }

    /// Build a series from pre-aggregated points. Later duplicates replace earlier ones.
    pub fn from_points<I>(granularity: Granularity, aggregation: Aggregation, points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self {
            granularity,
            aggregation,
            buckets: points.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Aggregate value of the bucket starting at `date`
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.buckets.get(&date).copied()
    }

    /// Iterate buckets in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.buckets.iter().map(|(date, value)| (*date, *value))
    }

    pub fn values(&self) -> Vec<f64> {
        self.buckets.values().copied().collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.buckets.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.buckets.keys().next_back().copied()
    }

    /// Whole days between the first and last bucket keys
    pub fn span_days(&self) -> Option<i64> {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => Some((last - first).num_days()),
            _ => None,
        }
    }

    /// Buckets whose key falls in `[from, to]`
    pub fn window(&self, from: NaiveDate, to: NaiveDate) -> Self {
        let buckets = if from > to {
            BTreeMap::new()
        } else {
            self.buckets
                .range(from..=to)
                .map(|(date, value)| (*date, *value))
                .collect()
        };
        Self {
            granularity: self.granularity,
            aggregation: self.aggregation,
            buckets,
        }
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.buckets
    }

    pub(crate) fn insert(&mut self, date: NaiveDate, value: f64) {
        self.buckets.insert(date, value);
    }
}

/// A single point of a smoothed series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// EWMA-smoothed series sharing the key domain of its source series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmoothedSeries {
    pub points: Vec<SeriesPoint>,
}

impl SmoothedSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The current smoothed value (last point)
    pub fn current(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }
}

/// Per-day rate of change of a smoothed series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendEstimate {
    /// Base units per day (kg/day for body mass)
    pub slope_per_day: f64,
    /// Number of points used in the fit
    pub points: usize,
}

/// Estimated maintenance energy rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceEstimate {
    /// Maintenance kcal/day, if intake history exists
    pub maintenance_calories_per_day: Option<f64>,
    /// Whether the weight series spans enough calendar days to trust the estimate
    pub is_valid: bool,
    /// Smoothed daily intake the estimate was derived from (kcal/day)
    pub smoothed_intake: Option<f64>,
    /// Weight trend the estimate was derived from (kg/day)
    pub weight_slope_per_day: f64,
    /// Days between the first and last weight bucket
    pub weight_span_days: i64,
}

impl MaintenanceEstimate {
    /// The maintenance rate if it may be shown or used downstream
    pub fn usable(&self) -> Option<f64> {
        if self.is_valid {
            self.maintenance_calories_per_day
        } else {
            None
        }
    }
}

/// Fixed-length accounting cycle aligned to a first weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCycle {
    /// Cycle length in days (7 for a week)
    pub cycle_length_days: u32,
    /// Weekday cycles start on
    pub first_weekday: Weekday,
    /// Any date; cycles are laid out from the aligned start at or before it
    pub anchor_date: NaiveDate,
}

/// A resolved cycle instance: `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleWindow {
    pub start: NaiveDate,
    /// Exclusive end
    pub end: NaiveDate,
}

impl CycleWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn length_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Days from `today` to the end of the cycle, counting today
    pub fn days_left(&self, today: NaiveDate) -> u32 {
        (self.end - today).num_days().max(1) as u32
    }

    /// Dates strictly before `today` inside the window
    pub fn days_before(&self, today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        let count = (today.min(self.end) - self.start).num_days().max(0);
        self.start.iter_days().take(count as usize)
    }
}

/// How a prior cycle day with no logged intake contributes to the carry-over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnloggedDayPolicy {
    /// The day earns its full base budget as credit
    #[default]
    FullCredit,
    /// The day contributes nothing
    NoCredit,
}

/// A day's calorie budget within its cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Maintenance + adjustment (kcal/day); `None` when maintenance is unavailable
    pub base_budget: Option<f64>,
    /// Signed kcal/day offset from maintenance
    pub adjustment: f64,
    /// Days left in the cycle including today, at least 1
    pub days_left_in_cycle: u32,
    /// Unused (positive) or overused (negative) budget from earlier days of the cycle
    pub carry_over_credit: f64,
    /// Intake logged today (kcal)
    pub consumed_today: f64,
    /// The cycle instance containing today
    pub cycle: CycleWindow,
}

impl Budget {
    pub fn is_available(&self) -> bool {
        self.base_budget.is_some()
    }

    /// `(base + credit) - consumed today`
    pub fn remaining(&self) -> Option<f64> {
        self.base_budget
            .map(|base| base + self.carry_over_credit - self.consumed_today)
    }

    /// Base budget with the credit spread evenly over the days left in the cycle
    pub fn spread_allowance(&self) -> Option<f64> {
        self.base_budget
            .map(|base| base + self.carry_over_credit / self.days_left_in_cycle as f64)
    }
}

/// Percent-of-calories split for macro targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carb_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_pct: Option<f64>,
}

impl MacroSplit {
    pub fn new(protein_pct: f64, carb_pct: f64, fat_pct: f64) -> Self {
        Self {
            protein_pct: Some(protein_pct),
            carb_pct: Some(carb_pct),
            fat_pct: Some(fat_pct),
        }
    }
}

/// Gram amounts per macro; used for targets, consumption and remaining amounts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein_grams: Option<f64>,
    pub carb_grams: Option<f64>,
    pub fat_grams: Option<f64>,
}

/// Today's macro budget, in grams.
///
/// Each targeted macro carries its own credit against its smoothed intake,
/// spread over the days left in the cycle like the calorie budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroBudget {
    /// Base targets from the calorie base budget and the split
    pub targets: MacroTargets,
    /// Smoothed daily intake over the intake window
    pub smoothed_intake: MacroTargets,
    /// `target - smoothed intake`
    pub credit: MacroTargets,
    /// `target + credit / days left in cycle`
    pub adjusted: MacroTargets,
    /// `adjusted - consumed today`
    pub remaining: MacroTargets,
}

/// A logged food entry; any one value may be missing and derived from the others
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carb_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_grams: Option<f64>,
    /// Pure alcohol, treated as 0 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alcohol_grams: Option<f64>,
}

/// Quantity a sample measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    DietaryEnergy,
    BodyMass,
    Protein,
    Carbohydrates,
    Fat,
}

impl SampleKind {
    pub const ALL: [SampleKind; 5] = [
        SampleKind::DietaryEnergy,
        SampleKind::BodyMass,
        SampleKind::Protein,
        SampleKind::Carbohydrates,
        SampleKind::Fat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::DietaryEnergy => "dietary_energy",
            SampleKind::BodyMass => "body_mass",
            SampleKind::Protein => "protein",
            SampleKind::Carbohydrates => "carbohydrates",
            SampleKind::Fat => "fat",
        }
    }

    pub fn from_name(value: &str) -> Option<SampleKind> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Unit stored sample values are expressed in
    pub fn storage_unit(&self) -> Unit {
        match self {
            SampleKind::DietaryEnergy => Unit::Kilocalorie,
            SampleKind::BodyMass => Unit::Kilogram,
            // Macro amounts stay in grams
            SampleKind::Protein | SampleKind::Carbohydrates | SampleKind::Fat => Unit::Gram,
        }
    }

    /// How samples of this kind combine within a bucket
    pub fn aggregation(&self) -> Aggregation {
        match self {
            SampleKind::BodyMass => Aggregation::Mean,
            _ => Aggregation::Sum,
        }
    }
}

/// Samples partitioned by kind, values in each kind's storage unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    #[serde(default)]
    pub dietary_energy: Vec<Sample>,
    #[serde(default)]
    pub body_mass: Vec<Sample>,
    #[serde(default)]
    pub protein: Vec<Sample>,
    #[serde(default)]
    pub carbohydrates: Vec<Sample>,
    #[serde(default)]
    pub fat: Vec<Sample>,
}

impl SampleSet {
    pub fn get(&self, kind: SampleKind) -> &[Sample] {
        match kind {
            SampleKind::DietaryEnergy => &self.dietary_energy,
            SampleKind::BodyMass => &self.body_mass,
            SampleKind::Protein => &self.protein,
            SampleKind::Carbohydrates => &self.carbohydrates,
            SampleKind::Fat => &self.fat,
        }
    }

    pub fn push(&mut self, kind: SampleKind, sample: Sample) {
        match kind {
            SampleKind::DietaryEnergy => self.dietary_energy.push(sample),
            SampleKind::BodyMass => self.body_mass.push(sample),
            SampleKind::Protein => self.protein.push(sample),
            SampleKind::Carbohydrates => self.carbohydrates.push(sample),
            SampleKind::Fat => self.fat.push(sample),
        }
    }

    /// Append every sample of `other`
    pub fn extend(&mut self, other: SampleSet) {
        self.dietary_energy.extend(other.dietary_energy);
        self.body_mass.extend(other.body_mass);
        self.protein.extend(other.protein);
        self.carbohydrates.extend(other.carbohydrates);
        self.fat.extend(other.fat);
    }

    pub fn len(&self) -> usize {
        SampleKind::ALL.iter().map(|kind| self.get(*kind).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
