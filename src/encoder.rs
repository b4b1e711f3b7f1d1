//! Report encoding
//!
//! This module encodes an analytics snapshot into the budget report JSON
//! consumed by the host app. Energies and masses are converted to the user's
//! display units here and nowhere else; the weight trend is presented per week.

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::pipeline::AnalyticsSnapshot;
use crate::types::MacroTargets;
use crate::units::{self, Unit};
use crate::{KCAL_FLUX_VERSION, PRODUCER_NAME};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Days per presentation week
const DAYS_PER_WEEK: f64 = 7.0;

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Provenance of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub computed_at_utc: String,
    pub timezone: String,
    /// Intake days that fed the smoothed intake
    pub intake_days: usize,
    /// Weight days that fed the trend
    pub weight_days: usize,
}

/// Units every magnitude in the report is expressed in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportUnits {
    pub mass: String,
    pub energy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportIntake {
    pub smoothed_per_day: Option<f64>,
    pub consumed_today: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWeight {
    /// Latest smoothed weight
    pub current: Option<f64>,
    /// Trend in display mass units per week
    pub trend_per_week: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMaintenance {
    pub per_day: Option<f64>,
    pub valid: bool,
    pub weight_span_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBudget {
    pub available: bool,
    pub base: Option<f64>,
    pub adjustment: f64,
    pub carry_over: f64,
    pub remaining: Option<f64>,
    /// Base budget with the carry-over spread over the rest of the cycle
    pub spread_allowance: Option<f64>,
    pub days_left_in_cycle: u32,
    pub cycle_start: NaiveDate,
    /// Exclusive
    pub cycle_end: NaiveDate,
}

/// Macro amounts, always in grams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMacros {
    pub targets: Option<MacroTargets>,
    pub smoothed_intake: Option<MacroTargets>,
    pub credit: Option<MacroTargets>,
    /// Targets with the credit spread over the rest of the cycle
    pub adjusted: Option<MacroTargets>,
    pub consumed_today: MacroTargets,
    pub remaining: Option<MacroTargets>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWeek {
    pub week_start: NaiveDate,
    pub intake: f64,
}

/// Complete budget report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub date: NaiveDate,
    pub units: ReportUnits,
    pub intake: ReportIntake,
    pub weight: ReportWeight,
    pub maintenance: ReportMaintenance,
    pub budget: ReportBudget,
    pub macros: ReportMacros,
    pub weekly_intake: Vec<ReportWeek>,
}

/// Report encoder for producing the host-facing JSON payload
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a snapshot into a report
    pub fn encode(
        &self,
        snapshot: &AnalyticsSnapshot,
        config: &EngineConfig,
    ) -> Result<BudgetReport, ComputeError> {
        let mass = config.display.mass;
        let energy = config.display.energy;
        let to_energy = |kcal: f64| units::convert(kcal, Unit::Kilocalorie, energy);
        let to_energy_opt = |kcal: Option<f64>| kcal.map(to_energy).transpose();

        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: KCAL_FLUX_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            computed_at_utc: Utc::now().to_rfc3339(),
            timezone: config.timezone.clone(),
            intake_days: snapshot.smoothed_intake.len(),
            weight_days: snapshot.smoothed_weight.len(),
        };

        let intake = ReportIntake {
            smoothed_per_day: to_energy_opt(snapshot.smoothed_intake.current())?,
            consumed_today: to_energy(snapshot.budget.consumed_today)?,
        };

        let weight = ReportWeight {
            current: snapshot
                .current_weight()
                .map(|kg| units::convert(kg, Unit::Kilogram, mass))
                .transpose()?,
            trend_per_week: units::convert(
                snapshot.weight_trend.slope_per_day * DAYS_PER_WEEK,
                Unit::Kilogram,
                mass,
            )?,
        };

        let maintenance = ReportMaintenance {
            per_day: to_energy_opt(snapshot.maintenance.usable())?,
            valid: snapshot.maintenance.is_valid,
            weight_span_days: snapshot.maintenance.weight_span_days,
        };

        let budget = &snapshot.budget;
        let report_budget = ReportBudget {
            available: budget.is_available(),
            base: to_energy_opt(budget.base_budget)?,
            adjustment: to_energy(budget.adjustment)?,
            carry_over: to_energy(budget.carry_over_credit)?,
            remaining: to_energy_opt(budget.remaining())?,
            spread_allowance: to_energy_opt(budget.spread_allowance())?,
            days_left_in_cycle: budget.days_left_in_cycle,
            cycle_start: budget.cycle.start,
            cycle_end: budget.cycle.end,
        };

        let macro_budget = snapshot.macro_budget.as_ref();
        let macros = ReportMacros {
            targets: macro_budget.map(|b| b.targets),
            smoothed_intake: macro_budget.map(|b| b.smoothed_intake),
            credit: macro_budget.map(|b| b.credit),
            adjusted: macro_budget.map(|b| b.adjusted),
            consumed_today: snapshot.macros_consumed_today,
            remaining: macro_budget.map(|b| b.remaining),
        };

        let weekly_intake = snapshot
            .weekly_intake
            .iter()
            .map(|(week_start, kcal)| {
                Ok(ReportWeek {
                    week_start,
                    intake: to_energy(kcal)?,
                })
            })
            .collect::<Result<Vec<_>, ComputeError>>()?;

        Ok(BudgetReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            date: snapshot.today,
            units: ReportUnits {
                mass: mass.symbol().to_string(),
                energy: energy.symbol().to_string(),
            },
            intake,
            weight,
            maintenance,
            budget: report_budget,
            macros,
            weekly_intake,
        })
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        snapshot: &AnalyticsSnapshot,
        config: &EngineConfig,
    ) -> Result<String, ComputeError> {
        let report = self.encode(snapshot, config)?;
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}
