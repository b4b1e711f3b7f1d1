//! Budget computation
//!
//! This module turns a maintenance estimate and the user's goal into a day's
//! calorie budget within a fixed-length accounting cycle:
//! - Base budget: maintenance + adjustment
//! - Carry-over: unused (or overused) base budget from earlier days of the cycle
//! - Remaining: base + carry-over - consumed today
//!
//! Nothing is clamped here; a negative base budget is returned as-is.

use crate::bucketing::Calendar;
use crate::error::ComputeError;
use crate::types::{Budget, BudgetCycle, CycleWindow, UnloggedDayPolicy};
use chrono::{Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// Default cycle length (one week)
pub const DEFAULT_CYCLE_LENGTH_DAYS: u32 = 7;

/// Longest accepted cycle (one leap year)
pub const MAX_CYCLE_LENGTH_DAYS: u32 = 366;

/// Map a weekday number (1 = Sunday ... 7 = Saturday) to a weekday
pub fn weekday_from_number(number: u8) -> Option<Weekday> {
    match number {
        1 => Some(Weekday::Sun),
        2 => Some(Weekday::Mon),
        3 => Some(Weekday::Tue),
        4 => Some(Weekday::Wed),
        5 => Some(Weekday::Thu),
        6 => Some(Weekday::Fri),
        7 => Some(Weekday::Sat),
        _ => None,
    }
}

impl BudgetCycle {
    /// A weekly cycle starting on `first_weekday`
    pub fn new(first_weekday: Weekday, anchor_date: NaiveDate) -> Self {
        Self {
            cycle_length_days: DEFAULT_CYCLE_LENGTH_DAYS,
            first_weekday,
            anchor_date,
        }
    }

    pub fn with_length(mut self, cycle_length_days: u32) -> Self {
        self.cycle_length_days = cycle_length_days;
        self
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.cycle_length_days == 0 {
            return Err(ComputeError::InvalidCycle(
                "cycle length must be at least one day".to_string(),
            ));
        }
        if self.cycle_length_days > MAX_CYCLE_LENGTH_DAYS {
            return Err(ComputeError::InvalidCycle(format!(
                "cycle length must be at most {MAX_CYCLE_LENGTH_DAYS} days, got {}",
                self.cycle_length_days
            )));
        }
        Ok(())
    }

    /// The cycle start at or before the anchor that falls on the first weekday
    pub fn aligned_start(&self) -> NaiveDate {
        Calendar::new(self.first_weekday).start_of_week(self.anchor_date)
    }

    /// The unique cycle instance containing `today`
    pub fn window_containing(&self, today: NaiveDate) -> Result<CycleWindow, ComputeError> {
        self.validate()?;

        let length = self.cycle_length_days as i64;
        let origin = self.aligned_start();
        // Whole cycles between the origin and today, rounding toward -inf
        let cycles = (today - origin).num_days().div_euclid(length);
        let out_of_range = || {
            ComputeError::InvalidCycle(format!(
                "cycle containing {today} falls outside the supported calendar"
            ))
        };
        let start = origin
            .checked_add_signed(Duration::days(cycles * length))
            .ok_or_else(out_of_range)?;
        let end = start
            .checked_add_signed(Duration::days(length))
            .ok_or_else(out_of_range)?;

        Ok(CycleWindow { start, end })
    }
}

/// Budget engine; stateless apart from the unlogged-day policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetEngine {
    pub unlogged_day_policy: UnloggedDayPolicy,
}

impl BudgetEngine {
    pub fn new(unlogged_day_policy: UnloggedDayPolicy) -> Self {
        Self {
            unlogged_day_policy,
        }
    }

    /// Compute today's budget.
    ///
    /// `consumed` maps local dates to intake totals (kcal). Entries outside the
    /// cycle containing `today` are ignored. With the default policy a prior
    /// cycle day without an entry earns its full base budget as credit.
    pub fn compute_budget(
        &self,
        maintenance: Option<f64>,
        adjustment: f64,
        cycle: &BudgetCycle,
        consumed: &BTreeMap<NaiveDate, f64>,
        today: NaiveDate,
    ) -> Result<Budget, ComputeError> {
        let window = cycle.window_containing(today)?;
        let base_budget = maintenance.map(|m| m + adjustment);

        let carry_over_credit = match base_budget {
            Some(base) => window
                .days_before(today)
                .map(|day| match consumed.get(&day) {
                    Some(eaten) => base - eaten,
                    None => match self.unlogged_day_policy {
                        UnloggedDayPolicy::FullCredit => base,
                        UnloggedDayPolicy::NoCredit => 0.0,
                    },
                })
                .sum::<f64>(),
            None => 0.0,
        };

        Ok(Budget {
            base_budget,
            adjustment,
            days_left_in_cycle: window.days_left(today),
            carry_over_credit,
            consumed_today: consumed.get(&today).copied().unwrap_or(0.0),
            cycle: window,
        })
    }
}
