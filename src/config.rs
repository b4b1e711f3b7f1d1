//! Engine configuration
//!
//! User goal parameters and engine tuning, passed explicitly into the pipeline.
//! Every field has a default so partial JSON documents are accepted.

use crate::budget::DEFAULT_CYCLE_LENGTH_DAYS;
use crate::error::ComputeError;
use crate::maintenance::{DEFAULT_ENERGY_DENSITY_KCAL_PER_KG, DEFAULT_MIN_WEIGHT_SPAN_DAYS};
use crate::smoothing::{DEFAULT_INTAKE_ALPHA, DEFAULT_WEIGHT_ALPHA};
use crate::types::{BudgetCycle, MacroSplit, UnloggedDayPolicy};
use crate::units::{Dimension, Unit};
use chrono::{FixedOffset, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Default trailing intake window (days, ending yesterday)
pub const DEFAULT_INTAKE_WINDOW_DAYS: u32 = 7;

/// Default trailing weight window (days before today)
pub const DEFAULT_WEIGHT_WINDOW_DAYS: u32 = 14;

/// Longest accepted history window (one leap year)
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Anchor used when none is configured; a Monday
fn default_cycle_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2001, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// The user's goal settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    /// Signed kcal/day offset from maintenance (negative to lose weight)
    pub adjustment_kcal: f64,
    /// Macro percent split, if the user set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_split: Option<MacroSplit>,
    /// Weekday budget cycles start on
    pub first_weekday: Weekday,
    /// Date cycles are laid out from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_anchor: Option<NaiveDate>,
    pub cycle_length_days: u32,
    pub unlogged_day_policy: UnloggedDayPolicy,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            adjustment_kcal: 0.0,
            macro_split: None,
            first_weekday: Weekday::Mon,
            cycle_anchor: None,
            cycle_length_days: DEFAULT_CYCLE_LENGTH_DAYS,
            unlogged_day_policy: UnloggedDayPolicy::default(),
        }
    }
}

impl GoalConfig {
    pub fn budget_cycle(&self) -> BudgetCycle {
        BudgetCycle::new(
            self.first_weekday,
            self.cycle_anchor.unwrap_or_else(default_cycle_anchor),
        )
        .with_length(self.cycle_length_days)
    }
}

/// Units used when presenting results
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayUnits {
    pub mass: Unit,
    pub energy: Unit,
}

impl Default for DisplayUnits {
    fn default() -> Self {
        Self {
            mass: Unit::Kilogram,
            energy: Unit::Kilocalorie,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// EWMA factor for daily intake
    pub intake_alpha: f64,
    /// EWMA factor for daily weight before regression
    pub weight_alpha: f64,
    pub intake_window_days: u32,
    pub weight_window_days: u32,
    pub min_weight_span_days: i64,
    /// kcal per kg of body-mass change
    pub energy_density_kcal_per_kg: f64,
    /// "UTC" or a fixed offset such as "+02:00"
    pub timezone: String,
    pub goal: GoalConfig,
    pub display: DisplayUnits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intake_alpha: DEFAULT_INTAKE_ALPHA,
            weight_alpha: DEFAULT_WEIGHT_ALPHA,
            intake_window_days: DEFAULT_INTAKE_WINDOW_DAYS,
            weight_window_days: DEFAULT_WEIGHT_WINDOW_DAYS,
            min_weight_span_days: DEFAULT_MIN_WEIGHT_SPAN_DAYS,
            energy_density_kcal_per_kg: DEFAULT_ENERGY_DENSITY_KCAL_PER_KG,
            timezone: "UTC".to_string(),
            goal: GoalConfig::default(),
            display: DisplayUnits::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The configured timezone as a fixed offset
    pub fn tz(&self) -> Result<FixedOffset, ComputeError> {
        parse_timezone(&self.timezone)
    }

    /// Reject configurations that would make the engine's output meaningless
    pub fn validate(&self) -> Result<(), ComputeError> {
        for alpha in [self.intake_alpha, self.weight_alpha] {
            if !(alpha.is_finite() && alpha > 0.0 && alpha <= 1.0) {
                return Err(ComputeError::InvalidAlpha(alpha));
            }
        }

        for (name, days) in [
            ("intake_window_days", self.intake_window_days),
            ("weight_window_days", self.weight_window_days),
        ] {
            if !(1..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(ComputeError::ParseError(format!(
                    "{name} must be between 1 and {MAX_WINDOW_DAYS}, got {days}"
                )));
            }
        }

        // The span can never exceed the weight window it is measured in
        let max_span = i64::from(self.weight_window_days);
        if !(1..=max_span).contains(&self.min_weight_span_days) {
            return Err(ComputeError::ParseError(format!(
                "min_weight_span_days must be between 1 and {max_span}, got {}",
                self.min_weight_span_days
            )));
        }

        if !(self.energy_density_kcal_per_kg.is_finite() && self.energy_density_kcal_per_kg > 0.0)
        {
            return Err(ComputeError::ParseError(format!(
                "energy density must be positive, got {}",
                self.energy_density_kcal_per_kg
            )));
        }

        if !self.goal.adjustment_kcal.is_finite() {
            return Err(ComputeError::ParseError(
                "adjustment must be a finite number".to_string(),
            ));
        }

        check_dimension(self.display.mass, Dimension::Mass)?;
        check_dimension(self.display.energy, Dimension::Energy)?;

        if let Some(split) = &self.goal.macro_split {
            split.validate()?;
        }

        self.goal.budget_cycle().validate()?;
        self.tz()?;

        Ok(())
    }
}

fn check_dimension(unit: Unit, expected: Dimension) -> Result<(), ComputeError> {
    if unit.dimension() == expected {
        Ok(())
    } else {
        Err(ComputeError::IncompatibleDimension {
            from: unit.symbol().to_string(),
            to: expected.base_unit().symbol().to_string(),
        })
    }
}

/// Parse "UTC", "Z", or a fixed offset like "+02:00", "-0530", "+09"
pub fn parse_timezone(value: &str) -> Result<FixedOffset, ComputeError> {
    let trimmed = value.trim();
    let invalid = || ComputeError::InvalidTimezone(value.to_string());

    if trimmed.eq_ignore_ascii_case("utc") || trimmed.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };

    if hours > 14 || minutes >= 60 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.intake_alpha, 0.25);
        assert_eq!(config.energy_density_kcal_per_kg, 7700.0);
        assert_eq!(config.intake_window_days, 7);
        assert_eq!(config.weight_window_days, 14);
        assert_eq!(config.goal.cycle_length_days, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(
            r#"{
                "timezone": "+02:00",
                "goal": {
                    "adjustment_kcal": -500,
                    "first_weekday": "Sun",
                    "macro_split": { "protein_pct": 40, "carb_pct": 30, "fat_pct": 30 }
                },
                "display": { "mass": "lb" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.goal.adjustment_kcal, -500.0);
        assert_eq!(config.goal.first_weekday, Weekday::Sun);
        assert_eq!(config.goal.cycle_length_days, 7);
        assert_eq!(config.display.mass, Unit::Pound);
        assert_eq!(config.display.energy, Unit::Kilocalorie);
        assert_eq!(config.weight_alpha, 0.25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EngineConfig::default();
        config.goal.adjustment_kcal = 250.0;
        config.goal.cycle_anchor = NaiveDate::from_ymd_opt(2024, 1, 3);

        let json = config.to_json().unwrap();
        let loaded = EngineConfig::from_json(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validation_failures() {
        let bad_alpha = EngineConfig {
            intake_alpha: 0.0,
            ..Default::default()
        };
        assert!(matches!(bad_alpha.validate(), Err(ComputeError::InvalidAlpha(_))));

        let bad_display = EngineConfig {
            display: DisplayUnits {
                mass: Unit::Kilojoule,
                energy: Unit::Kilocalorie,
            },
            ..Default::default()
        };
        assert!(matches!(
            bad_display.validate(),
            Err(ComputeError::IncompatibleDimension { .. })
        ));

        let mut bad_split = EngineConfig::default();
        bad_split.goal.macro_split = Some(MacroSplit::new(50.0, 30.0, 30.0));
        assert!(matches!(bad_split.validate(), Err(ComputeError::InvalidSplit(_))));

        let bad_tz = EngineConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(matches!(bad_tz.validate(), Err(ComputeError::InvalidTimezone(_))));
    }

    #[test]
    fn test_history_lengths_are_bounded() {
        let huge_cycle =
            EngineConfig::from_json(r#"{"goal": {"cycle_length_days": 200000000}}"#).unwrap();
        assert!(matches!(huge_cycle.validate(), Err(ComputeError::InvalidCycle(_))));

        for json in [
            r#"{"weight_window_days": 4000000000}"#,
            r#"{"intake_window_days": 367}"#,
            r#"{"intake_window_days": 0}"#,
        ] {
            let config = EngineConfig::from_json(json).unwrap();
            assert!(
                matches!(config.validate(), Err(ComputeError::ParseError(_))),
                "{json} should be rejected"
            );
        }

        let year = EngineConfig::from_json(
            r#"{
                "intake_window_days": 366,
                "weight_window_days": 366,
                "goal": { "cycle_length_days": 366 }
            }"#,
        )
        .unwrap();
        assert!(year.validate().is_ok());
    }

    #[test]
    fn test_min_weight_span_must_be_positive() {
        for span in [-5, 0] {
            let config = EngineConfig {
                min_weight_span_days: span,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ComputeError::ParseError(_))),
                "span {span} should be rejected"
            );
        }

        // Longer than the weight window: no estimate could ever be valid
        let unreachable = EngineConfig {
            min_weight_span_days: 15,
            ..Default::default()
        };
        assert!(unreachable.validate().is_err());

        let shortest = EngineConfig {
            min_weight_span_days: 1,
            ..Default::default()
        };
        assert!(shortest.validate().is_ok());
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_timezone("z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_timezone("+02:00").unwrap().local_minus_utc(), 7200);
        assert_eq!(parse_timezone("-0530").unwrap().local_minus_utc(), -19_800);
        assert_eq!(parse_timezone("+9").unwrap().local_minus_utc(), 32_400);

        for bad in ["", "America/New_York", "+25:00", "+02:75", "+123"] {
            assert!(parse_timezone(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_default_anchor_is_stable() {
        let goal = GoalConfig::default();
        let cycle = goal.budget_cycle();
        assert_eq!(cycle.anchor_date, NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());
        assert_eq!(cycle.first_weekday, Weekday::Mon);
    }
}
