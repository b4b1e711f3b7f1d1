//! Unit conversion
//!
//! Every magnitude inside the engine is kept in one base unit per dimension:
//! - Mass: kilograms
//! - Energy: kilocalories
//! - Duration: seconds
//! - Temperature: degrees Celsius
//!
//! Conversion is affine: `base = value * coefficient + constant`. The constant is
//! zero for every ratio scale and only used by temperature.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Physical dimension of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Mass,
    Energy,
    Duration,
    Temperature,
}

impl Dimension {
    /// The canonical unit values of this dimension are stored in
    pub fn base_unit(&self) -> Unit {
        match self {
            Dimension::Mass => Unit::Kilogram,
            Dimension::Energy => Unit::Kilocalorie,
            Dimension::Duration => Unit::Second,
            Dimension::Temperature => Unit::Celsius,
        }
    }
}

/// Supported measurement units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    // Mass
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "lb")]
    Pound,
    #[serde(rename = "st")]
    Stone,

    // Energy
    #[serde(rename = "kcal")]
    Kilocalorie,
    #[serde(rename = "kj")]
    Kilojoule,
    #[serde(rename = "cal")]
    Calorie,

    // Duration
    #[serde(rename = "s")]
    Second,
    #[serde(rename = "min")]
    Minute,
    #[serde(rename = "h")]
    Hour,
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "wk")]
    Week,

    // Temperature
    #[serde(rename = "celsius")]
    Celsius,
    #[serde(rename = "fahrenheit")]
    Fahrenheit,
    #[serde(rename = "kelvin")]
    Kelvin,
}

/// Kilograms per avoirdupois pound
const KG_PER_POUND: f64 = 0.453_592_37;
/// Kilojoules per thermochemical kilocalorie
const KJ_PER_KCAL: f64 = 4.184;
const SECONDS_PER_DAY: f64 = 86_400.0;

impl Unit {
    pub const ALL: [Unit; 15] = [
        Unit::Kilogram,
        Unit::Gram,
        Unit::Pound,
        Unit::Stone,
        Unit::Kilocalorie,
        Unit::Kilojoule,
        Unit::Calorie,
        Unit::Second,
        Unit::Minute,
        Unit::Hour,
        Unit::Day,
        Unit::Week,
        Unit::Celsius,
        Unit::Fahrenheit,
        Unit::Kelvin,
    ];

    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Kilogram | Unit::Gram | Unit::Pound | Unit::Stone => Dimension::Mass,
            Unit::Kilocalorie | Unit::Kilojoule | Unit::Calorie => Dimension::Energy,
            Unit::Second | Unit::Minute | Unit::Hour | Unit::Day | Unit::Week => {
                Dimension::Duration
            }
            Unit::Celsius | Unit::Fahrenheit | Unit::Kelvin => Dimension::Temperature,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Kilogram => "kg",
            Unit::Gram => "g",
            Unit::Pound => "lb",
            Unit::Stone => "st",
            Unit::Kilocalorie => "kcal",
            Unit::Kilojoule => "kj",
            Unit::Calorie => "cal",
            Unit::Second => "s",
            Unit::Minute => "min",
            Unit::Hour => "h",
            Unit::Day => "d",
            Unit::Week => "wk",
            Unit::Celsius => "celsius",
            Unit::Fahrenheit => "fahrenheit",
            Unit::Kelvin => "kelvin",
        }
    }

    /// Look a unit up by its symbol
    pub fn from_symbol(symbol: &str) -> Option<Unit> {
        let symbol = symbol.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|unit| unit.symbol() == symbol)
    }

    pub fn is_base(&self) -> bool {
        self.dimension().base_unit() == *self
    }

    /// Multiplier into the base unit
    fn coefficient(&self) -> f64 {
        match self {
            Unit::Kilogram => 1.0,
            Unit::Gram => 0.001,
            Unit::Pound => KG_PER_POUND,
            Unit::Stone => 14.0 * KG_PER_POUND,
            Unit::Kilocalorie => 1.0,
            Unit::Kilojoule => 1.0 / KJ_PER_KCAL,
            Unit::Calorie => 0.001,
            Unit::Second => 1.0,
            Unit::Minute => 60.0,
            Unit::Hour => 3_600.0,
            Unit::Day => SECONDS_PER_DAY,
            Unit::Week => 7.0 * SECONDS_PER_DAY,
            Unit::Celsius => 1.0,
            Unit::Fahrenheit => 5.0 / 9.0,
            Unit::Kelvin => 1.0,
        }
    }

    /// Offset added after scaling into the base unit
    fn constant(&self) -> f64 {
        match self {
            Unit::Fahrenheit => -32.0 * 5.0 / 9.0,
            Unit::Kelvin => -273.15,
            _ => 0.0,
        }
    }

    /// Convert a value in this unit to the base unit of its dimension
    pub fn to_base(&self, value: f64) -> f64 {
        value * self.coefficient() + self.constant()
    }

    /// Convert a base-unit value into this unit
    pub fn from_base(&self, base: f64) -> f64 {
        (base - self.constant()) / self.coefficient()
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Convert `value` from one unit to another of the same dimension
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64, ComputeError> {
    if from.dimension() != to.dimension() {
        return Err(ComputeError::IncompatibleDimension {
            from: from.symbol().to_string(),
            to: to.symbol().to_string(),
        });
    }
    if from == to {
        return Ok(value);
    }
    Ok(to.from_base(from.to_base(value)))
}

/// A value tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: Unit,
}

impl Measurement {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// The same quantity expressed in another unit
    pub fn converted_to(&self, unit: Unit) -> Result<Measurement, ComputeError> {
        Ok(Measurement::new(convert(self.value, self.unit, unit)?, unit))
    }

    /// The magnitude in the base unit of its dimension
    pub fn base_value(&self) -> f64 {
        self.unit.to_base(self.value)
    }
}
