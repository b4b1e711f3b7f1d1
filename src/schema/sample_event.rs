//! health.sample.v1 schema definition
//!
//! One event per logged measurement, in whatever unit the host recorded it:
//! - Dietary energy (kcal, kJ, cal)
//! - Body mass (kg, g, lb, st)
//! - Macro amounts: protein, carbohydrates, fat (any mass unit)
//!
//! Values are normalised to each kind's storage unit on conversion to a `Sample`.

use crate::types::{Sample, SampleKind, SourceTag};
use crate::units::{self, Unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "health.sample.v1";

fn default_source() -> SourceTag {
    SourceTag::Local
}

/// The health.sample.v1 event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEvent {
    /// Schema version identifier
    pub schema_version: String,
    /// Unique event identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// When the measurement was taken (UTC)
    pub timestamp: DateTime<Utc>,
    /// What was measured
    pub kind: SampleKind,
    pub value: f64,
    /// Unit symbol, e.g. "kcal", "lb", "g"
    pub unit: String,
    #[serde(default = "default_source")]
    pub source: SourceTag,
}

impl SampleEvent {
    /// Create a new event with a fresh event id
    pub fn new(
        timestamp: DateTime<Utc>,
        kind: SampleKind,
        value: f64,
        unit: Unit,
        source: SourceTag,
    ) -> Self {
        SampleEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            event_id: Some(uuid::Uuid::new_v4().to_string()),
            timestamp,
            kind,
            value,
            unit: unit.symbol().to_string(),
            source,
        }
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Validate the event schema
    pub fn validate(&self) -> Result<Unit, ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        let unit = Unit::from_symbol(&self.unit)
            .ok_or_else(|| ValidationError::UnknownUnit(self.unit.clone()))?;

        if unit.dimension() != self.kind.storage_unit().dimension() {
            return Err(ValidationError::UnitKindMismatch {
                kind: self.kind.as_str().to_string(),
                unit: self.unit.clone(),
            });
        }

        if !self.value.is_finite() {
            return Err(ValidationError::NonFiniteValue(self.value));
        }

        if self.value < 0.0 {
            return Err(ValidationError::NegativeValue {
                kind: self.kind.as_str().to_string(),
                value: self.value,
            });
        }

        Ok(unit)
    }

    /// Validate and convert to a sample in the kind's storage unit
    pub fn to_sample(&self) -> Result<Sample, ValidationError> {
        let unit = self.validate()?;
        let value = units::convert(self.value, unit, self.kind.storage_unit()).map_err(|_| {
            ValidationError::UnitKindMismatch {
                kind: self.kind.as_str().to_string(),
                unit: self.unit.clone(),
            }
        })?;

        Ok(Sample::new(self.timestamp, value, self.source.clone()))
    }
}

/// Validation errors for sample events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Unit {unit} cannot measure {kind}")]
    UnitKindMismatch { kind: String, unit: String },

    #[error("Value must be finite, got {0}")]
    NonFiniteValue(f64),

    #[error("Negative {kind} value: {value}")]
    NegativeValue { kind: String, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp() -> DateTime<Utc> {
        "2024-01-15T08:30:00Z".parse::<DateTime<Utc>>().unwrap()
    }

    #[test]
    fn test_serialize_event() {
        let event = SampleEvent::new(
            timestamp(),
            SampleKind::BodyMass,
            176.4,
            Unit::Pound,
            SourceTag::HealthKit,
        );
        let json = serde_json::to_string_pretty(&event).unwrap();

        assert!(json.contains("health.sample.v1"));
        assert!(json.contains("body_mass"));
        assert!(json.contains("\"lb\""));
        assert!(json.contains("health_kit"));
        assert!(event.event_id.is_some());
    }

    #[test]
    fn test_deserialize_with_default_source() {
        let json = r#"{
            "schema_version": "health.sample.v1",
            "timestamp": "2024-01-15T08:30:00Z",
            "kind": "dietary_energy",
            "value": 2090,
            "unit": "kj"
        }"#;

        let event: SampleEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.source, SourceTag::Local);
        assert_eq!(event.event_id, None);

        let sample = event.to_sample().unwrap();
        assert!((sample.value - 2090.0 / 4.184).abs() < 1e-9);
    }

    #[test]
    fn test_macro_grams_stay_grams() {
        let event = SampleEvent::new(
            timestamp(),
            SampleKind::Protein,
            1.5,
            Unit::Kilogram,
            SourceTag::Local,
        );
        let sample = event.to_sample().unwrap();
        assert!((sample.value - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_validation_errors() {
        let good = SampleEvent::new(
            timestamp(),
            SampleKind::BodyMass,
            80.0,
            Unit::Kilogram,
            SourceTag::Local,
        );
        assert_eq!(good.validate(), Ok(Unit::Kilogram));

        let wrong_version = SampleEvent {
            schema_version: "health.sample.v0".to_string(),
            ..good.clone()
        };
        assert!(matches!(
            wrong_version.validate(),
            Err(ValidationError::InvalidSchemaVersion { .. })
        ));

        let wrong_unit = SampleEvent {
            unit: "kcal".to_string(),
            ..good.clone()
        };
        assert!(matches!(
            wrong_unit.validate(),
            Err(ValidationError::UnitKindMismatch { .. })
        ));

        let unknown_unit = SampleEvent {
            unit: "furlong".to_string(),
            ..good.clone()
        };
        assert_eq!(
            unknown_unit.validate(),
            Err(ValidationError::UnknownUnit("furlong".to_string()))
        );

        let infinite = SampleEvent {
            value: f64::INFINITY,
            ..good.clone()
        };
        assert!(matches!(infinite.validate(), Err(ValidationError::NonFiniteValue(_))));

        let negative = SampleEvent {
            value: -2.0,
            ..good
        };
        assert!(matches!(negative.validate(), Err(ValidationError::NegativeValue { .. })));
    }
}
