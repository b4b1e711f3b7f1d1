//! Adapter for converting health.sample.v1 events to samples
//!
//! Parses event batches (JSON array or NDJSON), validates each event and
//! partitions the resulting base-unit samples by kind for the pipeline.

use crate::error::ComputeError;
use crate::schema::sample_event::*;
use crate::types::SampleSet;

/// Adapter for converting sample events to pipeline input
pub struct SampleEventAdapter;

impl SampleEventAdapter {
    /// Parse a JSON string containing an array of SampleEvents
    pub fn parse_array(json: &str) -> Result<Vec<SampleEvent>, ComputeError> {
        let events: Vec<SampleEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing SampleEvents
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SampleEvent>, ComputeError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let event = serde_json::from_str::<SampleEvent>(trimmed).map_err(|e| {
                ComputeError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
            })?;
            events.push(event);
        }
        Ok(events)
    }

    /// Parse either format, picking by the first non-whitespace character
    pub fn parse(input: &str) -> Result<Vec<SampleEvent>, ComputeError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate and convert events into samples partitioned by kind.
    ///
    /// The first invalid event aborts the conversion.
    pub fn to_samples(events: &[SampleEvent]) -> Result<SampleSet, ComputeError> {
        let mut samples = SampleSet::default();

        for (idx, event) in events.iter().enumerate() {
            let sample = event.to_sample().map_err(|e| {
                ComputeError::InvalidSample(match &event.event_id {
                    Some(id) => format!("event {idx} ({id}): {e}"),
                    None => format!("event {idx}: {e}"),
                })
            })?;
            samples.push(event.kind, sample);
        }

        Ok(samples)
    }

    /// Parse and convert in one step
    pub fn samples_from_json(input: &str) -> Result<SampleSet, ComputeError> {
        let events = Self::parse(input)?;
        Self::to_samples(&events)
    }

    /// Validate a batch of events, returning only the failures
    pub fn validate_events(events: &[SampleEvent]) -> Vec<ValidationResult> {
        events
            .iter()
            .enumerate()
            .filter_map(|(idx, event)| {
                event.validate().err().map(|error| ValidationResult {
                    index: idx,
                    event_id: event.event_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A failed event validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub event_id: Option<String>,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SampleKind, SourceTag};
    use crate::units::Unit;
    use chrono::{DateTime, Utc};

    fn create_test_events() -> Vec<SampleEvent> {
        let timestamp = "2024-01-15T08:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let event = |kind, value, unit, source| {
            SampleEvent::new(timestamp, kind, value, unit, source)
        };

        vec![
            event(SampleKind::DietaryEnergy, 650.0, Unit::Kilocalorie, SourceTag::Local),
            event(SampleKind::DietaryEnergy, 2092.0, Unit::Kilojoule, SourceTag::HealthKit),
            event(SampleKind::BodyMass, 12.5, Unit::Stone, SourceTag::HealthKit),
            event(SampleKind::Fat, 22.0, Unit::Gram, SourceTag::Local),
        ]
    }

    fn event_line(timestamp: &str, kind: &str, value: f64, unit: &str) -> String {
        serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "timestamp": timestamp,
            "kind": kind,
            "value": value,
            "unit": unit
        })
        .to_string()
    }

    #[test]
    fn test_to_samples() {
        let samples = SampleEventAdapter::to_samples(&create_test_events()).unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples.dietary_energy.len(), 2);
        assert_eq!(samples.dietary_energy[0].value, 650.0);
        assert!((samples.dietary_energy[1].value - 500.0).abs() < 1e-9);
        assert!((samples.body_mass[0].value - 79.378_664_75).abs() < 1e-6);
        assert_eq!(samples.body_mass[0].source, SourceTag::HealthKit);
        assert_eq!(samples.fat[0].value, 22.0);
        assert!(samples.protein.is_empty());
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = format!(
            "{}\n\n{}",
            event_line("2024-01-15T08:00:00Z", "body_mass", 80.1, "kg"),
            event_line("2024-01-16T08:00:00Z", "body_mass", 80.0, "kg")
        );

        let events = SampleEventAdapter::parse_ndjson(&ndjson).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(SampleEventAdapter::parse(&ndjson).unwrap(), events);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = format!(
            "{}\nnot json",
            event_line("2024-01-15T08:00:00Z", "fat", 1.0, "g")
        );

        let err = SampleEventAdapter::parse_ndjson(&ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array() {
        let json = serde_json::to_string(&create_test_events()).unwrap();
        let events = SampleEventAdapter::parse(&json).unwrap();
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_validate_events() {
        let mut events = create_test_events();
        assert!(SampleEventAdapter::validate_events(&events).is_empty());

        events[2].unit = "kcal".to_string();
        events[3] = events[3].clone().with_event_id("fat-1");
        events[3].schema_version = "health.sample.v0".to_string();

        let results = SampleEventAdapter::validate_events(&events);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 2);
        assert!(matches!(results[0].error, ValidationError::UnitKindMismatch { .. }));
        assert_eq!(results[1].event_id.as_deref(), Some("fat-1"));
    }

    #[test]
    fn test_invalid_event_aborts_conversion() {
        let mut events = create_test_events();
        events[1].value = -10.0;

        let err = SampleEventAdapter::to_samples(&events).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidSample(_)));
        assert!(err.to_string().contains("event 1"));
    }
}
