/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Event validation.
//!
//! Validation checks a batch before it is submitted and migrates the
//! deprecated top-level `row` / `col` fields into `axes["row"]` /
//! `axes["column"]`. Migration mutates the caller's events in place and is
//! reported both as a returned [`ValidationWarning`] and a `tracing` warning.

use super::axes::{COLUMN_AXIS, ROW_AXIS};
use super::record::{AcquisitionEvent, EventBatch};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Errors raised when a submission is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A list of events was supplied but it was empty.
    #[error("events list cannot be empty")]
    EmptyBatch,

    /// The submission was neither an event nor a list of events.
    #[error("events must be a dictionary or a list of dictionaries")]
    NotAnEventOrList,

    /// A list member was not an event dictionary.
    #[error("event at index {index} is not a dictionary")]
    NotAnEvent {
        /// Position of the offending member.
        index: usize,
    },

    /// An event had no `axes` entry.
    #[error("event at index {index} must contain an 'axes' key")]
    MissingAxes {
        /// Position of the offending event.
        index: usize,
    },

    /// An event had the right shape but a field had the wrong type.
    #[error("event at index {index} is malformed: {message}")]
    Malformed {
        /// Position of the offending event.
        index: usize,
        /// Deserializer message.
        message: String,
    },
}

/// Deprecated field that was migrated during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeprecatedField {
    /// Top-level `row`, moved to `axes["row"]`.
    Row,
    /// Top-level `col`, moved to `axes["column"]`.
    Col,
}

impl DeprecatedField {
    fn key(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Col => "col",
        }
    }

    fn axis(self) -> &'static str {
        match self {
            Self::Row => ROW_AXIS,
            Self::Col => COLUMN_AXIS,
        }
    }
}

/// A non-fatal finding produced by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Index of the event within its batch.
    pub index: usize,
    /// The deprecated field that was folded into the axes.
    pub field: DeprecatedField,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "adding '{}' as a top level key in the event is deprecated; add '{}' to the 'axes' \
             of event {} instead",
            self.field.key(),
            self.field.axis(),
            self.index
        )
    }
}

/// Validates a batch of typed events, migrating deprecated fields in place.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyBatch`] for an empty list.
///
/// # Examples
///
/// ```
/// use acquisition_rs::event::{validate, AcquisitionEvent, AxisValue, Axes, EventBatch};
///
/// let mut event = AcquisitionEvent::new(Axes::new());
/// event.row = Some(AxisValue::Index(2));
/// let mut batch = EventBatch::from(event);
///
/// let warnings = validate(&mut batch).unwrap();
/// assert_eq!(warnings.len(), 1);
/// let migrated = batch.iter().next().unwrap();
/// assert_eq!(migrated.axes.get("row"), Some(&AxisValue::Index(2)));
/// assert!(migrated.row.is_none());
/// ```
pub fn validate(batch: &mut EventBatch) -> Result<Vec<ValidationWarning>, ValidationError> {
    if batch.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    let mut warnings = Vec::new();
    for (index, event) in batch.iter_mut().enumerate() {
        migrate_event(index, event, &mut warnings);
    }
    Ok(warnings)
}

fn migrate_event(index: usize, event: &mut AcquisitionEvent, warnings: &mut Vec<ValidationWarning>) {
    if let Some(row) = event.row.take() {
        event.axes.insert(ROW_AXIS, row);
        record(index, DeprecatedField::Row, warnings);
    }
    if let Some(col) = event.col.take() {
        event.axes.insert(COLUMN_AXIS, col);
        record(index, DeprecatedField::Col, warnings);
    }
}

fn record(index: usize, field: DeprecatedField, warnings: &mut Vec<ValidationWarning>) {
    let warning = ValidationWarning { index, field };
    warn!(index, field = field.key(), "{warning}");
    warnings.push(warning);
}

/// Validates an untyped JSON submission and converts it to an [`EventBatch`].
///
/// Accepts a single JSON object or a non-empty array of objects. Deprecated
/// fields are migrated inside `value` before it is deserialized, so the
/// caller's JSON reflects the migration too.
///
/// # Errors
///
/// - [`ValidationError::NotAnEventOrList`] if `value` is neither an object nor an array
/// - [`ValidationError::EmptyBatch`] for an empty array
/// - [`ValidationError::NotAnEvent`] if an array member is not an object
/// - [`ValidationError::MissingAxes`] if an event lacks `axes`
/// - [`ValidationError::Malformed`] if a field has the wrong type
pub fn validate_json(
    value: &mut Value,
) -> Result<(EventBatch, Vec<ValidationWarning>), ValidationError> {
    let mut warnings = Vec::new();
    match value {
        Value::Object(_) => {
            migrate_json(0, value, &mut warnings)?;
            let event = parse_event(0, value)?;
            Ok((EventBatch::Single(event), warnings))
        }
        Value::Array(members) => {
            if members.is_empty() {
                return Err(ValidationError::EmptyBatch);
            }
            let mut events = Vec::with_capacity(members.len());
            for (index, member) in members.iter_mut().enumerate() {
                if !member.is_object() {
                    return Err(ValidationError::NotAnEvent { index });
                }
                migrate_json(index, member, &mut warnings)?;
                events.push(parse_event(index, member)?);
            }
            Ok((EventBatch::Many(events), warnings))
        }
        _ => Err(ValidationError::NotAnEventOrList),
    }
}

fn migrate_json(
    index: usize,
    event: &mut Value,
    warnings: &mut Vec<ValidationWarning>,
) -> Result<(), ValidationError> {
    let Some(map) = event.as_object_mut() else {
        return Err(ValidationError::NotAnEvent { index });
    };
    if !map.contains_key("axes") {
        return Err(ValidationError::MissingAxes { index });
    }

    for field in [DeprecatedField::Row, DeprecatedField::Col] {
        let Some(moved) = map.remove(field.key()) else {
            continue;
        };
        match map.get_mut("axes").and_then(Value::as_object_mut) {
            Some(axes) => {
                axes.insert(field.axis().to_string(), moved);
            }
            None => {
                return Err(ValidationError::Malformed {
                    index,
                    message: "'axes' must be a dictionary".to_string(),
                });
            }
        }
        record(index, field, warnings);
    }
    Ok(())
}

fn parse_event(index: usize, value: &Value) -> Result<AcquisitionEvent, ValidationError> {
    AcquisitionEvent::deserialize(value).map_err(|e| ValidationError::Malformed {
        index,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AxisValue, Axes};
    use serde_json::json;

    #[test]
    fn test_json_engine_fields_survive_validation() {
        let mut value = json!({
            "axes": {"time": 0},
            "keep_shutter_open": true,
            "properties": [["Camera", "Gain", "2"]],
            "tags": {"note": "x"}
        });
        let original = value.clone();

        let (batch, warnings) = validate_json(&mut value).unwrap();
        assert!(warnings.is_empty());
        let event = batch.iter().next().unwrap();
        assert_eq!(event.extra.get("keep_shutter_open"), Some(&json!(true)));
        assert_eq!(serde_json::to_value(event).unwrap(), original);
    }

    #[test]
    fn test_typed_engine_fields_survive_migration() {
        let mut event = AcquisitionEvent::new(Axes::new().with("time", 1))
            .with_extra("tags", json!({"well": "B3"}));
        event.col = Some(AxisValue::Index(4));
        let mut batch = EventBatch::from(event);

        validate(&mut batch).unwrap();
        let value = serde_json::to_value(batch.iter().next().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"axes": {"time": 1, "column": 4}, "tags": {"well": "B3"}})
        );
    }

    #[test]
    fn test_row_folded_into_axes() {
        let mut event = AcquisitionEvent::new(Axes::new());
        event.row = Some(AxisValue::Index(2));
        let mut batch = EventBatch::from(event);

        let warnings = validate(&mut batch).unwrap();
        assert_eq!(
            warnings,
            vec![ValidationWarning {
                index: 0,
                field: DeprecatedField::Row
            }]
        );

        let expected = AcquisitionEvent::new(Axes::new().with("row", 2));
        assert_eq!(batch, EventBatch::Single(expected));
    }

    #[test]
    fn test_col_folded_into_column_axis() {
        let mut event = AcquisitionEvent::new(Axes::new().with("time", 0));
        event.col = Some(AxisValue::Index(4));
        let mut batch = EventBatch::from(vec![AcquisitionEvent::default(), event]);

        let warnings = validate(&mut batch).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].index, 1);
        assert_eq!(warnings[0].field, DeprecatedField::Col);

        let migrated = batch.iter().nth(1).unwrap();
        assert_eq!(migrated.axes.get("column"), Some(&AxisValue::Index(4)));
        assert!(!migrated.has_deprecated_fields());
    }

    #[test]
    fn test_clean_batch_has_no_warnings() {
        let mut batch = EventBatch::from(AcquisitionEvent::new(Axes::new().with("z", 1)));
        assert!(validate(&mut batch).unwrap().is_empty());
    }

    #[test]
    fn test_empty_list_rejected() {
        let mut batch = EventBatch::Many(Vec::new());
        assert_eq!(validate(&mut batch), Err(ValidationError::EmptyBatch));
    }

    #[test]
    fn test_json_row_migrated_in_place() {
        let mut value = json!({"axes": {}, "row": 2});
        let (batch, warnings) = validate_json(&mut value).unwrap();

        assert_eq!(value, json!({"axes": {"row": 2}}));
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            batch,
            EventBatch::Single(AcquisitionEvent::new(Axes::new().with("row", 2)))
        );
    }

    #[test]
    fn test_json_rejects_missing_axes() {
        let mut value = json!([{"axes": {}}, {"exposure": 10.0}]);
        assert_eq!(
            validate_json(&mut value).unwrap_err(),
            ValidationError::MissingAxes { index: 1 }
        );
    }

    #[test]
    fn test_json_rejects_non_dict_member() {
        let mut value = json!([{"axes": {}}, 3]);
        assert_eq!(
            validate_json(&mut value).unwrap_err(),
            ValidationError::NotAnEvent { index: 1 }
        );
    }

    #[test]
    fn test_json_rejects_scalars_and_empty_lists() {
        assert_eq!(
            validate_json(&mut json!("event")).unwrap_err(),
            ValidationError::NotAnEventOrList
        );
        assert_eq!(
            validate_json(&mut json!([])).unwrap_err(),
            ValidationError::EmptyBatch
        );
    }

    #[test]
    fn test_json_malformed_field_reported() {
        let mut value = json!({"axes": {}, "exposure": "fast"});
        assert!(matches!(
            validate_json(&mut value),
            Err(ValidationError::Malformed { index: 0, .. })
        ));
    }

    #[test]
    fn test_json_full_event_parses() {
        let mut value = json!({
            "axes": {"time": 1, "channel": "DAPI"},
            "min_start_time": 4.0,
            "config_group": ["Channel", "DAPI"],
            "exposure": 12.5,
            "x": 1.0,
            "y": 2.0
        });
        let (batch, _) = validate_json(&mut value).unwrap();
        let event = batch.iter().next().unwrap();
        assert_eq!(event.axes.get("channel"), Some(&AxisValue::from("DAPI")));
        assert_eq!(
            event.config_group,
            Some(("Channel".to_string(), "DAPI".to_string()))
        );
        assert_eq!(event.exposure, Some(12.5));
    }
}
