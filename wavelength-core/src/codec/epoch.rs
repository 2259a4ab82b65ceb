//! Epoch timestamp codec.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch.
//! Input may be a datetime string, an integer or a float; fractional
//! microseconds are truncated.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::CodecError;

/// Serialize any JSON epoch input.
///
/// Returns `Ok(None)` for shapes that have no epoch form (objects, arrays,
/// null). Booleans are rejected outright rather than treated as 0/1.
pub fn serialize_epoch(value: &Value) -> Result<Option<i64>, CodecError> {
    match value {
        Value::Bool(_) => Err(CodecError::BooleanEpoch),
        Value::String(s) => serialize_epoch_str(s).map(Some),
        Value::Number(n) => {
            if let Some(micros) = n.as_i64() {
                Ok(Some(serialize_epoch_int(micros)))
            } else if let Some(micros) = n.as_f64() {
                serialize_epoch_numeric(micros).map(Some)
            } else {
                Err(CodecError::EpochOutOfRange {
                    value: n.to_string(),
                })
            }
        }
        _ => Ok(None),
    }
}

/// Parse an RFC 3339 (or offset-less ISO 8601, read as UTC) datetime.
pub fn serialize_epoch_str(value: &str) -> Result<i64, CodecError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc).timestamp_micros());
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp_micros())
        .map_err(|_| CodecError::InvalidDatetime)
}

pub fn serialize_epoch_int(value: i64) -> i64 {
    value
}

/// Truncate a fractional microsecond count.
pub fn serialize_epoch_numeric(value: f64) -> Result<i64, CodecError> {
    let truncated = value.trunc();
    if !truncated.is_finite() || truncated < i64::MIN as f64 || truncated > i64::MAX as f64 {
        return Err(CodecError::EpochOutOfRange {
            value: value.to_string(),
        });
    }
    Ok(truncated as i64)
}

/// Convert stored microseconds back to a UTC datetime.
pub fn deserialize_epoch(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_epoch_truncates_fraction() {
        assert_eq!(
            serialize_epoch(&json!(1576421280000000.123)).unwrap(),
            Some(1576421280000000)
        );
        assert_eq!(
            serialize_epoch_numeric(1576421280000000.0123456).unwrap(),
            1576421280000000
        );
    }

    #[test]
    fn test_serialize_epoch_int_passthrough() {
        assert_eq!(serialize_epoch_int(1576421280000000), 1576421280000000);
        assert_eq!(
            serialize_epoch(&json!(1576421280000000i64)).unwrap(),
            Some(1576421280000000)
        );
    }

    #[test]
    fn test_serialize_epoch_str() {
        assert_eq!(
            serialize_epoch_str("2019-12-15T14:48:00.000Z").unwrap(),
            1576421280000000
        );
        assert_eq!(
            serialize_epoch(&json!("2019-12-15T14:48:00.000Z")).unwrap(),
            Some(1576421280000000)
        );
    }

    #[test]
    fn test_serialize_epoch_str_without_offset_reads_utc() {
        assert_eq!(
            serialize_epoch_str("2019-12-15T14:48:00").unwrap(),
            1576421280000000
        );
    }

    #[test]
    fn test_serialize_epoch_str_fails_with_invalid_datetime_format() {
        let err = serialize_epoch_str("1576421280000000").unwrap_err();
        assert_eq!(err.to_string(), "Unable to parse string as a datetime");
    }

    #[test]
    fn test_serialize_epoch_rejects_boolean() {
        let err = serialize_epoch(&json!(true)).unwrap_err();
        assert_eq!(err, CodecError::BooleanEpoch);
        assert_eq!(err.to_string(), "Boolean not supported for Epoch");
    }

    #[test]
    fn test_unsupported_shapes_have_no_form() {
        assert_eq!(serialize_epoch(&json!({"test_dict": 123})).unwrap(), None);
        assert_eq!(serialize_epoch(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_non_finite_is_out_of_range() {
        assert!(serialize_epoch_numeric(f64::INFINITY).is_err());
        assert!(serialize_epoch_numeric(f64::NAN).is_err());
    }

    #[test]
    fn test_deserialize_epoch() {
        let dt = deserialize_epoch(1576421280000000).unwrap();
        assert_eq!(dt.to_rfc3339(), "2019-12-15T14:48:00+00:00");
    }
}
