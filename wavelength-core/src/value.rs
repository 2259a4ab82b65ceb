//! Attribute values and their wire form.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;

use crate::codec::{deserialize_tag, serialize_epoch, serialize_tag_list};
use crate::error::CodecError;

/// Scalar type of a record attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    /// Tag list, stored as a `::`-delimited string.
    Tags,
    /// Timestamp, stored as integer microseconds since the epoch.
    Epoch,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Number => "number",
            AttributeType::Tags => "tags",
            AttributeType::Epoch => "epoch",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed attribute value held by a record or store row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Null,
    String(String),
    Number(f64),
    Tags(Vec<String>),
    /// Microseconds since the Unix epoch.
    Epoch(i64),
}

impl AttributeValue {
    pub fn attribute_type(&self) -> Option<AttributeType> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::String(_) => Some(AttributeType::String),
            AttributeValue::Number(_) => Some(AttributeType::Number),
            AttributeValue::Tags(_) => Some(AttributeType::Tags),
            AttributeValue::Epoch(_) => Some(AttributeType::Epoch),
        }
    }

    /// Null and the empty tag list are both "absent" in the store.
    pub fn is_absent(&self) -> bool {
        match self {
            AttributeValue::Null => true,
            AttributeValue::Tags(tags) => tags.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Epoch(m) => Some(*m as f64),
            _ => None,
        }
    }

    /// Wire form handed to the store.
    pub fn to_wire(&self) -> Value {
        match self {
            AttributeValue::Null => Value::Null,
            AttributeValue::String(s) => Value::String(s.clone()),
            AttributeValue::Number(n) => number_to_wire(*n),
            AttributeValue::Tags(tags) => serialize_tag_list(tags)
                .map(Value::String)
                .unwrap_or(Value::Null),
            AttributeValue::Epoch(micros) => Value::Number(Number::from(*micros)),
        }
    }

    /// Decode a wire value for an attribute of a known type.
    pub fn from_wire(
        attribute: &str,
        attribute_type: AttributeType,
        value: &Value,
    ) -> Result<Self, CodecError> {
        if value.is_null() {
            return Ok(AttributeValue::Null);
        }

        let mismatch = || CodecError::TypeMismatch {
            attribute: attribute.to_string(),
            expected: attribute_type.to_string(),
        };

        match attribute_type {
            AttributeType::String => value
                .as_str()
                .map(|s| AttributeValue::String(s.to_string()))
                .ok_or_else(mismatch),
            AttributeType::Number => value
                .as_f64()
                .map(AttributeValue::Number)
                .ok_or_else(mismatch),
            AttributeType::Tags => match value {
                Value::String(raw) => Ok(AttributeValue::Tags(deserialize_tag(raw).into_tags())),
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(AttributeValue::Tags)
                    .ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            AttributeType::Epoch => serialize_epoch(value)?
                .map(AttributeValue::Epoch)
                .ok_or_else(mismatch),
        }
    }

    /// Best-effort decode for attributes the schema does not describe.
    pub fn infer_from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(AttributeValue::Null),
            Value::String(s) => Some(AttributeValue::String(s.clone())),
            Value::Number(n) => n.as_f64().map(AttributeValue::Number),
            _ => None,
        }
    }
}

fn number_to_wire(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl PartialOrd for AttributeValue {
    /// Values order only against values of the same type.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::Null, AttributeValue::Null) => Some(Ordering::Equal),
            (AttributeValue::String(a), AttributeValue::String(b)) => Some(a.cmp(b)),
            (AttributeValue::Number(a), AttributeValue::Number(b)) => a.partial_cmp(b),
            (AttributeValue::Epoch(a), AttributeValue::Epoch(b)) => Some(a.cmp(b)),
            (AttributeValue::Tags(a), AttributeValue::Tags(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_wire() {
            Value::String(s) => f.write_str(&s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        AttributeValue::Tags(value)
    }
}
