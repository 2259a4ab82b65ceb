//! Identity types for stored records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::TAG_DELIMITER;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Composite identity of a record: partition key plus sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub partition_key: String,
    pub sort_key: String,
}

impl RecordKey {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.partition_key, self.sort_key)
    }
}

impl<P: Into<String>, S: Into<String>> From<(P, S)> for RecordKey {
    fn from((partition_key, sort_key): (P, S)) -> Self {
        Self::new(partition_key, sort_key)
    }
}

/// Microseconds since the Unix epoch.
pub fn posix_timestamp(timestamp: Timestamp) -> i64 {
    timestamp.timestamp_micros()
}

/// Inverse of [`posix_timestamp`]. Out-of-range input clamps to the epoch.
pub fn posix_date(micros: i64) -> Timestamp {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

/// Time-ordered range key: `"{micros}::{key}"`, or `"{key}::{micros}"`
/// when `reverse` is set.
pub fn range_key(key: &str, timestamp: Timestamp, reverse: bool) -> String {
    let micros = posix_timestamp(timestamp);
    if reverse {
        format!("{key}{TAG_DELIMITER}{micros}")
    } else {
        format!("{micros}{TAG_DELIMITER}{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_is_accurate() {
        let now = Utc::now();
        let micros = posix_timestamp(now);
        let back = posix_date(micros);
        assert_eq!(now.timestamp(), back.timestamp());
        assert_eq!(now.timestamp_subsec_micros(), back.timestamp_subsec_micros());
    }

    #[test]
    fn test_range_key_generation() {
        let now = Utc::now();
        let micros = posix_timestamp(now);
        assert_eq!(range_key("key", now, false), format!("{micros}::key"));
        assert_eq!(range_key("key", now, true), format!("key::{micros}"));
    }

    #[test]
    fn test_record_key_from_tuple() {
        let key: RecordKey = ("K1", "K2").into();
        assert_eq!(key, RecordKey::new("K1", "K2"));
        assert_eq!(key.to_string(), "(K1, K2)");
    }
}
