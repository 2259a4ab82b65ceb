//! Configuration types

use serde::{Deserialize, Serialize};

use crate::codec::TAG_DELIMITER;
use crate::error::ConfigError;
use crate::state::TableState;

/// Default page size for query commands.
pub const DEFAULT_QUERY_LIMIT: usize = 30;

/// Data-access defaults shared by every model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DalConfig {
    /// Page size used when a query does not set one
    pub query_limit: usize,
    /// Default sort direction of query results
    pub scan_index_forward: bool,
    /// Default read consistency of query results
    pub consistent_read: bool,
}

impl Default for DalConfig {
    fn default() -> Self {
        Self {
            query_limit: DEFAULT_QUERY_LIMIT,
            scan_index_forward: false,
            consistent_read: false,
        }
    }
}

impl DalConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `WAVELENGTH_QUERY_LIMIT`: Default query page size (default: 30)
    /// - `WAVELENGTH_SCAN_INDEX_FORWARD`: Ascending range-key order (default: false)
    /// - `WAVELENGTH_CONSISTENT_READ`: Strongly consistent queries (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            query_limit: std::env::var("WAVELENGTH_QUERY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.query_limit),
            scan_index_forward: std::env::var("WAVELENGTH_SCAN_INDEX_FORWARD")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.scan_index_forward),
            consistent_read: std::env::var("WAVELENGTH_CONSISTENT_READ")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.consistent_read),
        }
    }

    /// Stored names of the table states, in lifecycle order.
    pub fn table_state_names(&self) -> [&'static str; 3] {
        [
            TableState::New.as_db_str(),
            TableState::Modified.as_db_str(),
            TableState::Deleted.as_db_str(),
        ]
    }

    pub fn tag_delimiter(&self) -> &'static str {
        TAG_DELIMITER
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "query_limit".to_string(),
                value: self.query_limit.to_string(),
                reason: "query_limit must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DalConfig::default();
        assert_eq!(config.query_limit, 30);
        assert!(!config.scan_index_forward);
        assert!(!config.consistent_read);
        assert_eq!(config.table_state_names(), ["new", "modified", "deleted"]);
        assert_eq!(config.tag_delimiter(), "::");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let config = DalConfig {
            query_limit: 0,
            ..DalConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("query_limit"));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
