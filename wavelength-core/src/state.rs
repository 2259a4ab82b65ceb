//! Record lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attribute name under which every row stores its lifecycle state.
pub const TABLE_STATE: &str = "table_state";

/// Lifecycle state of a stored record.
///
/// Transitions are monotonic: `New -> Modified -> Deleted`. The derived
/// ordering follows that sequence.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TableState {
    #[default]
    New,
    Modified,
    Deleted,
}

impl TableState {
    /// Convert to the stored string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TableState::New => "new",
            TableState::Modified => "modified",
            TableState::Deleted => "deleted",
        }
    }

    /// Parse from the stored string representation.
    pub fn from_db_str(s: &str) -> Result<Self, TableStateParseError> {
        match s.to_lowercase().as_str() {
            "new" => Ok(TableState::New),
            "modified" => Ok(TableState::Modified),
            "deleted" => Ok(TableState::Deleted),
            _ => Err(TableStateParseError(s.to_string())),
        }
    }

    /// Whether moving to `next` respects the lifecycle order.
    pub fn can_transition_to(&self, next: TableState) -> bool {
        next >= *self
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, TableState::Deleted)
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for TableState {
    type Err = TableStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid table state string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStateParseError(pub String);

impl fmt::Display for TableStateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid table state: {}", self.0)
    }
}

impl std::error::Error for TableStateParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_str_round_trip() {
        for state in [TableState::New, TableState::Modified, TableState::Deleted] {
            assert_eq!(TableState::from_db_str(state.as_db_str()).unwrap(), state);
        }
        assert!(TableState::from_db_str("archived").is_err());
    }

    #[test]
    fn test_transitions_are_monotonic() {
        assert!(TableState::New.can_transition_to(TableState::Modified));
        assert!(TableState::Modified.can_transition_to(TableState::Deleted));
        assert!(TableState::Modified.can_transition_to(TableState::Modified));
        assert!(!TableState::Deleted.can_transition_to(TableState::Modified));
        assert!(!TableState::Modified.can_transition_to(TableState::New));
    }
}
