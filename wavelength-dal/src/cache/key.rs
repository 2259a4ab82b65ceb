//! Cache identity.

use std::fmt;

use wavelength_core::RecordKey;

use crate::record::Record;

/// A record key scoped by the name of the model that owns it, so models
/// sharing one cache never see each other's rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub model: String,
    pub key: RecordKey,
}

impl CacheKey {
    pub fn new(model: impl Into<String>, key: RecordKey) -> Self {
        Self {
            model: model.into(),
            key,
        }
    }

    /// Key a record is cached under.
    pub fn of(record: &Record) -> Self {
        Self::new(record.schema().name(), record.key().clone())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.model, self.key)
    }
}
