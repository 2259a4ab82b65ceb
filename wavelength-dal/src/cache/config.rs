//! Cache configuration.

use std::time::Duration;

use wavelength_core::ConfigError;

/// Default time a cached record stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default number of records held before LRU eviction kicks in.
pub const DEFAULT_MAX_ENTRIES: usize = 128;

/// Configuration for the record cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry is served after it was written.
    pub ttl: Duration,
    /// Maximum number of entries; the least recently used one is evicted
    /// when an insert would exceed it.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the capacity.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Read overrides from `WAVELENGTH_CACHE_TTL_MS` and
    /// `WAVELENGTH_CACHE_MAX_ENTRIES`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ttl: std::env::var("WAVELENGTH_CACHE_TTL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.ttl),
            max_entries: std::env::var("WAVELENGTH_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_entries),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "ttl".to_string(),
                value: format!("{:?}", self.ttl),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_entries".to_string(),
                value: self.max_entries.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
