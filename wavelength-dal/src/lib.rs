//! Wavelength DAL - Store Trait, Commands and Record Cache
//!
//! Defines the abstract keyed store, the change-tracking [`Record`], the
//! command layer that turns record operations into store calls, and the
//! caching model that decorates it with a bounded TTL cache.

pub mod cache;
pub mod command;
pub mod mock;
pub mod model;
pub mod record;

pub use cache::{
    CacheConfig, CacheKey, CacheStats, Clock, LruTracker, ManualClock, ReadTicket, RecordCache,
    SystemClock,
};
pub use command::{
    always_pass, build_model_update_actions, filter_deleted_items, BaseCommand,
    BaseUpdateCommand, Command, CommandContext, CreateCommand, GetByIdCommand,
    PhysicalDeleteCommand, PostFilter, PostFilterCommand, QueryArguments, QueryArgumentsPayload,
    QueryCommand, QueryResult, SoftDeleteCommand, UpdateCommand,
};
pub use mock::{MockStore, StoreOp, StoreStats};
pub use model::{CachingModel, CrudModel};
pub use record::{ChangeSet, Record};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wavelength_core::{AttributeValue, Condition, Item, RecordKey, StoreError};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// One attribute-level change applied by [`Store::update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdateAction {
    /// Set an attribute. Absent values behave like `Remove`.
    Set {
        attribute: String,
        value: AttributeValue,
    },
    /// Remove an attribute.
    Remove { attribute: String },
}

impl UpdateAction {
    pub fn set(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        UpdateAction::Set {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn remove(attribute: impl Into<String>) -> Self {
        UpdateAction::Remove {
            attribute: attribute.into(),
        }
    }

    pub fn attribute(&self) -> &str {
        match self {
            UpdateAction::Set { attribute, .. } | UpdateAction::Remove { attribute } => attribute,
        }
    }

    /// Apply to a row in place.
    pub fn apply(&self, item: &mut Item) {
        match self {
            UpdateAction::Set { attribute, value } => item.set(attribute.clone(), value.clone()),
            UpdateAction::Remove { attribute } => {
                item.remove(attribute);
            }
        }
    }
}

// ============================================================================
// QUERY TYPES
// ============================================================================

/// Opaque pagination cursor returned by a query and handed back to resume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationToken(pub Map<String, Value>);

impl ContinuationToken {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// A single query page request against the store.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub hash_key: String,
    pub index_name: Option<String>,
    pub range_key_condition: Option<Condition>,
    pub filter_condition: Option<Condition>,
    /// Rows examined, counted before the filter condition applies
    pub limit: usize,
    pub scan_index_forward: bool,
    pub consistent_read: bool,
    pub last_evaluated_key: Option<ContinuationToken>,
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<ContinuationToken>,
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Keyed record store addressed by partition and sort key.
///
/// Implementations report failures as [`StoreError`]; the command layer owns
/// translating them. Every call is one blocking round trip.
pub trait Store: Send + Sync {
    /// Fetch one row. A missing row is [`StoreError::DoesNotExist`].
    fn get(&self, key: &RecordKey, consistent_read: bool) -> Result<Item, StoreError>;

    /// Write a whole row, replacing any existing one, if `condition` holds.
    fn put(&self, item: &Item, condition: Option<&Condition>) -> Result<(), StoreError>;

    /// Apply `actions` to a row if `condition` holds and return the row as
    /// it is after the update.
    fn update(
        &self,
        key: &RecordKey,
        actions: &[UpdateAction],
        condition: Option<&Condition>,
    ) -> Result<Item, StoreError>;

    /// Remove a row if `condition` holds.
    fn delete(&self, key: &RecordKey, condition: Option<&Condition>) -> Result<(), StoreError>;

    /// Read one page of rows sharing a hash key.
    fn query(&self, request: &QueryRequest) -> Result<QueryPage, StoreError>;
}
