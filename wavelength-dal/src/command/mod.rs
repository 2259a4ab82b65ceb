//! Command layer.
//!
//! Each command performs one logical operation on a single record against
//! the [`Store`], translating store failures into the four-kind
//! [`DalError`] taxonomy. Read-path commands run results through a
//! [`PostFilter`] that decides visibility.

mod create;
mod delete;
mod get_by_id;
mod post_filter;
mod query;
mod soft_delete;
mod update;

pub use create::CreateCommand;
pub use delete::PhysicalDeleteCommand;
pub use get_by_id::GetByIdCommand;
pub use post_filter::{always_pass, filter_deleted_items, PostFilter, PostFilterCommand};
pub use query::{QueryArguments, QueryArgumentsPayload, QueryCommand, QueryResult};
pub use soft_delete::SoftDeleteCommand;
pub use update::{BaseUpdateCommand, UpdateCommand};

use std::collections::BTreeMap;
use std::sync::Arc;

use wavelength_core::{
    AttributeValue, Condition, DalConfig, DalError, DalResult, DictDiffer, FilterModel, Item,
    ModelSchema, TABLE_STATE,
};

use crate::record::Record;
use crate::{Store, UpdateAction};

// ============================================================================
// CONTEXT
// ============================================================================

/// Everything a command needs to talk to the store for one model.
#[derive(Debug)]
pub struct CommandContext<S: Store> {
    store: Arc<S>,
    schema: Arc<ModelSchema>,
    config: DalConfig,
}

impl<S: Store> Clone for CommandContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            schema: Arc::clone(&self.schema),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> CommandContext<S> {
    pub fn new(store: Arc<S>, schema: Arc<ModelSchema>) -> Self {
        Self::with_config(store, schema, DalConfig::default())
    }

    pub fn with_config(store: Arc<S>, schema: Arc<ModelSchema>, config: DalConfig) -> Self {
        Self {
            store,
            schema,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn schema_arc(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn config(&self) -> &DalConfig {
        &self.config
    }

    /// Conditional from declarative filters against this model's schema.
    pub fn build_conditionals(&self, filters: &[FilterModel]) -> DalResult<Condition> {
        wavelength_core::build_conditionals(&self.schema, filters)
    }
}

// ============================================================================
// COMMAND TRAIT
// ============================================================================

/// One logical operation against a single record.
pub trait Command {
    type Input<'a>;
    type Output;

    /// Name used in dispatch logging.
    fn name(&self) -> &'static str;

    /// Run the command. Concrete commands must provide this.
    fn execute(&self, input: Self::Input<'_>) -> DalResult<Self::Output> {
        let _ = input;
        Err(DalError::NotImplemented)
    }
}

/// Command with no operation of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseCommand;

impl Command for BaseCommand {
    type Input<'a> = ();
    type Output = ();

    fn name(&self) -> &'static str {
        "base"
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Build update actions for a record's pending changes.
///
/// `table_state` always comes first. Other changes are kept only where they
/// differ from `persisted`; absent values become removals.
pub fn build_model_update_actions(record: &Record, persisted: Option<&Item>) -> Vec<UpdateAction> {
    let mut actions = vec![UpdateAction::set(
        TABLE_STATE,
        record.table_state().as_db_str(),
    )];

    let mut present = BTreeMap::new();
    let mut removed = Vec::new();
    for (name, value) in record.changes().iter() {
        if name == TABLE_STATE {
            continue;
        }
        if value.is_absent() {
            removed.push(name);
        } else {
            present.insert(name.to_string(), value.clone());
        }
    }

    let past: BTreeMap<String, AttributeValue> = match persisted {
        Some(item) => present
            .keys()
            .filter_map(|name| item.get(name).map(|v| (name.clone(), v.clone())))
            .collect(),
        None => BTreeMap::new(),
    };
    let differ = DictDiffer::new(&present, &past);
    let unchanged = differ.unchanged();

    for (name, value) in &present {
        if !unchanged.contains(name) {
            actions.push(UpdateAction::set(name.clone(), value.clone()));
        }
    }
    for name in removed {
        if persisted.map_or(true, |item| item.get(name).is_some()) {
            actions.push(UpdateAction::remove(name));
        }
    }
    actions
}
