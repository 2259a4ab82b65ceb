//! Persistence model wiring one schema to the command set.

use std::sync::Arc;

use serde_json::{Map, Value};
use wavelength_core::{DalConfig, DalResult, ModelSchema, RecordKey};

use crate::command::{
    Command, CommandContext, CreateCommand, GetByIdCommand, PhysicalDeleteCommand, QueryArguments,
    QueryCommand, QueryResult, SoftDeleteCommand, UpdateCommand,
};
use crate::record::Record;
use crate::Store;

/// CRUD verbs for one model, each backed by its command.
///
/// Reads hide soft-deleted records; `delete` is a soft delete and `purge`
/// removes the row.
#[derive(Debug)]
pub struct CrudModel<S: Store> {
    ctx: CommandContext<S>,
    create: CreateCommand<S>,
    read: GetByIdCommand<S>,
    update: UpdateCommand<S>,
    delete: SoftDeleteCommand<S>,
    query: QueryCommand<S>,
    purge: PhysicalDeleteCommand<S>,
}

impl<S: Store> CrudModel<S> {
    pub fn new(store: Arc<S>, schema: Arc<ModelSchema>) -> Self {
        Self::with_config(store, schema, DalConfig::default())
    }

    pub fn with_config(store: Arc<S>, schema: Arc<ModelSchema>, config: DalConfig) -> Self {
        Self::from_context(CommandContext::with_config(store, schema, config))
    }

    pub fn from_context(ctx: CommandContext<S>) -> Self {
        Self {
            create: CreateCommand::new(ctx.clone()),
            read: GetByIdCommand::new(ctx.clone()),
            update: UpdateCommand::new(ctx.clone()),
            delete: SoftDeleteCommand::new(ctx.clone()),
            query: QueryCommand::new(ctx.clone()),
            purge: PhysicalDeleteCommand::new(ctx.clone()),
            ctx,
        }
    }

    pub fn schema(&self) -> &ModelSchema {
        self.ctx.schema()
    }

    pub fn store(&self) -> &S {
        self.ctx.store()
    }

    pub fn config(&self) -> &DalConfig {
        self.ctx.config()
    }

    /// Empty record of this model in the `new` state.
    pub fn new_record(&self, partition_key: impl Into<String>, sort_key: impl Into<String>) -> Record {
        Record::new(self.ctx.schema_arc().clone(), partition_key, sort_key)
    }

    /// Record built from a wire-form mapping, with no pending changes.
    pub fn record_from_source(&self, source: &Map<String, Value>) -> DalResult<Record> {
        Record::from_source(self.ctx.schema_arc().clone(), source)
    }

    /// Query arguments carrying this model's paging defaults.
    pub fn query_arguments(&self, hash_key: impl Into<String>) -> QueryArguments {
        QueryArguments::from_config(hash_key, self.ctx.config())
    }

    pub fn create(&self, record: &mut Record) -> DalResult<Record> {
        self.create.execute(record)
    }

    pub fn read(&self, key: &RecordKey) -> DalResult<Record> {
        self.read.execute(key)
    }

    pub fn update(&self, record: &mut Record) -> DalResult<Record> {
        self.update.execute(record)
    }

    /// Soft delete.
    pub fn delete(&self, record: &mut Record) -> DalResult<Record> {
        self.delete.execute(record)
    }

    pub fn query(&self, args: &QueryArguments) -> DalResult<QueryResult> {
        self.query.execute(args)
    }

    /// Physical delete, returning the removed record.
    pub fn purge(&self, key: &RecordKey) -> DalResult<Record> {
        self.purge.execute(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStore;
    use serde_json::json;
    use wavelength_core::{FieldDescriptor, FilterModel, TableState};

    fn model() -> (Arc<MockStore>, CrudModel<MockStore>) {
        let schema = Arc::new(
            ModelSchema::new("accounts", "account_id", "range_id")
                .with_field("kind", FieldDescriptor::string()),
        );
        let store = Arc::new(MockStore::new(schema.clone()));
        (store.clone(), CrudModel::new(store, schema))
    }

    #[test]
    fn test_lifecycle() {
        let (store, model) = model();
        let mut record = model.new_record("K1", "K2");
        record.set("kind", "abcd").unwrap();
        model.create(&mut record).unwrap();

        let mut read = model.read(record.key()).unwrap();
        assert_eq!(read.get_str("kind"), Some("abcd"));

        read.set("kind", "wxyz").unwrap();
        let updated = model.update(&mut read).unwrap();
        assert_eq!(updated.table_state(), TableState::Modified);

        model.delete(&mut read).unwrap();
        assert!(model.read(record.key()).unwrap_err().is_not_found());
        assert_eq!(store.len(), 1);

        let purged = model.purge(record.key()).unwrap();
        assert!(purged.is_deleted());
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_from_source() {
        let (_store, model) = model();
        let source = json!({"account_id": "K1", "range_id": "K2", "kind": "abcd"});
        let record = model
            .record_from_source(source.as_object().unwrap())
            .unwrap();
        assert_eq!(record.get_str("kind"), Some("abcd"));
        assert!(!record.has_changes());
    }

    #[test]
    fn test_query_uses_config_defaults() {
        let schema = Arc::new(
            ModelSchema::new("accounts", "account_id", "range_id")
                .with_field("kind", FieldDescriptor::string()),
        );
        let store = Arc::new(MockStore::new(schema.clone()));
        let config = DalConfig {
            query_limit: 5,
            ..DalConfig::default()
        };
        let model = CrudModel::with_config(store.clone(), schema, config);

        let args = model
            .query_arguments("K1")
            .with_filter(FilterModel::eq("kind", "abcd"));
        model.query(&args).unwrap();
        assert_eq!(store.last_query().unwrap().limit, 5);
    }
}
