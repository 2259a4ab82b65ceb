//! Conditional update of an existing record.

use tracing::debug;
use wavelength_core::{AttributeValue, Condition, DalError, DalResult, TableState, TABLE_STATE};

use super::{
    build_model_update_actions, Command, CommandContext, GetByIdCommand, PostFilter,
    PostFilterCommand,
};
use crate::record::Record;
use crate::{Store, UpdateAction};

/// Applies a record's pending changes as one conditional update.
///
/// The current row is fetched and run through the post-filter first. The
/// write is conditioned on the row not being soft-deleted and, when the
/// schema tracks a version, on the version being the one fetched. On
/// success the record is refreshed from the store and its changes flushed.
#[derive(Debug)]
pub struct BaseUpdateCommand<S: Store> {
    ctx: CommandContext<S>,
    fetch: GetByIdCommand<S>,
    post_filter: PostFilterCommand,
}

impl<S: Store> BaseUpdateCommand<S> {
    pub fn new(ctx: CommandContext<S>, post_filter: PostFilter) -> Self {
        Self {
            fetch: GetByIdCommand::new(ctx.clone()).with_consistent_read(true),
            ctx,
            post_filter: PostFilterCommand::new(post_filter),
        }
    }

    /// Write `record`'s changes against an already fetched `persisted` row.
    ///
    /// The state transition and the write are staged on a copy; `record` is
    /// only replaced once the store accepted the update.
    pub(crate) fn write_changes(&self, record: &mut Record, persisted: &Record) -> DalResult<Record> {
        let mut staged = record.clone();
        if staged.table_state() == TableState::New {
            staged.transition_to(TableState::Modified)?;
        }

        let persisted_item = persisted.to_item();
        let mut actions = build_model_update_actions(&staged, Some(&persisted_item));
        let mut condition = Condition::ne(TABLE_STATE, TableState::Deleted.as_db_str());

        if let Some(attribute) = self.ctx.schema().version_attribute() {
            match persisted.version() {
                Some(version) => {
                    condition = condition.and(Condition::eq(attribute, version));
                    actions.push(UpdateAction::set(attribute, version + 1));
                }
                None => {
                    condition = condition.and(Condition::not_exists(attribute));
                    actions.push(UpdateAction::set(attribute, AttributeValue::from(1i64)));
                }
            }
        }

        let updated = self
            .ctx
            .store()
            .update(staged.key(), &actions, Some(&condition))?;
        staged.refresh_from(updated)?;
        staged.flush_changes();
        *record = staged.clone();
        Ok(staged)
    }
}

impl<S: Store> Command for BaseUpdateCommand<S> {
    type Input<'a> = &'a mut Record;
    type Output = Record;

    fn name(&self) -> &'static str {
        "update"
    }

    fn execute(&self, record: &mut Record) -> DalResult<Record> {
        debug!(
            command = self.name(),
            partition_key = %record.partition_key(),
            sort_key = %record.sort_key(),
            changes = record.changes().len(),
            "Dispatching command"
        );
        let fetched = self.fetch.fetch(record.key())?;
        let persisted = self
            .post_filter
            .execute(fetched)?
            .ok_or_else(DalError::not_found)?;
        self.write_changes(record, &persisted)
    }
}

/// Update that refuses soft-deleted records.
#[derive(Debug)]
pub struct UpdateCommand<S: Store> {
    base: BaseUpdateCommand<S>,
}

impl<S: Store> UpdateCommand<S> {
    pub fn new(ctx: CommandContext<S>) -> Self {
        Self {
            base: BaseUpdateCommand::new(ctx, std::sync::Arc::new(super::filter_deleted_items)),
        }
    }
}

impl<S: Store> Command for UpdateCommand<S> {
    type Input<'a> = &'a mut Record;
    type Output = Record;

    fn name(&self) -> &'static str {
        self.base.name()
    }

    fn execute(&self, record: &mut Record) -> DalResult<Record> {
        self.base.execute(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockStore, StoreOp};
    use std::sync::Arc;
    use wavelength_core::{
        ErrorKind, FieldDescriptor, Item, ModelSchema, RecordKey, StoreError,
    };

    fn schema() -> Arc<ModelSchema> {
        Arc::new(
            ModelSchema::new("accounts", "account_id", "range_id")
                .with_field("kind", FieldDescriptor::string())
                .with_field("score", FieldDescriptor::number()),
        )
    }

    fn setup(schema: Arc<ModelSchema>) -> (Arc<MockStore>, UpdateCommand<MockStore>) {
        let store = Arc::new(MockStore::new(schema.clone()));
        let command = UpdateCommand::new(CommandContext::new(store.clone(), schema));
        (store, command)
    }

    fn seed(store: &MockStore, state: &str) -> Item {
        let item = Item::new()
            .with("account_id", "K1")
            .with("range_id", "K2")
            .with(TABLE_STATE, state)
            .with("kind", "abcd")
            .with("score", 1.0);
        store.seed(&item).unwrap();
        item
    }

    #[test]
    fn test_execute() {
        let (store, command) = setup(schema());
        let item = seed(&store, "new");
        let mut record = Record::from_item(schema(), item).unwrap();
        record.set("kind", "wxyz").unwrap();

        let updated = command.execute(&mut record).unwrap();
        assert_eq!(updated.get_str("kind"), Some("wxyz"));
        assert_eq!(updated.table_state(), TableState::Modified);
        assert!(!record.has_changes());
        assert_eq!(store.stats().gets, 1);
        assert_eq!(store.stats().updates, 1);

        let stored = store.raw(&RecordKey::new("K1", "K2")).unwrap();
        assert_eq!(stored.get("kind"), Some(&AttributeValue::from("wxyz")));
        assert_eq!(stored.get(TABLE_STATE), Some(&AttributeValue::from("modified")));
    }

    #[test]
    fn test_deleted_record_is_not_found() {
        let (store, command) = setup(schema());
        let item = seed(&store, "deleted");
        let mut record = Record::from_item(schema(), item).unwrap();
        let err = command.execute(&mut record).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.stats().updates, 0);
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let (_store, command) = setup(schema());
        let mut record = Record::new(schema(), "K1", "K2");
        assert!(command.execute(&mut record).unwrap_err().is_not_found());
    }

    #[test]
    fn test_conditional_failure_is_conflict() {
        let (store, command) = setup(schema());
        let item = seed(&store, "new");
        let mut record = Record::from_item(schema(), item).unwrap();
        record.set("kind", "wxyz").unwrap();

        store.fail_next(StoreError::client("ThrottlingException", "ignored"));
        assert_eq!(
            command.execute(&mut record).unwrap_err().kind(),
            ErrorKind::Unavailable
        );
        assert!(record.has_changes());

        // The fetch succeeds, the write loses a race.
        let conflict = StoreError::conditional_check_failed("Usurper was here");
        store.fail_on(StoreOp::Update, conflict);
        let err = command.execute(&mut record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Usurper was here");
    }

    #[test]
    fn test_failed_write_leaves_record_untouched() {
        let (store, command) = setup(schema());
        let item = seed(&store, "new");
        let mut record = Record::from_item(schema(), item).unwrap();
        record.set("kind", "wxyz").unwrap();
        let before = record.clone();

        store.fail_on(StoreOp::Update, StoreError::connection("connection reset"));
        let err = command.execute(&mut record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(record, before);
        assert_eq!(record.table_state(), TableState::New);

        // The retry writes the same change once the store recovers.
        let updated = command.execute(&mut record).unwrap();
        assert_eq!(updated.get_str("kind"), Some("wxyz"));
        assert_eq!(record, updated);
    }

    #[test]
    fn test_versioned_update_increments() {
        let schema = Arc::new(
            ModelSchema::new("accounts", "account_id", "range_id")
                .with_field("kind", FieldDescriptor::string())
                .with_version_attribute("version"),
        );
        let (store, command) = setup(schema.clone());
        let item = Item::new()
            .with("account_id", "K1")
            .with("range_id", "K2")
            .with(TABLE_STATE, "new")
            .with("version", 3i64);
        store.seed(&item).unwrap();

        let mut record = Record::from_item(schema.clone(), item).unwrap();
        record.set("kind", "abcd").unwrap();
        let updated = command.execute(&mut record).unwrap();
        assert_eq!(updated.version(), Some(4));

        // A stale copy still carries version 3, but the condition uses the
        // freshly fetched row, so a second writer also succeeds.
        let mut stale = Record::from_item(
            schema.clone(),
            Item::new().with("account_id", "K1").with("range_id", "K2"),
        )
        .unwrap();
        stale.set("kind", "wxyz").unwrap();
        assert_eq!(command.execute(&mut stale).unwrap().version(), Some(5));
    }
}
