//! Soft delete: mark a record deleted without removing its row.

use tracing::debug;
use wavelength_core::{DalResult, TableState};

use super::{always_pass, BaseUpdateCommand, Command, CommandContext, GetByIdCommand};
use crate::record::Record;
use crate::Store;

/// Moves a record to `deleted` through the protected-field path and writes
/// it with the update path. The row stays in the store; default read
/// filters hide it from then on. Never issues a physical delete.
#[derive(Debug)]
pub struct SoftDeleteCommand<S: Store> {
    read: GetByIdCommand<S>,
    update: BaseUpdateCommand<S>,
}

impl<S: Store> SoftDeleteCommand<S> {
    pub fn new(ctx: CommandContext<S>) -> Self {
        Self {
            read: GetByIdCommand::new(ctx.clone()).with_consistent_read(true),
            update: BaseUpdateCommand::new(ctx, std::sync::Arc::new(always_pass)),
        }
    }
}

impl<S: Store> Command for SoftDeleteCommand<S> {
    type Input<'a> = &'a mut Record;
    type Output = Record;

    fn name(&self) -> &'static str {
        "soft_delete"
    }

    fn execute(&self, record: &mut Record) -> DalResult<Record> {
        debug!(
            command = self.name(),
            partition_key = %record.partition_key(),
            sort_key = %record.sort_key(),
            "Dispatching command"
        );
        // Already deleted rows fail here with NotFound.
        let persisted = self.read.execute(record.key())?;
        let mut staged = record.clone();
        staged.transition_to(TableState::Deleted)?;
        let deleted = self.update.write_changes(&mut staged, &persisted)?;
        *record = staged;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::UpdateCommand;
    use crate::mock::{MockStore, StoreOp};
    use std::sync::Arc;
    use wavelength_core::{
        AttributeValue, ErrorKind, FieldDescriptor, Item, ModelSchema, StoreError, TABLE_STATE,
    };

    fn schema() -> Arc<ModelSchema> {
        Arc::new(
            ModelSchema::new("accounts", "account_id", "range_id")
                .with_field("kind", FieldDescriptor::string()),
        )
    }

    fn setup() -> (Arc<MockStore>, SoftDeleteCommand<MockStore>, Record) {
        let store = Arc::new(MockStore::new(schema()));
        let item = Item::new()
            .with("account_id", "K1")
            .with("range_id", "K2")
            .with(TABLE_STATE, "new")
            .with("kind", "abcd");
        store.seed(&item).unwrap();
        let command = SoftDeleteCommand::new(CommandContext::new(store.clone(), schema()));
        let record = Record::from_item(schema(), item).unwrap();
        (store, command, record)
    }

    #[test]
    fn test_execute() {
        let (store, command, mut record) = setup();
        let deleted = command.execute(&mut record).unwrap();

        assert_eq!(deleted.table_state(), TableState::Deleted);
        assert_eq!(store.stats().gets, 1);
        assert_eq!(store.stats().updates, 1);
        assert_eq!(store.stats().deletes, 0);

        let raw = store.raw(record.key()).unwrap();
        assert_eq!(raw.get(TABLE_STATE), Some(&AttributeValue::from("deleted")));
        assert_eq!(raw.get("kind"), Some(&AttributeValue::from("abcd")));
    }

    #[test]
    fn test_deleting_twice_is_not_found() {
        let (store, command, mut record) = setup();
        command.execute(&mut record).unwrap();

        let err = command.execute(&mut record).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.stats().updates, 1);
    }

    #[test]
    fn test_failed_write_keeps_record_live() {
        let (store, command, mut record) = setup();
        let before = record.clone();
        store.fail_on(StoreOp::Update, StoreError::connection("connection reset"));
        assert_eq!(
            command.execute(&mut record).unwrap_err().kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(record, before);
        assert!(!record.is_deleted());

        // A later update carries only the caller's change, not a deletion.
        record.set("kind", "wxyz").unwrap();
        let update = UpdateCommand::new(CommandContext::new(store.clone(), schema()));
        let updated = update.execute(&mut record).unwrap();
        assert_eq!(updated.table_state(), TableState::Modified);

        let raw = store.raw(record.key()).unwrap();
        assert_eq!(raw.get(TABLE_STATE), Some(&AttributeValue::from("modified")));
        assert_eq!(raw.get("kind"), Some(&AttributeValue::from("wxyz")));
    }
}
