//! Physical delete.

use tracing::debug;
use wavelength_core::{DalResult, RecordKey};

use super::{Command, CommandContext, GetByIdCommand};
use crate::record::Record;
use crate::Store;

/// Fetches a row by key, then removes it from the store. Returns the row
/// as it was before removal. Soft-deleted rows can be purged too.
#[derive(Debug)]
pub struct PhysicalDeleteCommand<S: Store> {
    ctx: CommandContext<S>,
    read: GetByIdCommand<S>,
}

impl<S: Store> PhysicalDeleteCommand<S> {
    pub fn new(ctx: CommandContext<S>) -> Self {
        Self {
            read: GetByIdCommand::new(ctx.clone()).with_consistent_read(true),
            ctx,
        }
    }
}

impl<S: Store> Command for PhysicalDeleteCommand<S> {
    type Input<'a> = &'a RecordKey;
    type Output = Record;

    fn name(&self) -> &'static str {
        "physical_delete"
    }

    fn execute(&self, key: &RecordKey) -> DalResult<Record> {
        debug!(
            command = self.name(),
            partition_key = %key.partition_key,
            sort_key = %key.sort_key,
            "Dispatching command"
        );
        let record = self.read.fetch(key)?;
        self.ctx.store().delete(key, None)?;
        Ok(record)
    }
}
