//! Write a new record.

use tracing::debug;
use wavelength_core::{Condition, DalResult};

use super::{Command, CommandContext};
use crate::record::Record;
use crate::Store;

/// Writes the whole record as a new row.
///
/// By default this is an unconditional put: an existing row under the same
/// key is replaced. [`CreateCommand::if_not_exists`] guards the put so that
/// an existing row fails with `Conflict` instead.
#[derive(Debug)]
pub struct CreateCommand<S: Store> {
    ctx: CommandContext<S>,
    if_not_exists: bool,
}

impl<S: Store> CreateCommand<S> {
    pub fn new(ctx: CommandContext<S>) -> Self {
        Self {
            ctx,
            if_not_exists: false,
        }
    }

    /// Insert-only variant.
    pub fn if_not_exists(ctx: CommandContext<S>) -> Self {
        Self {
            ctx,
            if_not_exists: true,
        }
    }
}

impl<S: Store> Command for CreateCommand<S> {
    type Input<'a> = &'a mut Record;
    type Output = Record;

    fn name(&self) -> &'static str {
        "create"
    }

    fn execute(&self, record: &mut Record) -> DalResult<Record> {
        debug!(
            command = self.name(),
            partition_key = %record.partition_key(),
            sort_key = %record.sort_key(),
            "Dispatching command"
        );

        if let Some(attribute) = self.ctx.schema().version_attribute() {
            if record.version().is_none() {
                record.override_protected_field(attribute, 1i64)?;
            }
        }

        let condition = self
            .if_not_exists
            .then(|| Condition::not_exists(self.ctx.schema().hash_key()));
        self.ctx.store().put(&record.to_item(), condition.as_ref())?;

        record.flush_changes();
        Ok(record.clone())
    }
}
