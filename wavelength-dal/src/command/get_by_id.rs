//! Fetch one record by key.

use tracing::debug;
use wavelength_core::{DalError, DalResult, RecordKey};

use super::{Command, CommandContext, PostFilter, PostFilterCommand};
use crate::record::Record;
use crate::Store;

/// Fetches by `(partition_key, sort_key)` and applies the post-filter.
/// Missing and filtered-out records are both `NotFound`.
#[derive(Debug)]
pub struct GetByIdCommand<S: Store> {
    ctx: CommandContext<S>,
    post_filter: PostFilterCommand,
    consistent_read: bool,
}

impl<S: Store> GetByIdCommand<S> {
    /// Hides soft-deleted records.
    pub fn new(ctx: CommandContext<S>) -> Self {
        Self {
            ctx,
            post_filter: PostFilterCommand::filter_deleted(),
            consistent_read: false,
        }
    }

    pub fn with_post_filter(mut self, filter: PostFilter) -> Self {
        self.post_filter = PostFilterCommand::new(filter);
        self
    }

    pub fn with_consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = consistent_read;
        self
    }

    /// Fetch without the post-filter.
    pub(crate) fn fetch(&self, key: &RecordKey) -> DalResult<Record> {
        let item = self.ctx.store().get(key, self.consistent_read)?;
        Record::from_item(self.ctx.schema_arc().clone(), item)
    }
}

impl<S: Store> Command for GetByIdCommand<S> {
    type Input<'a> = &'a RecordKey;
    type Output = Record;

    fn name(&self) -> &'static str {
        "get_by_id"
    }

    fn execute(&self, key: &RecordKey) -> DalResult<Record> {
        debug!(
            command = self.name(),
            partition_key = %key.partition_key,
            sort_key = %key.sort_key,
            "Dispatching command"
        );
        let record = self.fetch(key)?;
        self.post_filter
            .execute(record)?
            .ok_or_else(DalError::not_found)
    }
}
