//! Post-read visibility filters.

use std::fmt;
use std::sync::Arc;

use wavelength_core::{DalError, DalResult};

use super::Command;
use crate::record::Record;

/// Decides whether a freshly fetched record is visible.
///
/// `Ok(Some(_))` keeps the (possibly transformed) record, `Ok(None)` hides
/// it, and an error aborts the read.
pub type PostFilter = Arc<dyn Fn(Record) -> DalResult<Option<Record>> + Send + Sync>;

/// Hide soft-deleted records by failing with `NotFound`.
pub fn filter_deleted_items(record: Record) -> DalResult<Option<Record>> {
    if record.is_deleted() {
        return Err(DalError::not_found());
    }
    Ok(Some(record))
}

/// Keep every record.
pub fn always_pass(record: Record) -> DalResult<Option<Record>> {
    Ok(Some(record))
}

/// Applies a [`PostFilter`] and reports hidden records as `None` instead
/// of failing.
#[derive(Clone)]
pub struct PostFilterCommand {
    filter: PostFilter,
}

impl PostFilterCommand {
    pub fn new(filter: PostFilter) -> Self {
        Self { filter }
    }

    pub fn filter_deleted() -> Self {
        Self::new(Arc::new(filter_deleted_items))
    }

    pub fn pass_all() -> Self {
        Self::new(Arc::new(always_pass))
    }
}

impl Default for PostFilterCommand {
    fn default() -> Self {
        Self::filter_deleted()
    }
}

impl fmt::Debug for PostFilterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostFilterCommand").finish_non_exhaustive()
    }
}

impl Command for PostFilterCommand {
    type Input<'a> = Record;
    type Output = Option<Record>;

    fn name(&self) -> &'static str {
        "post_filter"
    }

    fn execute(&self, record: Record) -> DalResult<Option<Record>> {
        match (self.filter)(record) {
            Err(DalError::NotFound { .. }) => Ok(None),
            other => other,
        }
    }
}
