//! Read-through, write-through cache in front of a [`CrudModel`].

use std::sync::Arc;

use tracing::debug;
use wavelength_core::{DalResult, RecordKey};

use super::CrudModel;
use crate::cache::{CacheKey, RecordCache};
use crate::command::{QueryArguments, QueryResult};
use crate::record::Record;
use crate::Store;

/// Decorates a [`CrudModel`] with a [`RecordCache`].
///
/// `get` serves fresh snapshots without a store call. Every live record that
/// comes back from `get`, `query`, `save` or `update` is written through to
/// the cache under the model's name and the record's key. Deleted records
/// are never served from or kept in the cache. `delete` and `purge` evict
/// the key so the next `get` re-reads the store. The cache is injected so
/// that several models, or a test, can own its lifecycle.
#[derive(Debug)]
pub struct CachingModel<S: Store> {
    crud: CrudModel<S>,
    cache: Arc<RecordCache>,
}

impl<S: Store> CachingModel<S> {
    pub fn new(crud: CrudModel<S>, cache: Arc<RecordCache>) -> Self {
        Self { crud, cache }
    }

    pub fn crud(&self) -> &CrudModel<S> {
        &self.crud
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    /// Cache key for `key` under this model.
    pub fn cache_key(&self, key: &RecordKey) -> CacheKey {
        CacheKey::new(self.crud.schema().name(), key.clone())
    }

    pub fn get(&self, key: &RecordKey) -> DalResult<Record> {
        let cache_key = self.cache_key(key);
        if let Some(record) = self.cache.get(&cache_key) {
            if !record.is_deleted() {
                debug!(cache_key = %cache_key, "Served record from cache");
                return Ok(record);
            }
            self.cache.invalidate(&cache_key);
        }
        let ticket = self.cache.begin_read();
        let record = self.crud.read(key)?;
        self.cache.fill(&ticket, &record);
        Ok(record)
    }

    /// Runs the query against the store and caches every visible item.
    pub fn query(&self, args: &QueryArguments) -> DalResult<QueryResult> {
        let ticket = self.cache.begin_read();
        let result = self.crud.query(args)?;
        let mut cached = 0;
        for record in result.items.iter().filter(|record| !record.is_deleted()) {
            if self.cache.fill(&ticket, record) {
                cached += 1;
            }
        }
        debug!(
            model = self.crud.schema().name(),
            partition_key = %args.hash_key,
            cached,
            "Cached query results"
        );
        Ok(result)
    }

    pub fn save(&self, record: &mut Record) -> DalResult<Record> {
        let saved = self.crud.create(record)?;
        self.write_through(&saved);
        Ok(saved)
    }

    pub fn update(&self, record: &mut Record) -> DalResult<Record> {
        let updated = self.crud.update(record)?;
        self.write_through(&updated);
        Ok(updated)
    }

    /// Soft delete, then evict.
    pub fn delete(&self, record: &mut Record) -> DalResult<Record> {
        let deleted = self.crud.delete(record)?;
        self.cache.invalidate(&self.cache_key(deleted.key()));
        Ok(deleted)
    }

    /// Physical delete, then evict.
    pub fn purge(&self, key: &RecordKey) -> DalResult<Record> {
        let removed = self.crud.purge(key)?;
        self.cache.invalidate(&self.cache_key(key));
        Ok(removed)
    }

    fn write_through(&self, record: &Record) {
        if record.is_deleted() {
            self.cache.invalidate(&CacheKey::of(record));
        } else {
            self.cache.insert(record);
        }
    }
}
