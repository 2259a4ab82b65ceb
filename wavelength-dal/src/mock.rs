//! In-memory store for tests.
//!
//! Rows are kept in wire form, so every read and write goes through the
//! attribute codecs the way a real store round trip would.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};
use wavelength_core::{AttributeValue, Condition, Item, ModelSchema, RecordKey, StoreError};

use crate::{ContinuationToken, QueryPage, QueryRequest, Store, UpdateAction};

type WireRow = Map<String, Value>;

/// Message a real store uses for a failed conditional write.
const CONDITIONAL_REQUEST_FAILED: &str = "The conditional request failed";

/// Store operation kinds, for targeted fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Put,
    Update,
    Delete,
    Query,
}

/// Counters for every store operation issued against a [`MockStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub gets: u64,
    pub puts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub queries: u64,
}

impl StoreStats {
    pub fn total(&self) -> u64 {
        self.gets + self.puts + self.updates + self.deletes + self.queries
    }
}

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    puts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    queries: AtomicU64,
}

/// Key layout of a secondary index.
#[derive(Debug, Clone)]
struct IndexKeys {
    hash_attribute: String,
    range_attribute: Option<String>,
}

/// In-memory [`Store`] with query semantics close to a managed key-value
/// store: hash-key match, range condition, `limit` counted before the
/// filter condition, ordering on the range attribute and continuation
/// tokens.
#[derive(Debug)]
pub struct MockStore {
    schema: Arc<ModelSchema>,
    rows: RwLock<BTreeMap<RecordKey, WireRow>>,
    indexes: HashMap<String, IndexKeys>,
    counters: Counters,
    failures: Mutex<VecDeque<(Option<StoreOp>, StoreError)>>,
    last_query: Mutex<Option<QueryRequest>>,
}

impl MockStore {
    /// Create an empty store for rows of `schema`.
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Self {
            schema,
            rows: RwLock::new(BTreeMap::new()),
            indexes: HashMap::new(),
            counters: Counters::default(),
            failures: Mutex::new(VecDeque::new()),
            last_query: Mutex::new(None),
        }
    }

    /// Register a secondary index queryable by `name`.
    pub fn with_index(
        mut self,
        name: impl Into<String>,
        hash_attribute: impl Into<String>,
        range_attribute: Option<&str>,
    ) -> Self {
        self.indexes.insert(
            name.into(),
            IndexKeys {
                hash_attribute: hash_attribute.into(),
                range_attribute: range_attribute.map(str::to_string),
            },
        );
        self
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// Make the next store call fail with `err`. Calls queue up in order.
    pub fn fail_next(&self, err: StoreError) {
        self.failures_lock().push_back((None, err));
    }

    /// Make the next call of kind `op` fail with `err`; other calls pass.
    pub fn fail_on(&self, op: StoreOp, err: StoreError) {
        self.failures_lock().push_back((Some(op), err));
    }

    /// Insert a row directly, bypassing conditions and counters.
    pub fn seed(&self, item: &Item) -> Result<(), StoreError> {
        let key = self.key_of(item)?;
        self.rows_write().insert(key, item.to_wire());
        Ok(())
    }

    /// Raw row as currently stored, bypassing counters.
    pub fn raw(&self, key: &RecordKey) -> Option<Item> {
        let row = self.rows_read().get(key).cloned()?;
        Item::from_wire(&self.schema, &row).ok()
    }

    pub fn len(&self) -> usize {
        self.rows_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows_read().is_empty()
    }

    /// Clear all stored rows and queued failures.
    pub fn clear(&self) {
        self.rows_write().clear();
        self.failures_lock().clear();
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            gets: self.counters.gets.load(AtomicOrdering::Relaxed),
            puts: self.counters.puts.load(AtomicOrdering::Relaxed),
            updates: self.counters.updates.load(AtomicOrdering::Relaxed),
            deletes: self.counters.deletes.load(AtomicOrdering::Relaxed),
            queries: self.counters.queries.load(AtomicOrdering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        for counter in [
            &self.counters.gets,
            &self.counters.puts,
            &self.counters.updates,
            &self.counters.deletes,
            &self.counters.queries,
        ] {
            counter.store(0, AtomicOrdering::Relaxed);
        }
    }

    /// The most recent query request, as the store received it.
    pub fn last_query(&self) -> Option<QueryRequest> {
        self.last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // === Internals ===

    fn rows_read(&self) -> RwLockReadGuard<'_, BTreeMap<RecordKey, WireRow>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn rows_write(&self) -> RwLockWriteGuard<'_, BTreeMap<RecordKey, WireRow>> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn failures_lock(&self) -> MutexGuard<'_, VecDeque<(Option<StoreOp>, StoreError)>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and surface any injected failure.
    fn begin(&self, op: StoreOp) -> Result<(), StoreError> {
        let counter = match op {
            StoreOp::Get => &self.counters.gets,
            StoreOp::Put => &self.counters.puts,
            StoreOp::Update => &self.counters.updates,
            StoreOp::Delete => &self.counters.deletes,
            StoreOp::Query => &self.counters.queries,
        };
        counter.fetch_add(1, AtomicOrdering::Relaxed);

        let mut failures = self.failures_lock();
        let position = failures
            .iter()
            .position(|(target, _)| target.map_or(true, |t| t == op));
        match position.and_then(|pos| failures.remove(pos)) {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    fn key_of(&self, item: &Item) -> Result<RecordKey, StoreError> {
        item.key(&self.schema).ok_or_else(|| {
            StoreError::validation(format!(
                "One or more parameter values were invalid: Missing the key {} or {} in the item",
                self.schema.hash_key(),
                self.schema.range_key()
            ))
        })
    }

    fn decode(&self, row: &WireRow) -> Result<Item, StoreError> {
        Item::from_wire(&self.schema, row).map_err(|e| StoreError::validation(e.to_string()))
    }

    fn check(&self, current: &Item, condition: Option<&Condition>) -> Result<(), StoreError> {
        match condition {
            Some(condition) if !condition.evaluate(current) => Err(
                StoreError::conditional_check_failed(CONDITIONAL_REQUEST_FAILED),
            ),
            _ => Ok(()),
        }
    }

    fn index_keys(&self, index_name: Option<&str>) -> Result<IndexKeys, StoreError> {
        match index_name {
            None => Ok(IndexKeys {
                hash_attribute: self.schema.hash_key().to_string(),
                range_attribute: Some(self.schema.range_key().to_string()),
            }),
            Some(name) => self.indexes.get(name).cloned().ok_or_else(|| {
                StoreError::validation(format!(
                    "The table does not have the specified index: {}",
                    name
                ))
            }),
        }
    }

    fn token_for(&self, item: &Item, keys: &IndexKeys) -> ContinuationToken {
        let mut token = Map::new();
        let mut attributes = vec![
            self.schema.hash_key(),
            self.schema.range_key(),
            keys.hash_attribute.as_str(),
        ];
        if let Some(range) = keys.range_attribute.as_deref() {
            attributes.push(range);
        }
        for attribute in attributes {
            if let Some(value) = item.get(attribute) {
                token.insert(attribute.to_string(), value.to_wire());
            }
        }
        ContinuationToken(token)
    }
}

fn compare_range(a: &Item, b: &Item, range_attribute: Option<&str>) -> Ordering {
    let Some(range) = range_attribute else {
        return Ordering::Equal;
    };
    match (a.get(range), b.get(range)) {
        (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

impl Store for MockStore {
    fn get(&self, key: &RecordKey, _consistent_read: bool) -> Result<Item, StoreError> {
        self.begin(StoreOp::Get)?;
        let rows = self.rows_read();
        let row = rows
            .get(key)
            .ok_or_else(|| StoreError::does_not_exist(format!("No row for {}", key)))?;
        self.decode(row)
    }

    fn put(&self, item: &Item, condition: Option<&Condition>) -> Result<(), StoreError> {
        self.begin(StoreOp::Put)?;
        let key = self.key_of(item)?;
        let mut rows = self.rows_write();
        let current = match rows.get(&key) {
            Some(row) => self.decode(row)?,
            None => Item::new(),
        };
        self.check(&current, condition)?;
        rows.insert(key, item.to_wire());
        Ok(())
    }

    fn update(
        &self,
        key: &RecordKey,
        actions: &[UpdateAction],
        condition: Option<&Condition>,
    ) -> Result<Item, StoreError> {
        self.begin(StoreOp::Update)?;
        if let Some(action) = actions
            .iter()
            .find(|a| self.schema.is_key_attribute(a.attribute()))
        {
            return Err(StoreError::validation(format!(
                "One or more parameter values were invalid: Cannot update attribute {}. \
                 This attribute is part of the key",
                action.attribute()
            )));
        }

        let mut rows = self.rows_write();
        let mut current = match rows.get(key) {
            Some(row) => self.decode(row)?,
            None => Item::new(),
        };
        self.check(&current, condition)?;

        current.set(self.schema.hash_key(), key.partition_key.as_str());
        current.set(self.schema.range_key(), key.sort_key.as_str());
        for action in actions {
            action.apply(&mut current);
        }
        rows.insert(key.clone(), current.to_wire());
        Ok(current)
    }

    fn delete(&self, key: &RecordKey, condition: Option<&Condition>) -> Result<(), StoreError> {
        self.begin(StoreOp::Delete)?;
        let mut rows = self.rows_write();
        let current = rows
            .get(key)
            .ok_or_else(|| StoreError::does_not_exist(format!("No row for {}", key)))
            .and_then(|row| self.decode(row))?;
        self.check(&current, condition)?;
        rows.remove(key);
        Ok(())
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryPage, StoreError> {
        self.begin(StoreOp::Query)?;
        *self.last_query.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        let keys = self.index_keys(request.index_name.as_deref())?;
        let hash_value = AttributeValue::from(request.hash_key.as_str());

        let mut matching = Vec::new();
        for row in self.rows_read().values() {
            let item = self.decode(row)?;
            if item.get(&keys.hash_attribute) != Some(&hash_value) {
                continue;
            }
            if let Some(range_attribute) = keys.range_attribute.as_deref() {
                // Index queries only see rows that carry the index range key.
                if request.index_name.is_some() && item.get(range_attribute).is_none() {
                    continue;
                }
            }
            if request
                .range_key_condition
                .as_ref()
                .is_some_and(|c| !c.evaluate(&item))
            {
                continue;
            }
            matching.push(item);
        }

        let order = |a: &Item, b: &Item| {
            compare_range(a, b, keys.range_attribute.as_deref())
                .then_with(|| a.key(&self.schema).cmp(&b.key(&self.schema)))
        };
        matching.sort_by(|a, b| order(a, b));
        if !request.scan_index_forward {
            matching.reverse();
        }

        // Resume after the token's position in scan order, which still works
        // when the row it names has since been removed.
        let start = match &request.last_evaluated_key {
            Some(token) => {
                let anchor = self.decode(token.as_map())?;
                let past_anchor = if request.scan_index_forward {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
                matching
                    .iter()
                    .position(|item| order(item, &anchor) == past_anchor)
                    .unwrap_or(matching.len())
            }
            None => 0,
        };

        let examined: Vec<Item> = matching
            .iter()
            .skip(start)
            .take(request.limit)
            .cloned()
            .collect();
        let has_more = start + examined.len() < matching.len();
        let last_evaluated_key = match examined.last() {
            Some(last) if has_more => Some(self.token_for(last, &keys)),
            _ => None,
        };

        let items = examined
            .into_iter()
            .filter(|item| {
                request
                    .filter_condition
                    .as_ref()
                    .map_or(true, |c| c.evaluate(item))
            })
            .collect();

        Ok(QueryPage {
            items,
            last_evaluated_key,
        })
    }
}
