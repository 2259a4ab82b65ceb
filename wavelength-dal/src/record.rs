//! Change-tracking record.
//!
//! A [`Record`] holds one row's identity, lifecycle state and attributes,
//! plus the [`ChangeSet`] of attribute writes made since the last flush.
//! Ordinary callers write through [`Record::set`], which refuses key and
//! protected attributes. State-transition commands use the crate-internal
//! [`Record::override_protected_field`].

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use wavelength_core::{
    AttributeValue, CodecError, DalError, DalResult, Item, ModelSchema, RecordKey, TableState,
    TABLE_STATE,
};

/// Pending attribute writes, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: BTreeMap<String, AttributeValue>,
}

impl ChangeSet {
    pub fn contains(&self, name: &str) -> bool {
        self.changes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.changes.get(name)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn as_map(&self) -> &BTreeMap<String, AttributeValue> {
        &self.changes
    }

    fn record(&mut self, name: String, value: AttributeValue) {
        self.changes.insert(name, value);
    }

    fn clear(&mut self) {
        self.changes.clear();
    }
}

/// One logical entity mapped to one store row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<ModelSchema>,
    key: RecordKey,
    table_state: TableState,
    fields: BTreeMap<String, AttributeValue>,
    changes: ChangeSet,
}

impl Record {
    /// A fresh record in the `new` state with no attributes set.
    pub fn new(
        schema: Arc<ModelSchema>,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            key: RecordKey::new(partition_key, sort_key),
            table_state: TableState::New,
            fields: BTreeMap::new(),
            changes: ChangeSet::default(),
        }
    }

    /// Build from a source mapping. Every attribute becomes part of the
    /// baseline; none is recorded as a change.
    pub fn from_source(schema: Arc<ModelSchema>, source: &Map<String, Value>) -> DalResult<Self> {
        let key_part = |name: &str| -> DalResult<String> {
            source
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| DalError::validation(format!("Missing key attribute {}", name)))
        };
        let mut record = Record::new(
            schema.clone(),
            key_part(schema.hash_key())?,
            key_part(schema.range_key())?,
        );

        for (name, raw) in source {
            if schema.is_key_attribute(name) {
                continue;
            }
            let descriptor = schema.require_field(name)?;
            let value = AttributeValue::from_wire(name, descriptor.attribute_type, raw)?;
            record.apply_baseline(name, value)?;
        }
        Ok(record)
    }

    /// Build from a store row. Attributes the schema does not describe are
    /// carried along untouched.
    pub fn from_item(schema: Arc<ModelSchema>, item: Item) -> DalResult<Self> {
        let key = item.key(&schema).ok_or_else(|| {
            DalError::validation(format!(
                "Missing key attribute {} or {}",
                schema.hash_key(),
                schema.range_key()
            ))
        })?;
        let mut record = Record {
            schema,
            key,
            table_state: TableState::New,
            fields: BTreeMap::new(),
            changes: ChangeSet::default(),
        };
        record.load(item)?;
        Ok(record)
    }

    /// Store row for this record: keys, `table_state` and every attribute.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new()
            .with(self.schema.hash_key(), self.key.partition_key.as_str())
            .with(self.schema.range_key(), self.key.sort_key.as_str())
            .with(TABLE_STATE, self.table_state.as_db_str());
        for (name, value) in &self.fields {
            item.set(name.clone(), value.clone());
        }
        item
    }

    /// Wire-form JSON view of the record.
    pub fn to_json(&self) -> Value {
        Value::Object(self.to_item().to_wire())
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub(crate) fn schema_arc(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn partition_key(&self) -> &str {
        &self.key.partition_key
    }

    pub fn sort_key(&self) -> &str {
        &self.key.sort_key
    }

    pub fn table_state(&self) -> TableState {
        self.table_state
    }

    pub fn is_deleted(&self) -> bool {
        self.table_state.is_deleted()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, AttributeValue> {
        &self.fields
    }

    /// Current optimistic-concurrency version, if the schema tracks one.
    pub fn version(&self) -> Option<i64> {
        let attribute = self.schema.version_attribute()?;
        self.get(attribute)
            .and_then(AttributeValue::as_f64)
            .map(|v| v as i64)
    }

    /// Guarded setter for ordinary callers.
    ///
    /// Fails with a `ValidationFailure` for unknown attributes, key
    /// attributes, protected attributes and values of the wrong type.
    pub fn set(&mut self, name: &str, value: impl Into<AttributeValue>) -> DalResult<()> {
        let value = value.into();
        if self.schema.is_key_attribute(name) {
            return Err(DalError::validation(format!(
                "Attribute {} is part of the key and cannot be changed",
                name
            )));
        }
        let descriptor = self.schema.require_field(name)?;
        if descriptor.protected {
            return Err(DalError::validation(format!(
                "Attribute {} is protected",
                name
            )));
        }
        check_type(name, descriptor.attribute_type, &value)?;
        self.write(name, value);
        Ok(())
    }

    /// Setter for protected attributes. Records the change like [`set`], and
    /// holds `table_state` to its monotonic lifecycle.
    ///
    /// [`set`]: Record::set
    pub(crate) fn override_protected_field(
        &mut self,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> DalResult<()> {
        let value = value.into();
        if self.schema.is_key_attribute(name) {
            return Err(DalError::validation(format!(
                "Attribute {} is part of the key and cannot be changed",
                name
            )));
        }
        if name == TABLE_STATE {
            let next = parse_state(&value)?;
            if !self.table_state.can_transition_to(next) {
                return Err(DalError::validation(format!(
                    "Cannot move table_state from {} to {}",
                    self.table_state, next
                )));
            }
            self.table_state = next;
            self.changes.record(name.to_string(), value);
            return Ok(());
        }
        let descriptor = self.schema.require_field(name)?;
        check_type(name, descriptor.attribute_type, &value)?;
        self.write(name, value);
        Ok(())
    }

    /// Move to `next` through the protected-field path.
    pub(crate) fn transition_to(&mut self, next: TableState) -> DalResult<()> {
        self.override_protected_field(TABLE_STATE, next.as_db_str())
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Forget pending changes after a successful write.
    pub fn flush_changes(&mut self) {
        self.changes.clear();
    }

    /// Replace state and attributes with what the store returned.
    pub(crate) fn refresh_from(&mut self, item: Item) -> DalResult<()> {
        self.fields.clear();
        self.table_state = TableState::New;
        self.load(item)
    }

    fn write(&mut self, name: &str, value: AttributeValue) {
        if value.is_absent() {
            self.fields.remove(name);
        } else {
            self.fields.insert(name.to_string(), value.clone());
        }
        self.changes.record(name.to_string(), value);
    }

    fn apply_baseline(&mut self, name: &str, value: AttributeValue) -> DalResult<()> {
        if name == TABLE_STATE {
            self.table_state = parse_state(&value)?;
        } else if !value.is_absent() {
            self.fields.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn load(&mut self, item: Item) -> DalResult<()> {
        for (name, value) in item.attributes() {
            if self.schema.is_key_attribute(name) {
                continue;
            }
            self.apply_baseline(name, value.clone())?;
        }
        Ok(())
    }
}

fn parse_state(value: &AttributeValue) -> DalResult<TableState> {
    value
        .as_str()
        .and_then(|s| TableState::from_db_str(s).ok())
        .ok_or_else(|| DalError::validation(format!("Invalid table state: {}", value)))
}

fn check_type(
    name: &str,
    expected: wavelength_core::AttributeType,
    value: &AttributeValue,
) -> DalResult<()> {
    match value.attribute_type() {
        None => Ok(()),
        Some(actual) if actual == expected => Ok(()),
        Some(_) => Err(CodecError::TypeMismatch {
            attribute: name.to_string(),
            expected: expected.to_string(),
        }
        .into()),
    }
}
