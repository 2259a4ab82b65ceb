//! Store rows.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::identity::RecordKey;
use crate::schema::ModelSchema;
use crate::state::{TableState, TABLE_STATE};
use crate::value::AttributeValue;

/// One row as the store sees it: a flat map of typed attributes, key
/// attributes included.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    attributes: BTreeMap<String, AttributeValue>,
}

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set an attribute. Absent values remove it, matching store semantics.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        if value.is_absent() {
            self.attributes.remove(&name);
        } else {
            self.attributes.insert(name, value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Identity of this row under `schema`, if both key attributes are strings.
    pub fn key(&self, schema: &ModelSchema) -> Option<RecordKey> {
        let partition_key = self.get(schema.hash_key())?.as_str()?;
        let sort_key = self.get(schema.range_key())?.as_str()?;
        Some(RecordKey::new(partition_key, sort_key))
    }

    pub fn table_state(&self) -> Option<TableState> {
        self.get(TABLE_STATE)
            .and_then(AttributeValue::as_str)
            .and_then(|s| TableState::from_db_str(s).ok())
    }

    /// Wire form of the row; absent attributes are omitted.
    pub fn to_wire(&self) -> Map<String, Value> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.to_wire()))
            .filter(|(_, value)| !value.is_null())
            .collect()
    }

    /// Decode a wire row. Described attributes are decoded by type; others
    /// are inferred from their JSON shape.
    pub fn from_wire(schema: &ModelSchema, row: &Map<String, Value>) -> Result<Self, CodecError> {
        let mut item = Item::new();
        for (name, raw) in row {
            let value = match schema.field(name) {
                Some(descriptor) => AttributeValue::from_wire(name, descriptor.attribute_type, raw)?,
                None => AttributeValue::infer_from_wire(raw).ok_or_else(|| {
                    CodecError::TypeMismatch {
                        attribute: name.clone(),
                        expected: "scalar".to_string(),
                    }
                })?,
            };
            item.set(name.clone(), value);
        }
        Ok(item)
    }
}

impl FromIterator<(String, AttributeValue)> for Item {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        let mut item = Item::new();
        for (name, value) in iter {
            item.set(name, value);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;
    use serde_json::json;

    fn schema() -> ModelSchema {
        ModelSchema::new("accounts", "account_id", "range_id")
            .with_field("labels", FieldDescriptor::tags())
            .with_field("created_at", FieldDescriptor::epoch())
    }

    #[test]
    fn test_key_extraction() {
        let item = Item::new()
            .with("account_id", "K1")
            .with("range_id", "K2")
            .with(TABLE_STATE, "new");
        assert_eq!(item.key(&schema()), Some(RecordKey::new("K1", "K2")));
        assert_eq!(item.table_state(), Some(TableState::New));
    }

    #[test]
    fn test_missing_key_attribute() {
        let item = Item::new().with("account_id", "K1");
        assert_eq!(item.key(&schema()), None);
    }

    #[test]
    fn test_absent_values_are_not_stored() {
        let item = Item::new()
            .with("labels", AttributeValue::Tags(vec![]))
            .with("kind", AttributeValue::Null);
        assert!(item.is_empty());
    }

    #[test]
    fn test_wire_round_trip_uses_codecs() {
        let item = Item::new()
            .with("account_id", "K1")
            .with("labels", vec!["a".to_string(), "b".to_string()])
            .with("created_at", AttributeValue::Epoch(1576421280000000));

        let wire = item.to_wire();
        assert_eq!(wire["labels"], json!("::a::b::"));
        assert_eq!(wire["created_at"], json!(1576421280000000i64));

        let decoded = Item::from_wire(&schema(), &wire).unwrap();
        assert_eq!(decoded, item);
    }
}
