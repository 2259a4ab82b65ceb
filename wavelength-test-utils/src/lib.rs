//! Wavelength Test Utilities
//!
//! Shared test infrastructure for the wavelength workspace:
//! - Proptest generators for keys, attribute values and filters
//! - Fixtures: a sample schema, rows and pre-wired models
//! - Custom assertions for DAL error kinds
//! - Tracing setup for tests

use std::sync::Arc;

// Re-export the in-memory store from its source crate
pub use wavelength_dal::{MockStore, StoreOp, StoreStats};

// Re-export core types for convenience
pub use wavelength_core::{
    AttributeValue, DalError, DalResult, ErrorKind, FieldDescriptor, FilterModel, Item,
    ModelSchema, RecordKey, StoreError, TableState, TABLE_STATE,
};

// ============================================================================
// TRACING
// ============================================================================

/// Install a fmt subscriber honouring `RUST_LOG` that writes through the
/// test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating DAL values.

    use super::*;
    use proptest::prelude::*;

    /// Key component: short, non-empty, no delimiter.
    pub fn arb_key_part() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,12}"
    }

    pub fn arb_record_key() -> impl Strategy<Value = RecordKey> {
        (arb_key_part(), arb_key_part()).prop_map(|(pk, sk)| RecordKey::new(pk, sk))
    }

    pub fn arb_tag() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,8}"
    }

    pub fn arb_table_state() -> impl Strategy<Value = TableState> {
        prop_oneof![
            Just(TableState::New),
            Just(TableState::Modified),
            Just(TableState::Deleted),
        ]
    }

    /// Any present attribute value.
    pub fn arb_attribute_value() -> impl Strategy<Value = AttributeValue> {
        prop_oneof![
            "[a-zA-Z0-9 ]{0,16}".prop_map(AttributeValue::String),
            (-1.0e6f64..1.0e6).prop_map(AttributeValue::Number),
            prop::collection::vec(arb_tag(), 1..4).prop_map(AttributeValue::Tags),
            (0i64..4_102_444_800_000_000).prop_map(AttributeValue::Epoch),
        ]
    }

    /// Filters that are valid against [`fixtures::account_schema`].
    pub fn arb_filter() -> impl Strategy<Value = FilterModel> {
        prop_oneof![
            "[a-z]{1,6}".prop_map(|v| FilterModel::eq("kind", v)),
            "[a-z]{1,6}".prop_map(|v| FilterModel::ne("kind", v)),
            "[a-z]{1,6}".prop_map(|v| FilterModel::startswith("kind", v)),
            arb_tag().prop_map(|t| FilterModel::contains("labels", t)),
            (0i64..1000, 0i64..1000).prop_map(|(a, b)| {
                FilterModel::between("score", a.min(b), a.max(b))
            }),
            prop::collection::vec("[a-z]{1,6}", 1..4)
                .prop_map(|values| FilterModel::is_in("kind", values)),
            Just(FilterModel::exists("kind")),
            Just(FilterModel::does_not_exist("labels")),
        ]
    }

    /// A row of the account schema under `key`.
    pub fn arb_account_item(key: RecordKey) -> impl Strategy<Value = Item> {
        (
            arb_table_state(),
            "[a-z]{1,6}",
            prop::collection::vec(arb_tag(), 0..3),
            0i64..1000,
        )
            .prop_map(move |(state, kind, labels, score)| {
                let item = Item::new()
                    .with("account_id", key.partition_key.clone())
                    .with("range_id", key.sort_key.clone())
                    .with(TABLE_STATE, state.as_db_str())
                    .with("kind", kind)
                    .with("score", score as f64);
                if labels.is_empty() {
                    item
                } else {
                    item.with("labels", labels)
                }
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built schemas, rows and models for common scenarios.

    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Map, Value};
    use wavelength_core::posix_timestamp;
    use wavelength_dal::{CacheConfig, CachingModel, Clock, CrudModel, RecordCache};

    /// Hash key `account_id`, range key `range_id`, plus `kind` (string),
    /// `labels` (tags), `created_at` (epoch) and `score` (number).
    pub fn account_schema() -> Arc<ModelSchema> {
        Arc::new(
            ModelSchema::new("accounts", "account_id", "range_id")
                .with_field("kind", FieldDescriptor::string())
                .with_field("labels", FieldDescriptor::tags())
                .with_field("created_at", FieldDescriptor::epoch())
                .with_field("score", FieldDescriptor::number()),
        )
    }

    /// Same as [`account_schema`] with a `version` attribute.
    pub fn versioned_account_schema() -> Arc<ModelSchema> {
        Arc::new(
            ModelSchema::new("accounts", "account_id", "range_id")
                .with_field("kind", FieldDescriptor::string())
                .with_field("labels", FieldDescriptor::tags())
                .with_field("created_at", FieldDescriptor::epoch())
                .with_field("score", FieldDescriptor::number())
                .with_version_attribute("version"),
        )
    }

    /// `{account_id: K1, range_id: K2, table_state: new, kind: abcd}`.
    pub fn sample_item() -> Item {
        account_item("K1", "K2", TableState::New, "abcd")
    }

    pub fn account_item(pk: &str, sk: &str, state: TableState, kind: &str) -> Item {
        Item::new()
            .with("account_id", pk)
            .with("range_id", sk)
            .with(TABLE_STATE, state.as_db_str())
            .with("kind", kind)
    }

    /// Wire-form source mapping with every attribute of the account schema.
    pub fn full_source() -> Map<String, Value> {
        let created = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).single().map(posix_timestamp);
        let value = json!({
            "account_id": "K1",
            "range_id": "K2",
            "table_state": "new",
            "kind": "abcd",
            "labels": "::red::blue::",
            "created_at": created,
            "score": 12.5,
        });
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Empty store for the account schema.
    pub fn account_store() -> Arc<MockStore> {
        Arc::new(MockStore::new(account_schema()))
    }

    pub fn crud_model(store: Arc<MockStore>) -> CrudModel<MockStore> {
        CrudModel::new(store, account_schema())
    }

    /// Caching model over `store` with its own cache and clock.
    pub fn caching_model(
        store: Arc<MockStore>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> CachingModel<MockStore> {
        let cache = Arc::new(RecordCache::with_clock(config, clock));
        CachingModel::new(crud_model(store), cache)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on DAL error kinds.

    use super::*;

    #[track_caller]
    fn assert_kind<T: std::fmt::Debug>(result: &DalResult<T>, expected: ErrorKind) {
        match result {
            Err(err) => assert_eq!(err.kind(), expected, "Wrong error kind: {:?}", err),
            Ok(value) => panic!("Expected {:?} error, got Ok({:?})", expected, value),
        }
    }

    /// Assert that a DalResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &DalResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert a NotFound error with the fixed message.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &DalResult<T>) {
        assert_kind(result, ErrorKind::NotFound);
        if let Err(err) = result {
            assert_eq!(err.to_string(), "Model does not exist");
        }
    }

    #[track_caller]
    pub fn assert_validation<T: std::fmt::Debug>(result: &DalResult<T>, message: &str) {
        assert_kind(result, ErrorKind::ValidationFailure);
        if let Err(err) = result {
            assert_eq!(err.to_string(), message);
        }
    }

    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &DalResult<T>, message: &str) {
        assert_kind(result, ErrorKind::Conflict);
        if let Err(err) = result {
            assert_eq!(err.to_string(), message);
        }
    }

    /// Assert an Unavailable error with the fixed message.
    #[track_caller]
    pub fn assert_unavailable<T: std::fmt::Debug>(result: &DalResult<T>) {
        assert_kind(result, ErrorKind::Unavailable);
        if let Err(err) = result {
            assert_eq!(err.to_string(), "Not Available");
        }
    }

    /// Assert the store saw exactly `expected` calls of `op`.
    #[track_caller]
    pub fn assert_store_calls(store: &MockStore, op: StoreOp, expected: u64) {
        let stats = store.stats();
        let actual = match op {
            StoreOp::Get => stats.gets,
            StoreOp::Put => stats.puts,
            StoreOp::Update => stats.updates,
            StoreOp::Delete => stats.deletes,
            StoreOp::Query => stats.queries,
        };
        assert_eq!(actual, expected, "Unexpected number of {:?} calls", op);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wavelength_dal::Record;

    #[test]
    fn test_full_source_builds_record() {
        let record = Record::from_source(fixtures::account_schema(), &fixtures::full_source()).unwrap();
        assert_eq!(record.get_str("kind"), Some("abcd"));
        assert_eq!(
            record.get("labels"),
            Some(&AttributeValue::Tags(vec!["red".to_string(), "blue".to_string()]))
        );
        assert!(matches!(record.get("created_at"), Some(AttributeValue::Epoch(_))));
        assert!(!record.has_changes());
    }

    #[test]
    fn test_sample_item_key() {
        let item = fixtures::sample_item();
        assert_eq!(
            item.key(&fixtures::account_schema()),
            Some(RecordKey::new("K1", "K2"))
        );
    }

    #[test]
    fn test_assertions() {
        init_test_tracing();
        assertions::assert_not_found::<()>(&Err(DalError::not_found()));
        assertions::assert_unavailable::<()>(&Err(DalError::unavailable()));
        assertions::assert_conflict::<()>(&Err(DalError::conflict("lost")), "lost");
        assertions::assert_validation::<()>(&Err(DalError::validation("bad")), "bad");
        assertions::assert_ok(&Ok::<_, DalError>(1));
    }

    #[test]
    #[should_panic(expected = "Expected NotFound error")]
    fn test_assertion_rejects_ok() {
        assertions::assert_not_found(&Ok::<_, DalError>(()));
    }

    proptest! {
        #[test]
        fn prop_generated_filters_build(filter in generators::arb_filter()) {
            let schema = fixtures::account_schema();
            prop_assert!(filter.to_condition(&schema).is_ok());
        }

        #[test]
        fn prop_generated_items_load(
            item in generators::arb_record_key().prop_flat_map(generators::arb_account_item)
        ) {
            let record = Record::from_item(fixtures::account_schema(), item);
            prop_assert!(record.is_ok());
        }
    }
}
