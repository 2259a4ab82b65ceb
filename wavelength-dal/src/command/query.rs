//! Paginated query over one partition.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use wavelength_core::{DalConfig, DalResult, FilterModel};

use super::{Command, CommandContext, PostFilter, PostFilterCommand};
use crate::record::Record;
use crate::{ContinuationToken, QueryRequest, Store};

/// Arguments of a query command.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryArguments {
    pub hash_key: String,
    pub index_name: Option<String>,
    /// Conditions on the range key, ANDed together
    pub range_key_filter: Vec<FilterModel>,
    /// Conditions on other attributes, ANDed together
    pub filters: Vec<FilterModel>,
    pub scan_index_forward: bool,
    pub limit: usize,
    pub consistent_read: bool,
    pub last_evaluated_key: Option<ContinuationToken>,
}

impl QueryArguments {
    /// Arguments with the default paging: 30 rows, descending, eventually
    /// consistent.
    pub fn new(hash_key: impl Into<String>) -> Self {
        Self::from_config(hash_key, &DalConfig::default())
    }

    pub fn from_config(hash_key: impl Into<String>, config: &DalConfig) -> Self {
        Self {
            hash_key: hash_key.into(),
            index_name: None,
            range_key_filter: Vec::new(),
            filters: Vec::new(),
            scan_index_forward: config.scan_index_forward,
            limit: config.query_limit,
            consistent_read: config.consistent_read,
            last_evaluated_key: None,
        }
    }

    pub fn with_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn with_range_key_filter(mut self, filter: FilterModel) -> Self {
        self.range_key_filter.push(filter);
        self
    }

    pub fn with_filter(mut self, filter: FilterModel) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_scan_index_forward(mut self, forward: bool) -> Self {
        self.scan_index_forward = forward;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = consistent_read;
        self
    }

    /// Resume after a previous page.
    pub fn starting_after(mut self, token: Option<ContinuationToken>) -> Self {
        self.last_evaluated_key = token;
        self
    }
}

/// Visible records of one page plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub items: Vec<Record>,
    pub last_evaluated_key: Option<ContinuationToken>,
}

impl QueryResult {
    pub fn has_more(&self) -> bool {
        self.last_evaluated_key.is_some()
    }
}

/// Issues one paginated query and post-filters each item, silently
/// dropping items the filter hides.
#[derive(Debug)]
pub struct QueryCommand<S: Store> {
    ctx: CommandContext<S>,
    post_filter: PostFilterCommand,
}

impl<S: Store> QueryCommand<S> {
    /// Hides soft-deleted records.
    pub fn new(ctx: CommandContext<S>) -> Self {
        Self {
            ctx,
            post_filter: PostFilterCommand::filter_deleted(),
        }
    }

    pub fn with_post_filter(mut self, filter: PostFilter) -> Self {
        self.post_filter = PostFilterCommand::new(filter);
        self
    }

    fn build_request(&self, args: &QueryArguments) -> DalResult<QueryRequest> {
        Ok(QueryRequest {
            hash_key: args.hash_key.clone(),
            index_name: args.index_name.clone(),
            range_key_condition: self.ctx.build_conditionals(&args.range_key_filter)?.into_option(),
            filter_condition: self.ctx.build_conditionals(&args.filters)?.into_option(),
            limit: args.limit,
            scan_index_forward: args.scan_index_forward,
            consistent_read: args.consistent_read,
            last_evaluated_key: args.last_evaluated_key.clone(),
        })
    }
}

impl<S: Store> Command for QueryCommand<S> {
    type Input<'a> = &'a QueryArguments;
    type Output = QueryResult;

    fn name(&self) -> &'static str {
        "query"
    }

    fn execute(&self, args: &QueryArguments) -> DalResult<QueryResult> {
        debug!(
            command = self.name(),
            partition_key = %args.hash_key,
            index = ?args.index_name,
            limit = args.limit,
            "Dispatching command"
        );
        let request = self.build_request(args)?;
        let page = self.ctx.store().query(&request)?;

        let mut items = Vec::with_capacity(page.items.len());
        for item in page.items {
            let record = Record::from_item(self.ctx.schema_arc().clone(), item)?;
            match self.post_filter.execute(record)? {
                Some(visible) => items.push(visible),
                None => trace!(command = self.name(), "Dropped filtered item"),
            }
        }

        Ok(QueryResult {
            items,
            last_evaluated_key: page.last_evaluated_key,
        })
    }
}

/// Serializable view of [`QueryArguments`] for callers that receive them
/// over the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryArgumentsPayload {
    pub hash_key: String,
    pub index_name: Option<String>,
    pub range_key_filter: Vec<FilterModel>,
    pub filters: Vec<FilterModel>,
    pub scan_index_forward: Option<bool>,
    pub limit: Option<usize>,
    pub consistent_read: Option<bool>,
    pub last_evaluated_key: Option<ContinuationToken>,
}

impl QueryArgumentsPayload {
    pub fn into_arguments(self, config: &DalConfig) -> QueryArguments {
        let defaults = QueryArguments::from_config(self.hash_key, config);
        QueryArguments {
            index_name: self.index_name,
            range_key_filter: self.range_key_filter,
            filters: self.filters,
            scan_index_forward: self.scan_index_forward.unwrap_or(defaults.scan_index_forward),
            limit: self.limit.unwrap_or(defaults.limit),
            consistent_read: self.consistent_read.unwrap_or(defaults.consistent_read),
            last_evaluated_key: self.last_evaluated_key,
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::always_pass;
    use crate::mock::MockStore;
    use std::sync::Arc;
    use wavelength_core::{FieldDescriptor, Item, ModelSchema, StoreError, TABLE_STATE};

    fn schema() -> Arc<ModelSchema> {
        Arc::new(
            ModelSchema::new("accounts", "account_id", "range_id")
                .with_field("kind", FieldDescriptor::string()),
        )
    }

    fn setup() -> (Arc<MockStore>, QueryCommand<MockStore>) {
        let store = Arc::new(MockStore::new(schema()).with_index("test-index-name", "kind", None));
        for (sk, state, kind) in [
            ("a", "new", "abcd"),
            ("b", "modified", "abcd"),
            ("c", "deleted", "abcd"),
            ("d", "modified", "wxyz"),
        ] {
            store
                .seed(
                    &Item::new()
                        .with("account_id", "1234")
                        .with("range_id", sk)
                        .with(TABLE_STATE, state)
                        .with("kind", kind),
                )
                .unwrap();
        }
        let command = QueryCommand::new(CommandContext::new(store.clone(), schema()));
        (store, command)
    }

    #[test]
    fn test_query_arguments_defaults() {
        let args = QueryArguments::new("test-hash-key");
        assert_eq!(args.hash_key, "test-hash-key");
        assert_eq!(args.index_name, None);
        assert!(args.range_key_filter.is_empty());
        assert!(args.filters.is_empty());
        assert!(!args.scan_index_forward);
        assert_eq!(args.limit, 30);
        assert!(!args.consistent_read);

        let args = args.with_consistent_read(true);
        assert!(args.consistent_read);
    }

    #[test]
    fn test_query_passes_arguments_to_store() {
        let (store, command) = setup();
        let args = QueryArguments::new("1234")
            .with_index("test-index-name")
            .with_limit(30);
        command.execute(&args).unwrap();

        let request = store.last_query().unwrap();
        assert_eq!(request.hash_key, "1234");
        assert_eq!(request.index_name.as_deref(), Some("test-index-name"));
        assert_eq!(request.range_key_condition, None);
        assert_eq!(request.filter_condition, None);
        assert_eq!(request.limit, 30);
        assert!(!request.scan_index_forward);
        assert!(!request.consistent_read);
        assert_eq!(request.last_evaluated_key, None);
    }

    #[test]
    fn test_deleted_items_are_dropped_silently() {
        let (_store, command) = setup();
        let result = command.execute(&QueryArguments::new("1234")).unwrap();
        let keys: Vec<&str> = result.items.iter().map(|r| r.sort_key()).collect();
        assert_eq!(keys, vec!["d", "b", "a"]);
        assert!(!result.has_more());
    }

    #[test]
    fn test_always_pass_keeps_everything() {
        let (_store, command) = setup();
        let command = command.with_post_filter(Arc::new(always_pass));
        let result = command.execute(&QueryArguments::new("1234")).unwrap();
        assert_eq!(result.items.len(), 4);
    }

    #[test]
    fn test_filters_and_range_conditions() {
        let (_store, command) = setup();
        let args = QueryArguments::new("1234")
            .with_range_key_filter(FilterModel::between("range_id", "a", "c"))
            .with_filter(FilterModel::eq("kind", "abcd"))
            .with_scan_index_forward(true);
        let result = command.execute(&args).unwrap();
        let keys: Vec<&str> = result.items.iter().map(|r| r.sort_key()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_filter_is_validation_failure() {
        let (store, command) = setup();
        let args = QueryArguments::new("1234").with_filter(FilterModel::eq("colour", "red"));
        let err = command.execute(&args).unwrap_err();
        assert_eq!(err.to_string(), "Model has no property named \"colour\"");
        assert_eq!(store.stats().queries, 0);
    }

    #[test]
    fn test_pagination() {
        let (_store, command) = setup();
        let first = command
            .execute(
                &QueryArguments::new("1234")
                    .with_limit(2)
                    .with_scan_index_forward(true),
            )
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.has_more());

        let second = command
            .execute(
                &QueryArguments::new("1234")
                    .with_limit(2)
                    .with_scan_index_forward(true)
                    .starting_after(first.last_evaluated_key),
            )
            .unwrap();
        // "c" is soft-deleted and dropped after the page was read.
        let keys: Vec<&str> = second.items.iter().map(|r| r.sort_key()).collect();
        assert_eq!(keys, vec!["d"]);
        assert!(!second.has_more());
    }

    #[test]
    fn test_store_failure_is_translated() {
        let (store, command) = setup();
        store.fail_next(StoreError::validation("Query condition missed key schema element"));
        let err = command.execute(&QueryArguments::new("1234")).unwrap_err();
        assert_eq!(err.to_string(), "Query condition missed key schema element");
    }

    #[test]
    fn test_payload_defaults() {
        let payload: QueryArgumentsPayload =
            serde_json::from_value(serde_json::json!({"hash_key": "1234", "limit": 5})).unwrap();
        let args = payload.into_arguments(&DalConfig::default());
        assert_eq!(args.hash_key, "1234");
        assert_eq!(args.limit, 5);
        assert!(!args.scan_index_forward);
    }
}
