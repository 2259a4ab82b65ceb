//! Wavelength Core - Value Types
//!
//! Pure data structures shared by the data-access layer: errors, typed
//! attribute values and their codecs, the field descriptor table, filters
//! and conditions, store rows and identity helpers. No I/O happens here.

pub mod codec;
pub mod config;
pub mod differ;
pub mod error;
pub mod filter;
pub mod identity;
pub mod item;
pub mod schema;
pub mod state;
pub mod value;

pub use codec::{
    deserialize_epoch, deserialize_tag, serialize_epoch, serialize_epoch_numeric,
    serialize_epoch_str, serialize_tag, serialize_tag_list, TagValue, TAG_DELIMITER,
};
pub use config::{DalConfig, DEFAULT_QUERY_LIMIT};
pub use differ::DictDiffer;
pub use error::{
    translate_store_error, CodecError, ConfigError, DalError, DalResult, ErrorKind, StoreError,
    CONDITIONAL_CHECK_FAILED, MODEL_DOES_NOT_EXIST, NOT_AVAILABLE, VALIDATION_EXCEPTION,
};
pub use filter::{build_conditionals, Condition, FilterModel};
pub use identity::{posix_date, posix_timestamp, range_key, RecordKey, Timestamp};
pub use item::Item;
pub use schema::{FieldDescriptor, ModelSchema, Operator};
pub use state::{TableState, TableStateParseError, TABLE_STATE};
pub use value::{AttributeType, AttributeValue};
