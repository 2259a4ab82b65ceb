//! Attribute-level codecs.
//!
//! Stores see tag lists and timestamps in a flattened wire form. These
//! codecs own that translation in both directions.

pub mod epoch;
pub mod tag;

pub use epoch::{
    deserialize_epoch, serialize_epoch, serialize_epoch_int, serialize_epoch_numeric,
    serialize_epoch_str,
};
pub use tag::{
    deserialize_tag, serialize_tag, serialize_tag_list, serialize_tag_str, TagValue,
    TAG_DELIMITER,
};
