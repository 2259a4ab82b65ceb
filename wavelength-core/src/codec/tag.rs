//! Tag list codec.
//!
//! A tag list is stored as a single string, each tag wrapped in the `::`
//! delimiter: `["a", "b"]` becomes `"::a::b::"`. Wrapping both ends lets a
//! plain substring match on `"::a::"` find a whole tag.

use serde_json::Value;

/// Delimiter placed between and around serialized tags.
pub const TAG_DELIMITER: &str = "::";

/// Result of decoding a stored tag string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// A delimited string decoded into its tags.
    List(Vec<String>),
    /// A string that was not in delimited form, returned unchanged.
    Text(String),
}

impl TagValue {
    /// Tags as a list. Non-empty plain text counts as a single tag.
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagValue::List(tags) => tags,
            TagValue::Text(text) if text.is_empty() => Vec::new(),
            TagValue::Text(text) => vec![text],
        }
    }
}

/// Serialize a tag list. An empty list has no stored form.
pub fn serialize_tag_list<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }

    let joined = tags
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(TAG_DELIMITER);
    Some(format!("{TAG_DELIMITER}{joined}{TAG_DELIMITER}"))
}

/// Serialize a single tag.
pub fn serialize_tag_str(tag: &str) -> String {
    format!("{TAG_DELIMITER}{tag}{TAG_DELIMITER}")
}

/// Serialize a JSON tag input: a list of strings or a single string.
///
/// Any other shape (objects, numbers, booleans, lists holding non-strings)
/// has no stored form.
pub fn serialize_tag(value: &Value) -> Option<String> {
    match value {
        Value::String(tag) => Some(serialize_tag_str(tag)),
        Value::Array(items) => {
            let tags = items
                .iter()
                .map(|item| item.as_str())
                .collect::<Option<Vec<_>>>()?;
            serialize_tag_list(&tags)
        }
        _ => None,
    }
}

/// Deserialize a stored tag string.
pub fn deserialize_tag(raw: &str) -> TagValue {
    let bracketed = raw.len() >= TAG_DELIMITER.len() * 2
        && raw.starts_with(TAG_DELIMITER)
        && raw.ends_with(TAG_DELIMITER);

    if !bracketed {
        return TagValue::Text(raw.to_string());
    }

    let inner = &raw[TAG_DELIMITER.len()..raw.len() - TAG_DELIMITER.len()];
    TagValue::List(
        inner
            .split(TAG_DELIMITER)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_tag_list() {
        assert_eq!(
            serialize_tag_list(&["a", "b"]),
            Some("::a::b::".to_string())
        );
        assert_eq!(
            serialize_tag_list(&["tag1", "tag2", "tag3"]),
            Some("::tag1::tag2::tag3::".to_string())
        );
    }

    #[test]
    fn test_empty_list_has_no_stored_form() {
        let empty: [&str; 0] = [];
        assert_eq!(serialize_tag_list(&empty), None);
        assert_eq!(serialize_tag(&json!([])), None);
    }

    #[test]
    fn test_serialize_tag_accepts_string_and_list() {
        assert_eq!(serialize_tag(&json!("tag-1")), Some("::tag-1::".to_string()));
        assert_eq!(
            serialize_tag(&json!(["tag-1", "tag-2"])),
            Some("::tag-1::tag-2::".to_string())
        );
    }

    #[test]
    fn test_serialize_tag_rejects_other_shapes() {
        assert_eq!(serialize_tag(&json!({"test_dict": 123})), None);
        assert_eq!(serialize_tag(&json!(true)), None);
        assert_eq!(serialize_tag(&json!(["ok", 3])), None);
    }

    #[test]
    fn test_deserialize_bracketed_string() {
        assert_eq!(
            deserialize_tag("::a::b::"),
            TagValue::List(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_deserialize_plain_strings_unchanged() {
        assert_eq!(deserialize_tag(""), TagValue::Text(String::new()));
        assert_eq!(deserialize_tag("tag-1"), TagValue::Text("tag-1".to_string()));
        assert_eq!(deserialize_tag("::"), TagValue::Text("::".to_string()));
    }

    #[test]
    fn test_into_tags() {
        assert!(TagValue::Text(String::new()).into_tags().is_empty());
        assert_eq!(TagValue::Text("x".into()).into_tags(), vec!["x".to_string()]);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Tags without the delimiter survive a store round trip.
        #[test]
        fn prop_tag_list_survives_storage(
            tags in prop::collection::vec("[a-z0-9-]{1,12}", 1..8)
        ) {
            let stored = serialize_tag_list(&tags).unwrap();
            prop_assert!(stored.starts_with(TAG_DELIMITER));
            prop_assert!(stored.ends_with(TAG_DELIMITER));
            prop_assert_eq!(deserialize_tag(&stored), TagValue::List(tags));
        }
    }
}
