//! Declarative filters and the conditional expression tree
//!
//! A [`FilterModel`] is the caller-facing `(attribute, operator, operand)`
//! triple. Resolving it against a [`ModelSchema`] yields a [`Condition`],
//! the store-native predicate used for conditional writes, range-key
//! conditions and query filters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::error::{DalError, DalResult};
use crate::item::Item;
use crate::schema::{FieldDescriptor, ModelSchema, Operator};
use crate::value::{AttributeType, AttributeValue};

// ============================================================================
// FILTER MODEL
// ============================================================================

/// Declarative filter on one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterModel {
    /// Attribute to filter on
    pub attribute_name: String,
    /// Operator name, e.g. `eq` or `between`
    pub operator_name: String,
    /// Operand; its shape depends on the operator
    pub operand: Value,
}

impl FilterModel {
    pub fn new(
        attribute_name: impl Into<String>,
        operator_name: impl Into<String>,
        operand: Value,
    ) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            operator_name: operator_name.into(),
            operand,
        }
    }

    pub fn eq(attribute_name: impl Into<String>, operand: impl Into<Value>) -> Self {
        Self::new(attribute_name, Operator::Eq.name(), operand.into())
    }

    pub fn ne(attribute_name: impl Into<String>, operand: impl Into<Value>) -> Self {
        Self::new(attribute_name, Operator::Ne.name(), operand.into())
    }

    pub fn between(
        attribute_name: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::new(
            attribute_name,
            Operator::Between.name(),
            Value::Array(vec![low.into(), high.into()]),
        )
    }

    pub fn startswith(attribute_name: impl Into<String>, prefix: impl Into<Value>) -> Self {
        Self::new(attribute_name, Operator::StartsWith.name(), prefix.into())
    }

    pub fn is_in<V: Into<Value>>(
        attribute_name: impl Into<String>,
        operands: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            attribute_name,
            Operator::IsIn.name(),
            Value::Array(operands.into_iter().map(Into::into).collect()),
        )
    }

    pub fn contains(attribute_name: impl Into<String>, operand: impl Into<Value>) -> Self {
        Self::new(attribute_name, Operator::Contains.name(), operand.into())
    }

    pub fn exists(attribute_name: impl Into<String>) -> Self {
        Self::new(attribute_name, Operator::Exists.name(), Value::Null)
    }

    pub fn does_not_exist(attribute_name: impl Into<String>) -> Self {
        Self::new(attribute_name, Operator::DoesNotExist.name(), Value::Null)
    }

    /// Resolve against `schema`, validating the attribute, the operator and
    /// the operand shape.
    pub fn to_condition(&self, schema: &ModelSchema) -> DalResult<Condition> {
        let (descriptor, operator) =
            schema.require_operator(&self.attribute_name, &self.operator_name)?;
        let operands = shape_operands(&self.attribute_name, descriptor, operator, &self.operand)?;
        Ok(Condition::Predicate {
            attribute: self.attribute_name.clone(),
            operator,
            operands,
        })
    }
}

/// AND together every filter, in input order. An empty list yields
/// [`Condition::Always`].
pub fn build_conditionals(schema: &ModelSchema, filters: &[FilterModel]) -> DalResult<Condition> {
    filters.iter().try_fold(Condition::Always, |acc, filter| {
        Ok(acc.and(filter.to_condition(schema)?))
    })
}

fn shape_operands(
    attribute: &str,
    descriptor: &FieldDescriptor,
    operator: Operator,
    operand: &Value,
) -> DalResult<Vec<AttributeValue>> {
    // Membership on a tag list compares single tags.
    let operand_type = match (descriptor.attribute_type, operator) {
        (AttributeType::Tags, Operator::Contains) => AttributeType::String,
        (attribute_type, _) => attribute_type,
    };
    let decode = |raw: &Value| -> DalResult<AttributeValue> {
        let value = AttributeValue::from_wire(attribute, operand_type, raw)?;
        if value.is_absent() {
            return Err(DalError::validation(format!(
                "Operator {} expects a value for attribute {}",
                operator, attribute
            )));
        }
        Ok(value)
    };

    match operator {
        Operator::Exists | Operator::DoesNotExist => {
            if operand.is_null() {
                Ok(Vec::new())
            } else {
                Err(DalError::validation(format!(
                    "Operator {} takes no operand",
                    operator
                )))
            }
        }
        Operator::Between => match operand.as_array() {
            Some(bounds) if bounds.len() == 2 => bounds.iter().map(decode).collect(),
            _ => Err(DalError::validation(
                "Operator between expects a list of two values",
            )),
        },
        Operator::IsIn => match operand {
            Value::Array(values) if values.is_empty() => Err(DalError::validation(
                "Operator is_in expects at least one value",
            )),
            Value::Array(values) => values.iter().map(decode).collect(),
            scalar => Ok(vec![decode(scalar)?]),
        },
        _ => Ok(vec![decode(operand)?]),
    }
}

// ============================================================================
// CONDITION TREE
// ============================================================================

/// Store-native predicate over a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Universally true; the identity for [`Condition::and`].
    Always,
    Predicate {
        attribute: String,
        operator: Operator,
        operands: Vec<AttributeValue>,
    },
    And(Vec<Condition>),
}

impl Condition {
    /// Predicate built directly, without schema validation. Used by commands
    /// for the conditions they impose themselves.
    pub fn predicate(
        attribute: impl Into<String>,
        operator: Operator,
        operands: Vec<AttributeValue>,
    ) -> Self {
        Condition::Predicate {
            attribute: attribute.into(),
            operator,
            operands,
        }
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::predicate(attribute, Operator::Eq, vec![value.into()])
    }

    pub fn ne(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::predicate(attribute, Operator::Ne, vec![value.into()])
    }

    pub fn exists(attribute: impl Into<String>) -> Self {
        Self::predicate(attribute, Operator::Exists, Vec::new())
    }

    pub fn not_exists(attribute: impl Into<String>) -> Self {
        Self::predicate(attribute, Operator::DoesNotExist, Vec::new())
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Condition::Always)
    }

    /// Conjunction. Nested conjunctions are flattened so evaluation order is
    /// the order in which conditions were added.
    pub fn and(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::Always, other) => other,
            (this, Condition::Always) => this,
            (Condition::And(mut left), Condition::And(right)) => {
                left.extend(right);
                Condition::And(left)
            }
            (Condition::And(mut left), other) => {
                left.push(other);
                Condition::And(left)
            }
            (this, Condition::And(right)) => {
                let mut all = Vec::with_capacity(right.len() + 1);
                all.push(this);
                all.extend(right);
                Condition::And(all)
            }
            (this, other) => Condition::And(vec![this, other]),
        }
    }

    /// Convert `Always` into `None` for store calls that take an optional
    /// condition.
    pub fn into_option(self) -> Option<Condition> {
        if self.is_always() {
            None
        } else {
            Some(self)
        }
    }

    pub fn evaluate(&self, item: &Item) -> bool {
        match self {
            Condition::Always => true,
            Condition::And(all) => all.iter().all(|c| c.evaluate(item)),
            Condition::Predicate {
                attribute,
                operator,
                operands,
            } => {
                let actual = item.get(attribute).unwrap_or(&AttributeValue::Null);
                evaluate_predicate(actual, *operator, operands)
            }
        }
    }
}

fn evaluate_predicate(actual: &AttributeValue, operator: Operator, operands: &[AttributeValue]) -> bool {
    let first = operands.first();
    let compare = |expected: Option<&AttributeValue>, accept: &[Ordering]| {
        expected
            .and_then(|e| actual.partial_cmp(e))
            .is_some_and(|ord| accept.contains(&ord))
    };

    match operator {
        Operator::Exists => !actual.is_absent(),
        Operator::DoesNotExist => actual.is_absent(),
        Operator::Eq => first.is_some_and(|e| actual == e),
        Operator::Ne => first.is_some_and(|e| actual != e),
        Operator::Lt => compare(first, &[Ordering::Less]),
        Operator::Le => compare(first, &[Ordering::Less, Ordering::Equal]),
        Operator::Gt => compare(first, &[Ordering::Greater]),
        Operator::Ge => compare(first, &[Ordering::Greater, Ordering::Equal]),
        Operator::Between => {
            compare(operands.first(), &[Ordering::Greater, Ordering::Equal])
                && compare(operands.get(1), &[Ordering::Less, Ordering::Equal])
        }
        Operator::IsIn => operands.iter().any(|e| actual == e),
        Operator::StartsWith => match (actual.as_str(), first.and_then(AttributeValue::as_str)) {
            (Some(value), Some(prefix)) => value.starts_with(prefix),
            _ => false,
        },
        Operator::Contains => match (actual, first) {
            (AttributeValue::Tags(tags), Some(AttributeValue::String(tag))) => tags.contains(tag),
            (AttributeValue::String(value), Some(AttributeValue::String(needle))) => {
                value.contains(needle.as_str())
            }
            _ => false,
        },
    }
}

fn quoted(value: &AttributeValue) -> String {
    match value {
        AttributeValue::String(s) => format!("{:?}", s),
        other => other.to_string(),
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => f.write_str("TRUE"),
            Condition::And(all) => {
                let parts: Vec<String> = all.iter().map(|c| format!("({})", c)).collect();
                f.write_str(&parts.join(" AND "))
            }
            Condition::Predicate {
                attribute,
                operator,
                operands,
            } => {
                let arg = |i: usize| operands.get(i).map(quoted).unwrap_or_default();
                match operator {
                    Operator::Eq => write!(f, "{} = {}", attribute, arg(0)),
                    Operator::Ne => write!(f, "{} <> {}", attribute, arg(0)),
                    Operator::Lt => write!(f, "{} < {}", attribute, arg(0)),
                    Operator::Le => write!(f, "{} <= {}", attribute, arg(0)),
                    Operator::Gt => write!(f, "{} > {}", attribute, arg(0)),
                    Operator::Ge => write!(f, "{} >= {}", attribute, arg(0)),
                    Operator::Between => {
                        write!(f, "{} BETWEEN {} AND {}", attribute, arg(0), arg(1))
                    }
                    Operator::IsIn => {
                        let values: Vec<String> = operands.iter().map(quoted).collect();
                        write!(f, "{} IN ({})", attribute, values.join(", "))
                    }
                    Operator::StartsWith => write!(f, "begins_with({}, {})", attribute, arg(0)),
                    Operator::Contains => write!(f, "contains({}, {})", attribute, arg(0)),
                    Operator::Exists => write!(f, "attribute_exists({})", attribute),
                    Operator::DoesNotExist => write!(f, "attribute_not_exists({})", attribute),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TABLE_STATE;
    use serde_json::json;

    fn schema() -> ModelSchema {
        ModelSchema::new("accounts", "account_id", "range_id")
            .with_field("kind", FieldDescriptor::string())
            .with_field("labels", FieldDescriptor::tags())
            .with_field("score", FieldDescriptor::number())
            .with_field("created_at", FieldDescriptor::epoch())
    }

    fn item() -> Item {
        Item::new()
            .with("account_id", "K1")
            .with("range_id", "K2")
            .with(TABLE_STATE, "new")
            .with("kind", "abcd")
            .with("labels", vec!["red".to_string(), "blue".to_string()])
            .with("score", 7.0)
            .with("created_at", AttributeValue::Epoch(1576421280000000))
    }

    #[test]
    fn test_empty_filter_list_is_always_true() {
        let condition = build_conditionals(&schema(), &[]).unwrap();
        assert_eq!(condition, Condition::Always);
        assert!(condition.evaluate(&Item::new()));
    }

    #[test]
    fn test_filters_are_anded_in_order() {
        let condition = build_conditionals(
            &schema(),
            &[
                FilterModel::eq("kind", "abcd"),
                FilterModel::contains("labels", "red"),
                FilterModel::ne(TABLE_STATE, "deleted"),
            ],
        )
        .unwrap();

        match &condition {
            Condition::And(parts) => {
                let names: Vec<&str> = parts
                    .iter()
                    .filter_map(|p| match p {
                        Condition::Predicate { attribute, .. } => Some(attribute.as_str()),
                        _ => None,
                    })
                    .collect();
                assert_eq!(names, vec!["kind", "labels", TABLE_STATE]);
            }
            other => panic!("expected conjunction, got {other:?}"),
        }
        assert!(condition.evaluate(&item()));
    }

    #[test]
    fn test_unknown_attribute() {
        let err = build_conditionals(&schema(), &[FilterModel::eq("colour", "red")]).unwrap_err();
        assert_eq!(err.to_string(), "Model has no property named \"colour\"");
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_unsupported_operator() {
        let err = FilterModel::startswith("labels", "r")
            .to_condition(&schema())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Attribute labels does not support the operator \"startswith\""
        );
    }

    #[test]
    fn test_operand_shapes() {
        let schema = schema();
        assert!(FilterModel::new("score", "between", json!([1]))
            .to_condition(&schema)
            .is_err());
        assert!(FilterModel::new("kind", "is_in", json!([]))
            .to_condition(&schema)
            .is_err());
        assert!(FilterModel::new("kind", "exists", json!("x"))
            .to_condition(&schema)
            .is_err());
        assert!(FilterModel::new("kind", "eq", Value::Null)
            .to_condition(&schema)
            .is_err());
        assert!(FilterModel::new("score", "eq", json!("seven"))
            .to_condition(&schema)
            .is_err());

        let scalar_in = FilterModel::new("kind", "is_in", json!("abcd"))
            .to_condition(&schema)
            .unwrap();
        assert!(scalar_in.evaluate(&item()));
    }

    #[test]
    fn test_epoch_operands_accept_datetime_strings() {
        let condition = FilterModel::new(
            "created_at",
            "between",
            json!(["2019-12-15T00:00:00Z", "2019-12-16T00:00:00Z"]),
        )
        .to_condition(&schema())
        .unwrap();
        assert!(condition.evaluate(&item()));
    }

    #[test]
    fn test_evaluation_semantics() {
        let item = item();
        let schema = schema();
        let check = |filter: FilterModel| filter.to_condition(&schema).unwrap().evaluate(&item);

        assert!(check(FilterModel::between("score", 7, 9)));
        assert!(!check(FilterModel::between("score", 8, 9)));
        assert!(check(FilterModel::startswith("kind", "ab")));
        assert!(check(FilterModel::contains("kind", "bc")));
        assert!(!check(FilterModel::contains("labels", "green")));
        assert!(check(FilterModel::is_in("kind", ["x", "abcd"])));
        assert!(check(FilterModel::new("score", "gt", json!(6))));
        assert!(!check(FilterModel::new("score", "lt", json!(7))));
        assert!(check(FilterModel::new("score", "le", json!(7))));
        assert!(check(FilterModel::exists("labels")));
        assert!(!check(FilterModel::does_not_exist("kind")));
    }

    #[test]
    fn test_missing_attribute_semantics() {
        let empty = Item::new();
        assert!(Condition::ne("kind", "abcd").evaluate(&empty));
        assert!(!Condition::eq("kind", "abcd").evaluate(&empty));
        assert!(Condition::not_exists("kind").evaluate(&empty));
    }

    #[test]
    fn test_display() {
        let condition = Condition::ne(TABLE_STATE, "deleted").and(Condition::not_exists("version"));
        assert_eq!(
            condition.to_string(),
            "(table_state <> \"deleted\") AND (attribute_not_exists(version))"
        );
        assert_eq!(Condition::Always.to_string(), "TRUE");
    }

    #[test]
    fn test_and_flattens() {
        let a = Condition::exists("a");
        let b = Condition::exists("b");
        let c = Condition::exists("c");
        let combined = a.clone().and(b.clone()).and(Condition::Always).and(c.clone());
        assert_eq!(combined, Condition::And(vec![a, b, c]));
    }
}
