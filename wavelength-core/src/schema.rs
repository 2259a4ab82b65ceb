//! Field descriptor table.
//!
//! A [`ModelSchema`] lists every attribute a model may carry, its type, the
//! filter operators it accepts, and whether ordinary callers may write it.
//! The conditional builder and the change-tracking record both consult it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{DalError, DalResult};
use crate::state::TABLE_STATE;
use crate::value::AttributeType;

/// Comparison and membership operators usable in filters and conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Between,
    StartsWith,
    IsIn,
    Exists,
    DoesNotExist,
    Contains,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::Between,
        Operator::StartsWith,
        Operator::IsIn,
        Operator::Exists,
        Operator::DoesNotExist,
        Operator::Contains,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Between => "between",
            Operator::StartsWith => "startswith",
            Operator::IsIn => "is_in",
            Operator::Exists => "exists",
            Operator::DoesNotExist => "does_not_exist",
            Operator::Contains => "contains",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Operators every attribute of `attribute_type` supports by default.
    pub fn defaults_for(attribute_type: AttributeType) -> BTreeSet<Operator> {
        use Operator::*;
        let ops: &[Operator] = match attribute_type {
            AttributeType::String => &[
                Eq, Ne, Lt, Le, Gt, Ge, Between, StartsWith, IsIn, Exists, DoesNotExist, Contains,
            ],
            AttributeType::Number | AttributeType::Epoch => {
                &[Eq, Ne, Lt, Le, Gt, Ge, Between, IsIn, Exists, DoesNotExist]
            }
            AttributeType::Tags => &[Contains, Exists, DoesNotExist],
        };
        ops.iter().copied().collect()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptor for one attribute of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub attribute_type: AttributeType,
    pub supported_operators: BTreeSet<Operator>,
    /// Protected fields reject ordinary writes.
    pub protected: bool,
}

impl FieldDescriptor {
    pub fn new(attribute_type: AttributeType) -> Self {
        Self {
            attribute_type,
            supported_operators: Operator::defaults_for(attribute_type),
            protected: false,
        }
    }

    pub fn string() -> Self {
        Self::new(AttributeType::String)
    }

    pub fn number() -> Self {
        Self::new(AttributeType::Number)
    }

    pub fn tags() -> Self {
        Self::new(AttributeType::Tags)
    }

    pub fn epoch() -> Self {
        Self::new(AttributeType::Epoch)
    }

    /// Replace the default operator set.
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = Operator>) -> Self {
        self.supported_operators = operators.into_iter().collect();
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn supports(&self, operator: Operator) -> bool {
        self.supported_operators.contains(&operator)
    }
}

/// Schema of one stored model: key layout plus field descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    name: String,
    hash_key: String,
    range_key: String,
    fields: BTreeMap<String, FieldDescriptor>,
    version_attribute: Option<String>,
}

impl ModelSchema {
    /// Create a schema with string hash and range keys and the protected
    /// `table_state` attribute.
    pub fn new(
        name: impl Into<String>,
        hash_key: impl Into<String>,
        range_key: impl Into<String>,
    ) -> Self {
        let hash_key = hash_key.into();
        let range_key = range_key.into();

        let mut fields = BTreeMap::new();
        fields.insert(hash_key.clone(), FieldDescriptor::string());
        fields.insert(range_key.clone(), FieldDescriptor::string());
        fields.insert(
            TABLE_STATE.to_string(),
            FieldDescriptor::string()
                .with_operators([
                    Operator::Eq,
                    Operator::Ne,
                    Operator::IsIn,
                    Operator::Exists,
                    Operator::DoesNotExist,
                ])
                .protected(),
        );

        Self {
            name: name.into(),
            hash_key,
            range_key,
            fields,
            version_attribute: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(name.into(), descriptor);
        self
    }

    /// Track an optimistic-concurrency version number under `name`.
    pub fn with_version_attribute(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.fields.insert(
            name.clone(),
            FieldDescriptor::number()
                .with_operators([Operator::Eq, Operator::Exists, Operator::DoesNotExist])
                .protected(),
        );
        self.version_attribute = Some(name);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    pub fn range_key(&self) -> &str {
        &self.range_key
    }

    pub fn version_attribute(&self) -> Option<&str> {
        self.version_attribute.as_deref()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(name, d)| (name.as_str(), d))
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn is_key_attribute(&self, name: &str) -> bool {
        name == self.hash_key || name == self.range_key
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|d| d.protected)
    }

    /// Look up a field, failing the way filter validation reports it.
    pub fn require_field(&self, name: &str) -> DalResult<&FieldDescriptor> {
        self.fields
            .get(name)
            .ok_or_else(|| DalError::validation(format!("Model has no property named \"{}\"", name)))
    }

    /// Resolve an operator name against a field's supported set.
    pub fn require_operator(
        &self,
        name: &str,
        operator_name: &str,
    ) -> DalResult<(&FieldDescriptor, Operator)> {
        let descriptor = self.require_field(name)?;
        let operator = Operator::from_name(operator_name)
            .filter(|op| descriptor.supports(*op))
            .ok_or_else(|| {
                DalError::validation(format!(
                    "Attribute {} does not support the operator \"{}\"",
                    name, operator_name
                ))
            })?;
        Ok((descriptor, operator))
    }
}
