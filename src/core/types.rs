use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

/// Property name → value, as held by a record and exchanged with backends.
pub type PropertyMap = BTreeMap<String, Value>;

/// Identity assigned to a persisted record by its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Optional attributes attached to a declared property.
///
/// Informational only: they are kept in the schema for callers and backends
/// to inspect, but reads, writes and inserts ignore them. A `default` is not
/// substituted for an unset property, which still reads as `Value::Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyAttributes {
    pub nullable: bool,
    pub default: Option<Value>,
}

impl PropertyAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A single property declaration.
///
/// A bare name and a name with attributes declare the same property; the
/// bare form simply carries empty attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub attributes: PropertyAttributes,
}

impl PropertyDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: PropertyAttributes::default(),
        }
    }

    pub fn with_attributes(name: impl Into<String>, attributes: PropertyAttributes) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }
}

impl From<&str> for PropertyDecl {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PropertyDecl {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl<N: Into<String>> From<(N, PropertyAttributes)> for PropertyDecl {
    fn from((name, attributes): (N, PropertyAttributes)) -> Self {
        Self::with_attributes(name, attributes)
    }
}

/// Ordered set of properties known for an entity type.
#[derive(Debug, Clone, Default)]
pub struct PropertySchema {
    properties: Vec<PropertyDecl>,
}

impl PropertySchema {
    /// Builds a schema, keeping the first declaration of a repeated name.
    pub fn new(declarations: impl IntoIterator<Item = PropertyDecl>) -> Self {
        let mut properties: Vec<PropertyDecl> = Vec::new();
        for decl in declarations {
            if !properties.iter().any(|known| known.name == decl.name) {
                properties.push(decl);
            }
        }
        Self { properties }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(PropertyDecl::new))
    }

    pub fn properties(&self) -> &[PropertyDecl] {
        &self.properties
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
