//! Column definition for Bitstore schema.

use crate::kind::ValueKind;
use crate::value::Value;
use alloc::string::String;
use serde::{Deserialize, Serialize};

/// Where a missing trailing cell gets its value from.
#[derive(Clone, Debug)]
pub enum ColumnDefault {
    /// A fixed value, cloned on every use.
    Value(Value),
    /// A producer called once per filled cell, e.g. a timestamp source.
    Producer(fn() -> Value),
}

impl ColumnDefault {
    /// Produces the value for one missing cell.
    #[inline]
    pub fn resolve(&self) -> Value {
        match self {
            ColumnDefault::Value(v) => v.clone(),
            ColumnDefault::Producer(f) => f(),
        }
    }
}

impl From<Value> for ColumnDefault {
    fn from(value: Value) -> Self {
        ColumnDefault::Value(value)
    }
}

/// A column definition in a table schema.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    name: String,
    /// Kind of value the column accepts.
    kind: ValueKind,
    /// Default value for this column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    /// Value producer; takes precedence over `default`.
    #[serde(skip)]
    producer: Option<fn() -> Value>,
}

impl ColumnDef {
    /// Creates a new column definition without a default.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            producer: None,
        }
    }

    /// Sets the default value for this column.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets a producer evaluated every time this column needs a default.
    pub fn default_producer(mut self, producer: fn() -> Value) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value kind.
    #[inline]
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Returns the static default, if any.
    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns whether a missing cell of this column can be filled.
    #[inline]
    pub fn has_default(&self) -> bool {
        self.producer.is_some() || self.default.is_some()
    }

    /// Returns the default source for this column.
    pub fn default_source(&self) -> Option<ColumnDefault> {
        match (self.producer, &self.default) {
            (Some(f), _) => Some(ColumnDefault::Producer(f)),
            (None, Some(v)) => Some(ColumnDefault::Value(v.clone())),
            (None, None) => None,
        }
    }
}

impl PartialEq for ColumnDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.default == other.default
            && self.producer.is_some() == other.producer.is_some()
    }
}
