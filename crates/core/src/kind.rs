//! Column value kinds for Bitstore.
//!
//! A `ValueKind` describes what a column accepts. `validate_and_coerce` is
//! the single place where a cell is checked against its column.

use crate::error::{Error, Result};
use crate::value::{Record, RecordType, Value};
use alloc::format;
use alloc::sync::Arc;

/// The kind of value a column holds.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// UTF-8 string
    Str,
    /// 64-bit signed integer
    Int,
    /// 64-bit float; integers widen
    Float,
    /// Boolean
    Bool,
    /// Generic fixed-arity record of any arity
    Tuple,
    /// Named fixed-arity record
    Record(Arc<RecordType>),
    /// Anything; no check
    Any,
}

impl ValueKind {
    /// Shorthand for a record kind.
    pub fn record(ty: RecordType) -> Self {
        ValueKind::Record(Arc::new(ty))
    }

    /// Returns whether stored values are record-shaped and need restoring from
    /// their generic form after a snapshot is decoded.
    #[inline]
    pub fn is_tuple_like(&self) -> bool {
        matches!(self, ValueKind::Tuple | ValueKind::Record(_))
    }

    /// Returns the kind name used in error messages.
    pub fn name(&self) -> &str {
        match self {
            ValueKind::Str => "str",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Tuple => "tuple",
            ValueKind::Record(ty) => ty.name(),
            ValueKind::Any => "any",
        }
    }
}

/// Checks `value` against `kind`, returning the value as it should be stored.
///
/// Null is accepted by every kind. Integers widen to floats, a tuple of the
/// right arity becomes a record of a record kind, and a record stored in a
/// tuple column drops its type.
pub fn validate_and_coerce(kind: &ValueKind, value: Value) -> Result<Value> {
    match (kind, value) {
        (_, Value::Null) => Ok(Value::Null),
        (ValueKind::Any, v) => Ok(v),
        (ValueKind::Str, v @ Value::String(_)) => Ok(v),
        (ValueKind::Int, v @ Value::Integer(_)) => Ok(v),
        (ValueKind::Float, v @ Value::Float(_)) => Ok(v),
        (ValueKind::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
        (ValueKind::Bool, v @ Value::Boolean(_)) => Ok(v),
        (ValueKind::Tuple, v @ Value::Tuple(_)) => Ok(v),
        (ValueKind::Tuple, Value::Record(r)) => Ok(Value::Tuple(r.into_values())),
        (ValueKind::Record(ty), Value::Tuple(values)) => {
            let arity = values.len();
            Record::new(ty.clone(), values)
                .map(Value::Record)
                .ok_or_else(|| arity_error(ty, arity))
        }
        (ValueKind::Record(ty), Value::Record(r)) => {
            let arity = r.len();
            Record::new(ty.clone(), r.into_values())
                .map(Value::Record)
                .ok_or_else(|| arity_error(ty, arity))
        }
        (kind, v) => Err(Error::schema(format!(
            "value {} ({}) is not of kind {}",
            v,
            v.kind_name(),
            kind.name()
        ))),
    }
}

fn arity_error(ty: &RecordType, got: usize) -> Error {
    Error::schema(format!(
        "record {} takes {} fields, got {}",
        ty.name(),
        ty.arity(),
        got
    ))
}
