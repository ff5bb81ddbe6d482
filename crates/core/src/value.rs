//! Value type definitions for Bitstore.
//!
//! `Value` is the closed set of things a cell can hold. Fixed-arity records
//! come in two forms: the generic `Tuple` (what persistence produces) and the
//! named `Record`, which carries its `RecordType`. The two compare equal when
//! their elements are equal.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// A named, fixed-arity record type.
///
/// Used both as a column kind and as the row factory of a tuple store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RecordType {
    name: String,
    fields: Vec<String>,
}

impl RecordType {
    /// Creates a record type from a name and its field names.
    pub fn new<S: Into<String>>(name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the type name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field names in declaration order.
    #[inline]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the number of fields.
    #[inline]
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Returns the position of a field.
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }
}

/// An immutable record: a `RecordType` plus one value per field.
#[derive(Clone, Debug)]
pub struct Record {
    ty: Arc<RecordType>,
    values: Vec<Value>,
}

impl Record {
    /// Creates a record. Returns `None` when the arity does not match.
    pub fn new(ty: Arc<RecordType>, values: Vec<Value>) -> Option<Self> {
        if values.len() != ty.arity() {
            return None;
        }
        Some(Self { ty, values })
    }

    /// Returns the record type.
    #[inline]
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    /// Returns the type name.
    #[inline]
    pub fn name(&self) -> &str {
        self.ty.name()
    }

    /// Returns the values in field order.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the record, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Gets a value by field name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.ty.position(field).map(|i| &self.values[i])
    }

    /// Gets a value by position.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true for a zero-field record.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.ty
            .fields()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name() == other.ty.name() && self.values == other.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.ty.name())?;
        for (i, (field, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", field, value)?;
        }
        f.write_str(")")
    }
}

/// A value that can be stored in a cell.
#[derive(Clone, Debug)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Generic fixed-arity record, as decoded from a snapshot
    Tuple(Vec<Value>),
    /// Named fixed-arity record
    Record(Record),
}

impl Value {
    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value may be used as an index key.
    ///
    /// Strings, integers, null, and records whose elements are all indexable.
    pub fn is_indexable(&self) -> bool {
        match self {
            Value::Null | Value::Integer(_) | Value::String(_) => true,
            Value::Tuple(values) => values.iter().all(Value::is_indexable),
            Value::Record(record) => record.values().iter().all(Value::is_indexable),
            Value::Boolean(_) | Value::Float(_) => false,
        }
    }

    /// Returns the kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::Record(_) => "record",
        }
    }

    /// Returns the boolean value if this is a Boolean, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i64 value if this is an Integer, None otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the f64 value if this is a Float, None otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the elements of a Tuple or Record.
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(values) => Some(values),
            Value::Record(record) => Some(record.values()),
            _ => None,
        }
    }

    /// Returns the record if this is a Record.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Drops the record type, leaving the generic tuple form.
    pub fn into_generic(self) -> Value {
        match self {
            Value::Record(record) => Value::Tuple(
                record.into_values().into_iter().map(Value::into_generic).collect(),
            ),
            Value::Tuple(values) => Value::Tuple(values.into_iter().map(Value::into_generic).collect()),
            other => other,
        }
    }

    fn type_order(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Float(_) => 3,
            Value::String(_) => 4,
            Value::Tuple(_) | Value::Record(_) => 5,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                // NaN equals itself so it can be found again
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            _ => match (self.as_elements(), other.as_elements()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_order().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => {
                // 0.0 == -0.0, and every NaN equals every other
                let f = if f.is_nan() {
                    f64::NAN
                } else if *f == 0.0 {
                    0.0
                } else {
                    *f
                };
                f.to_bits().hash(state)
            }
            Value::String(s) => s.hash(state),
            Value::Tuple(values) => values.hash(state),
            Value::Record(record) => record.values().hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => match (self.as_elements(), other.as_elements()) {
                (Some(a), Some(b)) => a.cmp(b),
                _ => self.type_order().cmp(&other.type_order()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Tuple(values) => {
                f.write_str("(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str(")")
            }
            Value::Record(record) => write!(f, "{}", record),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Tuple(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

const NAN_TAG: &str = "NaN";
const INFINITY_TAG: &str = "Infinity";
const NEG_INFINITY_TAG: &str = "-Infinity";

// JSON has no literal for these
fn non_finite_tag(x: f64) -> Option<&'static str> {
    if x.is_nan() {
        Some(NAN_TAG)
    } else if x == f64::INFINITY {
        Some(INFINITY_TAG)
    } else if x == f64::NEG_INFINITY {
        Some(NEG_INFINITY_TAG)
    } else {
        None
    }
}

impl Value {
    /// Turns the text tag a non-finite float is saved as back into the float.
    ///
    /// Any other value is returned unchanged. Only meaningful for cells of a
    /// float column, where a string cannot otherwise occur.
    pub fn restore_float(self) -> Value {
        match &self {
            Value::String(s) => match s.as_str() {
                NAN_TAG => Value::Float(f64::NAN),
                INFINITY_TAG => Value::Float(f64::INFINITY),
                NEG_INFINITY_TAG => Value::Float(f64::NEG_INFINITY),
                _ => self,
            },
            _ => self,
        }
    }
}

// Snapshots are plain JSON-like data: records become arrays, non-finite
// floats become text tags.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(x) => match non_finite_tag(*x) {
                Some(tag) => serializer.serialize_str(tag),
                None => serializer.serialize_f64(*x),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Tuple(_) | Value::Record(_) => {
                let values = self.as_elements().unwrap_or(&[]);
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a boolean, a number, a string or an array")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::Integer)
            .map_err(|_| E::custom("integer out of range for a 64-bit signed value"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(value) = seq.next_element()? {
            values.push(value);
        }
        Ok(Value::Tuple(values))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
