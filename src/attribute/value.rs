//! Runtime value representation shared by every attribute column.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, TimeZone, Utc};

use super::object::ObjectValue;

/// Storage class of an attribute column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    Text,
    DateTime,
    Object,
}

impl NativeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeType::Boolean => "boolean",
            NativeType::Integer => "integer",
            NativeType::Long => "long",
            NativeType::Float => "float",
            NativeType::Double => "double",
            NativeType::Text => "text",
            NativeType::DateTime => "datetime",
            NativeType::Object => "object",
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute value as it crosses the column boundary.
///
/// `Null` is accepted by every column and means "reset this slot to the
/// column default".
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    Object(ObjectValue),
}

impl AttributeValue {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Boolean(_) => "boolean",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Long(_) => "long",
            AttributeValue::Float(_) => "float",
            AttributeValue::Double(_) => "double",
            AttributeValue::Text(_) => "text",
            AttributeValue::DateTime(_) => "datetime",
            AttributeValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(v) => Some(i64::from(*v)),
            AttributeValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(v) => Some(f64::from(*v)),
            AttributeValue::Long(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(f64::from(*v)),
            AttributeValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            AttributeValue::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => f.write_str("null"),
            AttributeValue::Boolean(v) => write!(f, "{v}"),
            AttributeValue::Integer(v) => write!(f, "{v}"),
            AttributeValue::Long(v) => write!(f, "{v}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Double(v) => write!(f, "{v}"),
            AttributeValue::Text(v) => f.write_str(v),
            AttributeValue::DateTime(v) => f.write_str(&v.to_rfc3339()),
            AttributeValue::Object(v) => write!(f, "{v:?}"),
        }
    }
}

/// Hashable wrapper used for key tuples and value indexes.
///
/// Floats compare by bit pattern, so `NaN` matches itself and `-0.0` is
/// distinct from `0.0`. That is the same identity the columns use when
/// deciding whether a slot still holds its default.
#[derive(Clone, Debug)]
pub struct ValueKey(pub AttributeValue);

impl ValueKey {
    pub fn new(value: AttributeValue) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &AttributeValue {
        &self.0
    }

    pub fn into_inner(self) -> AttributeValue {
        self.0
    }

    /// Whether `value` is the same value this key wraps.
    pub fn matches(&self, value: &AttributeValue) -> bool {
        same_value(&self.0, value)
    }
}

fn same_value(a: &AttributeValue, b: &AttributeValue) -> bool {
    match (a, b) {
        (AttributeValue::Float(x), AttributeValue::Float(y)) => x.to_bits() == y.to_bits(),
        (AttributeValue::Double(x), AttributeValue::Double(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        same_value(&self.0, &other.0)
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&self.0).hash(state);
        match &self.0 {
            AttributeValue::Null => {}
            AttributeValue::Boolean(v) => v.hash(state),
            AttributeValue::Integer(v) => v.hash(state),
            AttributeValue::Long(v) => v.hash(state),
            AttributeValue::Float(v) => v.to_bits().hash(state),
            AttributeValue::Double(v) => v.to_bits().hash(state),
            AttributeValue::Text(v) => v.hash(state),
            AttributeValue::DateTime(v) => v.hash(state),
            AttributeValue::Object(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Long(value)
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::DateTime(value)
    }
}

impl From<ObjectValue> for AttributeValue {
    fn from(value: ObjectValue) -> Self {
        AttributeValue::Object(value)
    }
}

impl<T> From<Option<T>> for AttributeValue
where
    T: Into<AttributeValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

/// Interpret epoch milliseconds as a UTC timestamp.
pub(crate) fn datetime_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
