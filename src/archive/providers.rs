//! Per-type conversion between attribute values and archive JSON.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde_json::{Number, Value};

use crate::attribute::{AttributeValue, BlobData, ObjectValue, StringList, type_names};
use crate::errors::GraphError;
use crate::graph::{ElementId, ElementKind};

use super::blobs::{BlobReader, BlobWriter};
use super::cache::ObjectCache;

/// Converts one attribute type to and from its archive representation.
pub trait SerializationProvider: Send + Sync {
    fn type_name(&self) -> &str;

    /// Encode `value` for the element described by `ctx`. Large payloads
    /// may go to a blob, leaving a reference string in the JSON.
    fn write_value(
        &self,
        value: &AttributeValue,
        ctx: &mut WriteContext<'_>,
    ) -> Result<Value, GraphError>;

    /// Decode a JSON node. Errors abort the whole read.
    fn read_value(&self, node: &Value, ctx: &mut ReadContext<'_>) -> Result<AttributeValue, GraphError>;
}

pub struct WriteContext<'a> {
    kind: ElementKind,
    element: Option<ElementId>,
    attribute: &'a str,
    blobs: &'a mut BlobWriter,
}

impl<'a> WriteContext<'a> {
    pub(crate) fn new(
        kind: ElementKind,
        element: Option<ElementId>,
        attribute: &'a str,
        blobs: &'a mut BlobWriter,
    ) -> Self {
        Self {
            kind,
            element,
            attribute,
            blobs,
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// `None` while encoding an attribute default.
    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    pub fn attribute(&self) -> &str {
        self.attribute
    }

    /// Emit a named binary entry and return its reference.
    pub fn write_blob(&mut self, bytes: Vec<u8>) -> String {
        let hint = match self.element {
            Some(id) => format!("{}-{}-{id}", self.kind, self.attribute),
            None => format!("{}-{}-default", self.kind, self.attribute),
        };
        self.blobs.add(&hint, bytes)
    }
}

/// File id → in-memory id, per element kind.
#[derive(Debug, Default)]
pub struct IdRemap {
    vertices: AHashMap<u64, ElementId>,
    transactions: AHashMap<u64, ElementId>,
}

impl IdRemap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mapping; false if `file_id` was already mapped.
    pub fn insert(&mut self, kind: ElementKind, file_id: u64, id: ElementId) -> bool {
        match kind {
            ElementKind::Vertex => self.vertices.insert(file_id, id).is_none(),
            ElementKind::Transaction => self.transactions.insert(file_id, id).is_none(),
            _ => false,
        }
    }

    pub fn get(&self, kind: ElementKind, file_id: u64) -> Option<ElementId> {
        match kind {
            ElementKind::Vertex => self.vertices.get(&file_id).copied(),
            ElementKind::Transaction => self.transactions.get(&file_id).copied(),
            _ => None,
        }
    }

    pub fn len(&self, kind: ElementKind) -> usize {
        match kind {
            ElementKind::Vertex => self.vertices.len(),
            ElementKind::Transaction => self.transactions.len(),
            _ => 0,
        }
    }
}

pub struct ReadContext<'a> {
    remap: &'a IdRemap,
    blobs: &'a BlobReader,
    cache: &'a ObjectCache,
}

impl<'a> ReadContext<'a> {
    pub(crate) fn new(remap: &'a IdRemap, blobs: &'a BlobReader, cache: &'a ObjectCache) -> Self {
        Self {
            remap,
            blobs,
            cache,
        }
    }

    /// Translate an element id as written in the file.
    pub fn remap(&self, kind: ElementKind, file_id: u64) -> Result<ElementId, GraphError> {
        self.remap
            .get(kind, file_id)
            .ok_or_else(|| GraphError::corrupt_archive(format!("unknown {kind} id {file_id}")))
    }

    pub fn blob(&self, name: &str) -> Result<&[u8], GraphError> {
        self.blobs.get(name)
    }

    /// Share one instance per distinct object value read.
    pub fn intern(&self, value: ObjectValue) -> ObjectValue {
        self.cache.intern(value)
    }
}

fn mismatch(type_name: &str, node: &Value) -> GraphError {
    GraphError::corrupt_archive(format!("expected {type_name} value, found {node}"))
}

/// Booleans and numbers, written as native JSON scalars.
pub struct PrimitiveProvider {
    type_name: &'static str,
}

impl PrimitiveProvider {
    pub fn new(type_name: &'static str) -> Self {
        Self { type_name }
    }
}

fn float_json(value: f64) -> Value {
    // non-finite floats have no JSON number form
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

impl SerializationProvider for PrimitiveProvider {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn write_value(&self, value: &AttributeValue, _ctx: &mut WriteContext<'_>) -> Result<Value, GraphError> {
        Ok(match value {
            AttributeValue::Null => Value::Null,
            AttributeValue::Boolean(b) => Value::Bool(*b),
            AttributeValue::Integer(v) => Value::from(*v),
            AttributeValue::Long(v) => Value::from(*v),
            AttributeValue::Float(v) => float_json(f64::from(*v)),
            AttributeValue::Double(v) => float_json(*v),
            other => {
                return Err(GraphError::invalid_value(format!(
                    "{} provider cannot write {} value",
                    self.type_name,
                    other.kind_name()
                )));
            }
        })
    }

    fn read_value(&self, node: &Value, _ctx: &mut ReadContext<'_>) -> Result<AttributeValue, GraphError> {
        match node {
            Value::Null => Ok(AttributeValue::Null),
            Value::Bool(b) => Ok(AttributeValue::Boolean(*b)),
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Ok(AttributeValue::Long(v))
                } else if let Some(v) = n.as_f64() {
                    Ok(AttributeValue::Double(v))
                } else {
                    Err(mismatch(self.type_name, node))
                }
            }
            Value::String(s) => Ok(AttributeValue::Text(s.clone())),
            _ => Err(mismatch(self.type_name, node)),
        }
    }
}

pub struct StringProvider;

impl SerializationProvider for StringProvider {
    fn type_name(&self) -> &str {
        type_names::STRING
    }

    fn write_value(&self, value: &AttributeValue, _ctx: &mut WriteContext<'_>) -> Result<Value, GraphError> {
        match value {
            AttributeValue::Null => Ok(Value::Null),
            AttributeValue::Text(s) => Ok(Value::String(s.clone())),
            other => Ok(Value::String(other.to_string())),
        }
    }

    fn read_value(&self, node: &Value, _ctx: &mut ReadContext<'_>) -> Result<AttributeValue, GraphError> {
        match node {
            Value::Null => Ok(AttributeValue::Null),
            Value::String(s) => Ok(AttributeValue::Text(s.clone())),
            _ => Err(mismatch(type_names::STRING, node)),
        }
    }
}

/// RFC 3339 strings in UTC.
pub struct DateTimeProvider;

impl SerializationProvider for DateTimeProvider {
    fn type_name(&self) -> &str {
        type_names::DATETIME
    }

    fn write_value(&self, value: &AttributeValue, _ctx: &mut WriteContext<'_>) -> Result<Value, GraphError> {
        match value {
            AttributeValue::Null => Ok(Value::Null),
            AttributeValue::DateTime(dt) => Ok(Value::String(dt.to_rfc3339())),
            other => Err(GraphError::invalid_value(format!(
                "datetime provider cannot write {} value",
                other.kind_name()
            ))),
        }
    }

    fn read_value(&self, node: &Value, _ctx: &mut ReadContext<'_>) -> Result<AttributeValue, GraphError> {
        match node {
            Value::Null => Ok(AttributeValue::Null),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| AttributeValue::DateTime(dt.with_timezone(&Utc)))
                .map_err(|e| GraphError::corrupt_archive(format!("bad datetime '{s}': {e}"))),
            _ => Err(mismatch(type_names::DATETIME, node)),
        }
    }
}

/// Raw bytes stored as a separate entry; the JSON holds the entry name.
pub struct BlobProvider;

impl SerializationProvider for BlobProvider {
    fn type_name(&self) -> &str {
        type_names::BLOB
    }

    fn write_value(&self, value: &AttributeValue, ctx: &mut WriteContext<'_>) -> Result<Value, GraphError> {
        match value {
            AttributeValue::Null => Ok(Value::Null),
            AttributeValue::Object(object) => {
                let blob = object.downcast_ref::<BlobData>().ok_or_else(|| {
                    GraphError::invalid_value("blob provider expects BlobData objects")
                })?;
                Ok(Value::String(ctx.write_blob(blob.0.clone())))
            }
            other => Err(GraphError::invalid_value(format!(
                "blob provider cannot write {} value",
                other.kind_name()
            ))),
        }
    }

    fn read_value(&self, node: &Value, ctx: &mut ReadContext<'_>) -> Result<AttributeValue, GraphError> {
        match node {
            Value::Null => Ok(AttributeValue::Null),
            Value::String(name) => {
                let bytes = ctx.blob(name)?.to_vec();
                Ok(AttributeValue::Object(ctx.intern(ObjectValue::new(BlobData(bytes)))))
            }
            _ => Err(mismatch(type_names::BLOB, node)),
        }
    }
}

/// JSON array of strings.
pub struct StringListProvider;

impl SerializationProvider for StringListProvider {
    fn type_name(&self) -> &str {
        type_names::STRING_LIST
    }

    fn write_value(&self, value: &AttributeValue, _ctx: &mut WriteContext<'_>) -> Result<Value, GraphError> {
        match value {
            AttributeValue::Null => Ok(Value::Null),
            AttributeValue::Object(object) => {
                let list = object.downcast_ref::<StringList>().ok_or_else(|| {
                    GraphError::invalid_value("string_list provider expects StringList objects")
                })?;
                Ok(Value::Array(
                    list.0.iter().cloned().map(Value::String).collect(),
                ))
            }
            other => Err(GraphError::invalid_value(format!(
                "string_list provider cannot write {} value",
                other.kind_name()
            ))),
        }
    }

    fn read_value(&self, node: &Value, ctx: &mut ReadContext<'_>) -> Result<AttributeValue, GraphError> {
        match node {
            Value::Null => Ok(AttributeValue::Null),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => list.push(s.clone()),
                        _ => return Err(mismatch(type_names::STRING_LIST, node)),
                    }
                }
                Ok(AttributeValue::Object(ctx.intern(ObjectValue::new(StringList(list)))))
            }
            _ => Err(mismatch(type_names::STRING_LIST, node)),
        }
    }
}
