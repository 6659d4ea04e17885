//! Opaque object values and the column that stores them.
//!
//! An object column holds shared, immutable values of one concrete Rust
//! type. Equality and hashing come from the concrete type, which lets the
//! archive reader deduplicate identical values across elements.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::GraphError;
use crate::graph::ElementId;

use super::{AttributeColumn, AttributeValue, ColumnFactory, NativeType};

/// Behaviour every object stored in an object column must provide.
///
/// Implemented automatically for any `Debug + Eq + Hash + Send + Sync`
/// type, so callers only pick a concrete type.
pub trait GraphObject: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn GraphObject) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<T> GraphObject for T
where
    T: Any + fmt::Debug + Eq + Hash + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn GraphObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// Shared handle to an immutable object value.
#[derive(Clone, Debug)]
pub struct ObjectValue(Arc<dyn GraphObject>);

impl ObjectValue {
    pub fn new<T: GraphObject>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    /// True when both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &ObjectValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn type_id_of_inner(&self) -> TypeId {
        self.0.as_any().type_id()
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(other.0.as_ref())
    }
}

impl Eq for ObjectValue {}

impl Hash for ObjectValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.dyn_hash(state);
    }
}

/// Raw bytes, persisted as a separate archive entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlobData(pub Vec<u8>);

/// Immutable list of strings (e.g. a set of type labels).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StringList(pub Vec<String>);

impl StringList {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(items.into_iter().map(Into::into).collect())
    }
}

/// Column of shared object references of one concrete type.
#[derive(Clone)]
pub struct ObjectColumn {
    type_name: String,
    accepts: TypeId,
    accepts_name: &'static str,
    slots: Vec<Option<ObjectValue>>,
    default: Option<ObjectValue>,
}

impl fmt::Debug for ObjectColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectColumn")
            .field("type_name", &self.type_name)
            .field("accepts", &self.accepts_name)
            .field("capacity", &self.slots.len())
            .finish()
    }
}

impl ObjectColumn {
    fn convert(&self, value: AttributeValue) -> Result<Option<ObjectValue>, GraphError> {
        match value {
            AttributeValue::Null => Ok(None),
            AttributeValue::Object(obj) if obj.type_id_of_inner() == self.accepts => Ok(Some(obj)),
            other => Err(GraphError::invalid_value(format!(
                "{} column expects {} objects, got {}",
                self.type_name,
                self.accepts_name,
                other.kind_name()
            ))),
        }
    }
}

impl AttributeColumn for ObjectColumn {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn native_type(&self) -> NativeType {
        NativeType::Object
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.slots.len() {
            self.slots.resize(capacity, None);
        }
    }

    fn get(&self, id: ElementId) -> AttributeValue {
        match self.slots.get(id) {
            Some(Some(obj)) => AttributeValue::Object(obj.clone()),
            _ => self.default_value(),
        }
    }

    fn set(&mut self, id: ElementId, value: AttributeValue) -> Result<(), GraphError> {
        match self.convert(value)? {
            Some(obj) => {
                self.ensure_capacity(id + 1);
                self.slots[id] = Some(obj);
            }
            None => self.clear(id),
        }
        Ok(())
    }

    fn is_default(&self, id: ElementId) -> bool {
        match self.slots.get(id) {
            Some(Some(obj)) => self.default.as_ref() == Some(obj),
            _ => true,
        }
    }

    fn is_set(&self, id: ElementId) -> bool {
        matches!(self.slots.get(id), Some(Some(_)))
    }

    fn clear(&mut self, id: ElementId) {
        if let Some(slot) = self.slots.get_mut(id) {
            *slot = None;
        }
    }

    fn default_value(&self) -> AttributeValue {
        self.default
            .clone()
            .map(AttributeValue::Object)
            .unwrap_or(AttributeValue::Null)
    }

    fn set_default_value(&mut self, value: AttributeValue) -> Result<(), GraphError> {
        self.default = self.convert(value)?;
        Ok(())
    }

    fn normalise(&self, value: AttributeValue) -> Result<AttributeValue, GraphError> {
        Ok(self
            .convert(value)?
            .or_else(|| self.default.clone())
            .map_or(AttributeValue::Null, AttributeValue::Object))
    }

    fn copy(&self) -> Box<dyn AttributeColumn> {
        Box::new(self.clone())
    }

    fn copy_from(&mut self, source: &dyn AttributeColumn) -> bool {
        let Some(source) = source.as_any().downcast_ref::<Self>() else {
            return false;
        };
        self.type_name.clone_from(&source.type_name);
        self.accepts = source.accepts;
        self.accepts_name = source.accepts_name;
        self.slots.clone_from(&source.slots);
        self.default.clone_from(&source.default);
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builds [`ObjectColumn`]s accepting values of type `T`.
pub struct ObjectColumnFactory<T> {
    type_name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ObjectColumnFactory<T> {
    pub fn new<S: Into<String>>(type_name: S) -> Self {
        Self {
            type_name: type_name.into(),
            _marker: PhantomData,
        }
    }
}

impl<T: GraphObject> ColumnFactory for ObjectColumnFactory<T> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn native_type(&self) -> NativeType {
        NativeType::Object
    }

    fn create(&self, default: AttributeValue) -> Result<Box<dyn AttributeColumn>, GraphError> {
        let mut column = ObjectColumn {
            type_name: self.type_name.clone(),
            accepts: TypeId::of::<T>(),
            accepts_name: std::any::type_name::<T>(),
            slots: Vec::new(),
            default: None,
        };
        column.set_default_value(default)?;
        Ok(Box::new(column))
    }
}
