//! Typed attribute columns.
//!
//! A column stores one attribute for every element of one kind, indexed
//! directly by element id. Columns never reference the store that owns
//! them; they only see plain integer ids.

mod object;
mod primitive;
mod text;
mod value;

pub use object::{BlobData, GraphObject, ObjectColumn, ObjectColumnFactory, ObjectValue, StringList};
pub use primitive::{
    BooleanColumn, DoubleColumn, FloatColumn, IntegerColumn, LongColumn, Primitive,
    PrimitiveColumn, PrimitiveColumnFactory,
};
pub use text::{DateTimeColumn, DateTimeColumnFactory, TextColumn, TextColumnFactory};
pub use value::{AttributeValue, NativeType, ValueKey};

use std::any::Any;
use std::fmt;

use crate::errors::GraphError;
use crate::graph::ElementId;

/// Registry names of the built-in attribute types.
pub mod type_names {
    pub const BOOLEAN: &str = "boolean";
    pub const INTEGER: &str = "integer";
    pub const LONG: &str = "long";
    pub const FLOAT: &str = "float";
    pub const DOUBLE: &str = "double";
    pub const STRING: &str = "string";
    pub const DATETIME: &str = "datetime";
    pub const BLOB: &str = "blob";
    pub const STRING_LIST: &str = "string_list";
}

/// Storage for one attribute across all elements of one kind.
///
/// Reads beyond the current capacity return the default; writes grow the
/// column on demand. A failed `set` leaves the slot untouched.
pub trait AttributeColumn: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;
    fn native_type(&self) -> NativeType;
    fn capacity(&self) -> usize;
    fn ensure_capacity(&mut self, capacity: usize);
    fn get(&self, id: ElementId) -> AttributeValue;
    fn set(&mut self, id: ElementId, value: AttributeValue) -> Result<(), GraphError>;
    fn is_default(&self, id: ElementId) -> bool;

    /// Whether the slot holds an explicit value. Columns that cannot tell
    /// "set to default" from "never set" answer `!is_default`.
    fn is_set(&self, id: ElementId) -> bool {
        !self.is_default(id)
    }

    fn clear(&mut self, id: ElementId);
    fn default_value(&self) -> AttributeValue;
    fn set_default_value(&mut self, value: AttributeValue) -> Result<(), GraphError>;

    /// The value `get` would return after storing `value`.
    fn normalise(&self, value: AttributeValue) -> Result<AttributeValue, GraphError>;

    /// Deep copy with independent storage.
    fn copy(&self) -> Box<dyn AttributeColumn>;

    /// Overwrite this column with the contents of `source`, keeping the
    /// existing allocation. Returns `false` and leaves `self` alone when
    /// `source` is a different column type.
    fn copy_from(&mut self, source: &dyn AttributeColumn) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn AttributeColumn> {
    fn clone(&self) -> Self {
        self.copy()
    }

    fn clone_from(&mut self, source: &Self) {
        if !(**self).copy_from(&**source) {
            *self = source.copy();
        }
    }
}

/// Creates empty columns for one registered type name.
pub trait ColumnFactory: Send + Sync {
    fn type_name(&self) -> &str;
    fn native_type(&self) -> NativeType;

    /// Build a column whose default is `default`, converted under the
    /// column's own rules.
    fn create(&self, default: AttributeValue) -> Result<Box<dyn AttributeColumn>, GraphError>;
}
