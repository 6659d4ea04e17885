//! Attribute type registry.
//!
//! Maps a type name to the factory that builds its columns and the provider
//! that moves its values in and out of archives. Stores hold the registry
//! behind an `Arc`; it is never consulted through global state.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::archive::{
    BlobProvider, DateTimeProvider, PrimitiveProvider, SerializationProvider, StringListProvider,
    StringProvider,
};
use crate::attribute::{
    AttributeColumn, AttributeValue, BlobData, ColumnFactory, DateTimeColumnFactory,
    ObjectColumnFactory, PrimitiveColumnFactory, StringList, TextColumnFactory, type_names,
};
use crate::errors::GraphError;

#[derive(Clone, Default)]
pub struct AttributeRegistry {
    columns: AHashMap<String, Arc<dyn ColumnFactory>>,
    providers: AHashMap<String, Arc<dyn SerializationProvider>>,
}

impl AttributeRegistry {
    /// Registry with no types at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the primitive, string, datetime, blob and string list types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(
                PrimitiveColumnFactory::<bool>::new(),
                PrimitiveProvider::new(type_names::BOOLEAN),
            )
            .register(
                PrimitiveColumnFactory::<i32>::new(),
                PrimitiveProvider::new(type_names::INTEGER),
            )
            .register(
                PrimitiveColumnFactory::<i64>::new(),
                PrimitiveProvider::new(type_names::LONG),
            )
            .register(
                PrimitiveColumnFactory::<f32>::new(),
                PrimitiveProvider::new(type_names::FLOAT),
            )
            .register(
                PrimitiveColumnFactory::<f64>::new(),
                PrimitiveProvider::new(type_names::DOUBLE),
            )
            .register(TextColumnFactory, StringProvider)
            .register(DateTimeColumnFactory, DateTimeProvider)
            .register(
                ObjectColumnFactory::<BlobData>::new(type_names::BLOB),
                BlobProvider,
            )
            .register(
                ObjectColumnFactory::<StringList>::new(type_names::STRING_LIST),
                StringListProvider,
            );
        registry
    }

    /// Register a column factory and its provider under the factory's type name.
    /// Replaces an earlier registration of the same name.
    pub fn register<F, P>(&mut self, factory: F, provider: P) -> &mut Self
    where
        F: ColumnFactory + 'static,
        P: SerializationProvider + 'static,
    {
        self.register_column(factory);
        self.register_provider(provider)
    }

    pub fn register_column<F: ColumnFactory + 'static>(&mut self, factory: F) -> &mut Self {
        self.columns
            .insert(factory.type_name().to_string(), Arc::new(factory));
        self
    }

    pub fn register_provider<P: SerializationProvider + 'static>(&mut self, provider: P) -> &mut Self {
        self.providers
            .insert(provider.type_name().to_string(), Arc::new(provider));
        self
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.columns.contains_key(type_name)
    }

    pub fn column_factory(&self, type_name: &str) -> Result<&Arc<dyn ColumnFactory>, GraphError> {
        self.columns
            .get(type_name)
            .ok_or_else(|| GraphError::unknown_type(format!("no column factory for '{type_name}'")))
    }

    pub fn provider(&self, type_name: &str) -> Result<&Arc<dyn SerializationProvider>, GraphError> {
        self.providers.get(type_name).ok_or_else(|| {
            GraphError::unknown_type(format!("no serialization provider for '{type_name}'"))
        })
    }

    pub fn create_column(
        &self,
        type_name: &str,
        default: AttributeValue,
    ) -> Result<Box<dyn AttributeColumn>, GraphError> {
        self.column_factory(type_name)?.create(default)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for AttributeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
