use std::sync::Arc;

use ahash::AHashMap;

use crate::attribute::{AttributeColumn, AttributeValue};
use crate::config::StoreConfig;
use crate::errors::GraphError;
use crate::registry::AttributeRegistry;

use super::index::ValueIndex;
use super::topology::Topology;
use super::types::{AttributeDescriptor, AttributeId, ElementId, ElementKind, ModCounters};

pub(crate) const DEFAULT_SCHEMA: &str = "bare";

#[derive(Debug)]
pub(crate) struct AttributeSlot {
    pub id: AttributeId,
    pub descriptor: AttributeDescriptor,
    pub column: Box<dyn AttributeColumn>,
    pub value_mod_count: u64,
    pub index: Option<ValueIndex>,
}

impl AttributeSlot {
    pub fn new(
        id: AttributeId,
        descriptor: AttributeDescriptor,
        column: Box<dyn AttributeColumn>,
    ) -> Self {
        Self {
            id,
            descriptor,
            column,
            value_mod_count: 0,
            index: None,
        }
    }

    /// Store `value` at `element`, moving the element between index buckets.
    pub fn write(&mut self, element: ElementId, value: AttributeValue) -> Result<(), GraphError> {
        let Some(index) = self.index.as_mut() else {
            return self.column.set(element, value);
        };
        let old = self.column.get(element);
        self.column.set(element, value)?;
        index.remove(element, old);
        index.insert(element, self.column.get(element));
        Ok(())
    }

    pub fn reset(&mut self, element: ElementId) {
        if let Some(index) = self.index.as_mut() {
            index.remove(element, self.column.get(element));
        }
        self.column.clear(element);
    }

    pub fn reindex(&mut self, elements: &[ElementId]) {
        if self.index.is_some() {
            self.index = Some(ValueIndex::build(self.column.as_ref(), elements));
        }
    }
}

impl Clone for AttributeSlot {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            descriptor: self.descriptor.clone(),
            column: self.column.copy(),
            value_mod_count: self.value_mod_count,
            index: self.index.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.id = source.id;
        self.descriptor.clone_from(&source.descriptor);
        self.column.clone_from(&source.column);
        self.value_mod_count = source.value_mod_count;
        self.index.clone_from(&source.index);
    }
}

/// Attribute-typed graph: element tables, link/edge views and columns.
///
/// A store is a plain value. Every mutator takes `&mut self`, so shared
/// snapshots handed out by [`SnapshotController`](crate::SnapshotController)
/// are read-only by construction. `Clone` is a deep copy that keeps the
/// lineage, so attribute ids obtained from one copy resolve in the other.
#[derive(Debug)]
pub struct GraphStore {
    pub(crate) uid: u64,
    pub(crate) schema: String,
    pub(crate) topology: Topology,
    pub(crate) slots: Vec<Option<AttributeSlot>>,
    pub(crate) generations: Vec<u32>,
    pub(crate) free_slots: Vec<usize>,
    pub(crate) names: AHashMap<(ElementKind, String), AttributeId>,
    pub(crate) by_kind: [Vec<AttributeId>; 5],
    pub(crate) primary_keys: [Vec<AttributeId>; 5],
    pub(crate) counters: ModCounters,
    pub(crate) registry: Arc<AttributeRegistry>,
}

impl GraphStore {
    /// Empty store with the built-in attribute types.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(AttributeRegistry::with_builtins()))
    }

    pub fn with_registry(registry: Arc<AttributeRegistry>) -> Self {
        Self::with_config(&StoreConfig::default(), registry)
    }

    pub fn with_config(config: &StoreConfig, registry: Arc<AttributeRegistry>) -> Self {
        Self {
            uid: rand::random(),
            schema: config.schema.clone(),
            topology: Topology::with_capacity(
                config.reserve_vertex_capacity.unwrap_or(0),
                config.reserve_transaction_capacity.unwrap_or(0),
            ),
            slots: Vec::new(),
            generations: Vec::new(),
            free_slots: Vec::new(),
            names: AHashMap::new(),
            by_kind: Default::default(),
            primary_keys: Default::default(),
            counters: ModCounters::default(),
            registry,
        }
    }

    /// Deep copy sharing this store's lineage.
    pub fn copy(&self) -> GraphStore {
        self.clone()
    }

    /// Whether `other` descends from the same original store.
    pub fn same_lineage(&self, other: &GraphStore) -> bool {
        self.uid == other.uid
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn set_schema<S: Into<String>>(&mut self, schema: S) {
        self.schema = schema.into();
        self.counters.global += 1;
    }

    pub fn registry(&self) -> &Arc<AttributeRegistry> {
        &self.registry
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn counters(&self) -> ModCounters {
        self.counters
    }

    pub fn global_mod_count(&self) -> u64 {
        self.counters.global
    }

    pub fn structure_mod_count(&self) -> u64 {
        self.counters.structure
    }

    pub fn attribute_mod_count(&self) -> u64 {
        self.counters.attribute
    }

    pub(crate) fn restore_counters(&mut self, counters: ModCounters) {
        self.counters = counters;
    }

    pub(crate) fn bump_structure(&mut self) {
        self.counters.structure += 1;
        self.counters.global += 1;
    }

    pub(crate) fn bump_attribute(&mut self) {
        self.counters.attribute += 1;
        self.counters.global += 1;
    }
}

impl Clone for GraphStore {
    fn clone(&self) -> Self {
        Self {
            uid: self.uid,
            schema: self.schema.clone(),
            topology: self.topology.clone(),
            slots: self.slots.clone(),
            generations: self.generations.clone(),
            free_slots: self.free_slots.clone(),
            names: self.names.clone(),
            by_kind: self.by_kind.clone(),
            primary_keys: self.primary_keys.clone(),
            counters: self.counters,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Overwrite `self` with a copy of `source`, reusing existing buffers.
    fn clone_from(&mut self, source: &Self) {
        self.uid = source.uid;
        self.schema.clone_from(&source.schema);
        self.topology.clone_from(&source.topology);
        self.slots.clone_from(&source.slots);
        self.generations.clone_from(&source.generations);
        self.free_slots.clone_from(&source.free_slots);
        self.names.clone_from(&source.names);
        self.by_kind.clone_from(&source.by_kind);
        self.primary_keys.clone_from(&source.primary_keys);
        self.counters = source.counters;
        self.registry = Arc::clone(&source.registry);
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
