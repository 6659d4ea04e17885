//! Primary keys and value lookups for GraphStore.

use ahash::AHashMap;
use tracing::debug;

use crate::attribute::{AttributeValue, ValueKey};
use crate::errors::GraphError;

use super::index::ValueIndex;
use super::types::{AttributeId, AttributeIndexType, ElementId, ElementKind, GraphKey};
use super::GraphStore;

/// What two transactions must share to collide: key values, endpoints and
/// direction.
type TransactionIdentity = (Vec<ValueKey>, ElementId, ElementId, bool);

impl GraphStore {
    /// Replace the primary key of `kind`. An empty list removes it.
    ///
    /// Keys are declared for vertices and transactions only. Every
    /// attribute must belong to `kind` and appear once.
    pub fn set_primary_key(
        &mut self,
        kind: ElementKind,
        attributes: &[AttributeId],
    ) -> Result<(), GraphError> {
        if !matches!(kind, ElementKind::Vertex | ElementKind::Transaction) {
            return Err(GraphError::invalid_input(format!(
                "{kind} elements cannot have a primary key"
            )));
        }
        for (position, &id) in attributes.iter().enumerate() {
            let descriptor = &self.slot(id)?.descriptor;
            if descriptor.kind != kind {
                return Err(GraphError::invalid_input(format!(
                    "key attribute '{}' belongs to {}, not {kind}",
                    descriptor.name, descriptor.kind
                )));
            }
            if attributes[..position].contains(&id) {
                return Err(GraphError::invalid_input(format!(
                    "key attribute '{}' is listed twice",
                    descriptor.name
                )));
            }
        }
        self.primary_keys[kind.index()] = attributes.to_vec();
        self.bump_attribute();
        Ok(())
    }

    pub fn primary_key(&self, kind: ElementKind) -> &[AttributeId] {
        &self.primary_keys[kind.index()]
    }

    /// Key of `element`, or `None` when `kind` has no primary key.
    pub fn primary_key_value(
        &self,
        kind: ElementKind,
        element: ElementId,
    ) -> Result<Option<GraphKey>, GraphError> {
        self.require_element(kind, element)?;
        if self.primary_key(kind).is_empty() {
            return Ok(None);
        }
        let values = self.key_values(kind, element)?;
        match kind {
            ElementKind::Transaction => {
                let record = self.topology.transaction(element)?;
                Ok(Some(GraphKey::Transaction {
                    source: self.vertex_key(record.source)?,
                    destination: self.vertex_key(record.destination)?,
                    directed: record.directed,
                    values,
                }))
            }
            _ => Ok(Some(GraphKey::Vertex(values))),
        }
    }

    /// Every pair `(first, duplicate)` of elements sharing a key, in
    /// positional order. Transactions only collide when they also share
    /// endpoints and direction. A kind without a key has no duplicates.
    pub fn duplicate_keys(
        &self,
        kind: ElementKind,
    ) -> Result<Vec<(ElementId, ElementId)>, GraphError> {
        let mut duplicates = Vec::new();
        if self.primary_key(kind).is_empty() {
            return Ok(duplicates);
        }
        match kind {
            ElementKind::Transaction => {
                let mut seen: AHashMap<TransactionIdentity, ElementId> = AHashMap::new();
                for &element in self.element_ids(kind) {
                    let record = self.topology.transaction(element)?;
                    let identity = (
                        self.key_values(kind, element)?,
                        record.source,
                        record.destination,
                        record.directed,
                    );
                    if let Some(&first) = seen.get(&identity) {
                        duplicates.push((first, element));
                    } else {
                        seen.insert(identity, element);
                    }
                }
            }
            _ => {
                let mut seen: AHashMap<Vec<ValueKey>, ElementId> = AHashMap::new();
                for &element in self.element_ids(kind) {
                    let values = self.key_values(kind, element)?;
                    if let Some(&first) = seen.get(&values) {
                        duplicates.push((first, element));
                    } else {
                        seen.insert(values, element);
                    }
                }
            }
        }
        Ok(duplicates)
    }

    /// Fail with [`GraphError::DuplicateKey`] naming the first collision.
    pub fn validate_key(&self, kind: ElementKind) -> Result<(), GraphError> {
        let Some(&(first, duplicate)) = self.duplicate_keys(kind)?.first() else {
            return Ok(());
        };
        debug!(%kind, first, duplicate, "primary key collision");
        Err(GraphError::duplicate_key(format!(
            "{kind} {duplicate} ({}) repeats the key of {kind} {first} ({})",
            self.describe_key(kind, duplicate)?,
            self.describe_key(kind, first)?
        )))
    }

    /// Validate vertex keys, then transaction keys.
    pub fn validate_keys(&self) -> Result<(), GraphError> {
        self.validate_key(ElementKind::Vertex)?;
        self.validate_key(ElementKind::Transaction)
    }

    /// Build or drop the value index of an attribute.
    pub fn set_attribute_index(
        &mut self,
        id: AttributeId,
        index_type: AttributeIndexType,
    ) -> Result<(), GraphError> {
        let kind = self.slot(id)?.descriptor.kind;
        let elements = self.element_ids(kind).to_vec();
        let slot = self.slot_mut(id)?;
        if slot.index.is_some() == !index_type.is_none() {
            return Ok(());
        }
        slot.index = match index_type {
            AttributeIndexType::None => None,
            AttributeIndexType::Unordered => {
                Some(ValueIndex::build(slot.column.as_ref(), &elements))
            }
        };
        self.bump_attribute();
        Ok(())
    }

    pub fn attribute_index(&self, id: AttributeId) -> Result<AttributeIndexType, GraphError> {
        Ok(match self.slot(id)?.index {
            Some(_) => AttributeIndexType::Unordered,
            None => AttributeIndexType::None,
        })
    }

    /// Elements whose value equals `value` after the column's conversion,
    /// in ascending id order.
    ///
    /// Indexed attributes answer from their buckets; everything else, and
    /// lookups of the default value, scan the element table.
    pub fn elements_with_value<V: Into<AttributeValue>>(
        &self,
        id: AttributeId,
        value: V,
    ) -> Result<Vec<ElementId>, GraphError> {
        let slot = self.slot(id)?;
        let wanted = ValueKey::new(slot.column.normalise(value.into())?);
        let mut found: Vec<ElementId> = match &slot.index {
            Some(index) if !index.is_default(&wanted) => index.lookup(&wanted).collect(),
            _ => self
                .element_ids(slot.descriptor.kind)
                .iter()
                .copied()
                .filter(|&element| wanted.matches(&slot.column.get(element)))
                .collect(),
        };
        found.sort_unstable();
        Ok(found)
    }

    fn key_values(&self, kind: ElementKind, element: ElementId) -> Result<Vec<ValueKey>, GraphError> {
        self.primary_key(kind)
            .iter()
            .map(|&id| Ok(ValueKey::new(self.slot(id)?.column.get(element))))
            .collect()
    }

    fn vertex_key(&self, vertex: ElementId) -> Result<Option<Vec<ValueKey>>, GraphError> {
        if self.primary_key(ElementKind::Vertex).is_empty() {
            return Ok(None);
        }
        self.key_values(ElementKind::Vertex, vertex).map(Some)
    }

    fn describe_key(&self, kind: ElementKind, element: ElementId) -> Result<String, GraphError> {
        let mut parts = Vec::new();
        for &id in self.primary_key(kind) {
            let slot = self.slot(id)?;
            parts.push(format!("{} = {}", slot.descriptor.name, slot.column.get(element)));
        }
        Ok(parts.join(", "))
    }
}
