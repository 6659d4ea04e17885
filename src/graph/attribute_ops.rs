//! Attribute lifecycle and value access for GraphStore.

use crate::attribute::{AttributeColumn, AttributeValue};
use crate::errors::GraphError;

use super::store::AttributeSlot;
use super::types::{AttributeDescriptor, AttributeId, ElementId, ElementKind};
use super::GraphStore;

impl GraphStore {
    /// Create an attribute column. Names are unique per element kind.
    pub fn add_attribute<V: Into<AttributeValue>>(
        &mut self,
        kind: ElementKind,
        name: &str,
        type_name: &str,
        default: V,
    ) -> Result<AttributeId, GraphError> {
        if name.is_empty() {
            return Err(GraphError::invalid_input("attribute name must not be empty"));
        }
        if self.names.contains_key(&(kind, name.to_string())) {
            return Err(GraphError::duplicate_attribute(format!(
                "{kind} attribute '{name}' already exists"
            )));
        }
        let mut column = self.registry.create_column(type_name, default.into())?;
        column.ensure_capacity(self.capacity(kind));
        let descriptor = AttributeDescriptor {
            name: name.to_string(),
            kind,
            type_name: column.type_name().to_string(),
            default: column.default_value(),
            description: None,
        };

        let slot = match self.free_slots.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                self.generations.push(0);
                self.slots.len() - 1
            }
        };
        let id = AttributeId {
            graph: self.uid,
            slot: slot as u32,
            generation: self.generations[slot],
        };
        self.slots[slot] = Some(AttributeSlot::new(id, descriptor, column));
        self.names.insert((kind, name.to_string()), id);
        self.by_kind[kind.index()].push(id);
        self.bump_attribute();
        Ok(id)
    }

    /// Fetch the attribute if it exists with the same type, else create it.
    pub fn ensure_attribute<V: Into<AttributeValue>>(
        &mut self,
        kind: ElementKind,
        name: &str,
        type_name: &str,
        default: V,
    ) -> Result<AttributeId, GraphError> {
        match self.attribute(kind, name) {
            Some(id) => {
                let existing = &self.slot(id)?.descriptor.type_name;
                if existing != type_name {
                    return Err(GraphError::duplicate_attribute(format!(
                        "{kind} attribute '{name}' exists with type '{existing}'"
                    )));
                }
                Ok(id)
            }
            None => self.add_attribute(kind, name, type_name, default),
        }
    }

    /// Drop the column. The id and any copies of it become stale.
    pub fn remove_attribute(&mut self, id: AttributeId) -> Result<AttributeDescriptor, GraphError> {
        self.slot(id)?;
        let slot = self.slots[id.slot()]
            .take()
            .ok_or_else(|| GraphError::unknown_attribute(id.to_string()))?;
        let descriptor = slot.descriptor;
        self.generations[id.slot()] = self.generations[id.slot()].wrapping_add(1);
        self.free_slots.push(id.slot());
        self.names.remove(&(descriptor.kind, descriptor.name.clone()));
        self.by_kind[descriptor.kind.index()].retain(|other| *other != id);
        self.primary_keys[descriptor.kind.index()].retain(|other| *other != id);
        self.bump_attribute();
        Ok(descriptor)
    }

    pub fn rename_attribute(&mut self, id: AttributeId, new_name: &str) -> Result<(), GraphError> {
        if new_name.is_empty() {
            return Err(GraphError::invalid_input("attribute name must not be empty"));
        }
        let (kind, old_name) = {
            let descriptor = &self.slot(id)?.descriptor;
            (descriptor.kind, descriptor.name.clone())
        };
        if old_name == new_name {
            return Ok(());
        }
        if self.names.contains_key(&(kind, new_name.to_string())) {
            return Err(GraphError::duplicate_attribute(format!(
                "{kind} attribute '{new_name}' already exists"
            )));
        }
        self.names.remove(&(kind, old_name));
        self.names.insert((kind, new_name.to_string()), id);
        self.slot_mut(id)?.descriptor.name = new_name.to_string();
        self.bump_attribute();
        Ok(())
    }

    /// Change the default. Slots still holding the old default follow it.
    pub fn set_attribute_default<V: Into<AttributeValue>>(
        &mut self,
        id: AttributeId,
        default: V,
    ) -> Result<(), GraphError> {
        let elements = self.element_ids(self.slot(id)?.descriptor.kind).to_vec();
        let slot = self.slot_mut(id)?;
        slot.column.set_default_value(default.into())?;
        slot.descriptor.default = slot.column.default_value();
        slot.reindex(&elements);
        self.bump_attribute();
        Ok(())
    }

    pub fn set_attribute_description(
        &mut self,
        id: AttributeId,
        description: Option<&str>,
    ) -> Result<(), GraphError> {
        self.slot_mut(id)?.descriptor.description = description.map(str::to_string);
        self.bump_attribute();
        Ok(())
    }

    pub fn attribute(&self, kind: ElementKind, name: &str) -> Option<AttributeId> {
        self.names.get(&(kind, name.to_string())).copied()
    }

    pub fn attribute_count(&self, kind: ElementKind) -> usize {
        self.by_kind[kind.index()].len()
    }

    /// Attribute at `position` in declaration order for `kind`.
    pub fn attribute_at(&self, kind: ElementKind, position: usize) -> Option<AttributeId> {
        self.by_kind[kind.index()].get(position).copied()
    }

    pub fn attributes(&self, kind: ElementKind) -> &[AttributeId] {
        &self.by_kind[kind.index()]
    }

    pub fn descriptor(&self, id: AttributeId) -> Result<&AttributeDescriptor, GraphError> {
        Ok(&self.slot(id)?.descriptor)
    }

    pub fn column(&self, id: AttributeId) -> Result<&dyn AttributeColumn, GraphError> {
        Ok(self.slot(id)?.column.as_ref())
    }

    /// Number of value writes made through this attribute.
    pub fn value_mod_count(&self, id: AttributeId) -> Result<u64, GraphError> {
        Ok(self.slot(id)?.value_mod_count)
    }

    pub fn get(&self, id: AttributeId, element: ElementId) -> Result<AttributeValue, GraphError> {
        let slot = self.slot(id)?;
        self.require_element(slot.descriptor.kind, element)?;
        Ok(slot.column.get(element))
    }

    /// Lookup by name, for callers that do not hold an id.
    pub fn get_by_name(
        &self,
        kind: ElementKind,
        name: &str,
        element: ElementId,
    ) -> Result<AttributeValue, GraphError> {
        let id = self
            .attribute(kind, name)
            .ok_or_else(|| GraphError::unknown_attribute(format!("{kind} attribute '{name}'")))?;
        self.get(id, element)
    }

    /// Store a value, converting it under the column's rules.
    /// Null resets the slot to the default.
    pub fn set<V: Into<AttributeValue>>(
        &mut self,
        id: AttributeId,
        element: ElementId,
        value: V,
    ) -> Result<(), GraphError> {
        let kind = self.slot(id)?.descriptor.kind;
        self.require_element(kind, element)?;
        let slot = self.slot_mut(id)?;
        slot.write(element, value.into())?;
        slot.value_mod_count += 1;
        self.counters.global += 1;
        Ok(())
    }

    pub fn is_default(&self, id: AttributeId, element: ElementId) -> Result<bool, GraphError> {
        let slot = self.slot(id)?;
        self.require_element(slot.descriptor.kind, element)?;
        Ok(slot.column.is_default(element))
    }

    pub fn clear(&mut self, id: AttributeId, element: ElementId) -> Result<(), GraphError> {
        let kind = self.slot(id)?.descriptor.kind;
        self.require_element(kind, element)?;
        let slot = self.slot_mut(id)?;
        slot.reset(element);
        slot.value_mod_count += 1;
        self.counters.global += 1;
        Ok(())
    }

    pub(crate) fn restore_value_mod_count(&mut self, id: AttributeId, count: u64) -> Result<(), GraphError> {
        self.slot_mut(id)?.value_mod_count = count;
        Ok(())
    }

    pub(crate) fn slot(&self, id: AttributeId) -> Result<&AttributeSlot, GraphError> {
        if id.graph != self.uid {
            return Err(GraphError::unknown_attribute(format!(
                "{id} belongs to another graph"
            )));
        }
        self.slots
            .get(id.slot())
            .and_then(Option::as_ref)
            .filter(|slot| slot.id == id)
            .ok_or_else(|| GraphError::unknown_attribute(format!("{id} has been removed")))
    }

    pub(crate) fn slot_mut(&mut self, id: AttributeId) -> Result<&mut AttributeSlot, GraphError> {
        self.slot(id)?;
        self.slots
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or_else(|| GraphError::unknown_attribute(format!("{id} has been removed")))
    }

    /// Reset every column of `kind` at `element`, without counting writes.
    pub(crate) fn clear_columns(&mut self, kind: ElementKind, element: ElementId) {
        for index in 0..self.by_kind[kind.index()].len() {
            let slot = self.by_kind[kind.index()][index].slot();
            if let Some(Some(slot)) = self.slots.get_mut(slot) {
                slot.reset(element);
            }
        }
    }
}
