//! Identity, existence and id recycling for one element kind.
//!
//! Ids come from a high-water mark or a LIFO free list. A side list of
//! live ids (append on create, swap-remove on delete) gives O(1)
//! positional enumeration without compacting the id space.

use crate::errors::GraphError;

use super::types::{ElementId, ElementKind};

const NOT_LIVE: usize = usize::MAX;

/// Largest id `create_with_id` accepts.
pub const MAX_ELEMENT_ID: ElementId = u32::MAX as ElementId;

/// How far past the high-water mark an explicit id may land. Every id in
/// the gap goes on the free list.
pub const MAX_ID_GAP: usize = 1 << 20;

/// Element table carrying a per-element record of type `R`.
#[derive(Debug)]
pub struct ElementTable<R = ()> {
    kind: ElementKind,
    high_water: usize,
    free: Vec<ElementId>,
    live: Vec<ElementId>,
    positions: Vec<usize>,
    records: Vec<Option<R>>,
}

impl<R> ElementTable<R> {
    pub fn new(kind: ElementKind) -> Self {
        Self::with_capacity(kind, 0)
    }

    pub fn with_capacity(kind: ElementKind, capacity: usize) -> Self {
        Self {
            kind,
            high_water: 0,
            free: Vec::new(),
            live: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Allocate an id (recycled if possible) and store `record` under it.
    pub fn create(&mut self, record: R) -> ElementId {
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                let id = self.high_water;
                self.high_water += 1;
                id
            }
        };
        self.insert_live(id, record);
        id
    }

    /// Claim a specific id, e.g. when replaying an archive.
    pub fn create_with_id(&mut self, id: ElementId, record: R) -> Result<(), GraphError> {
        if self.exists(id) {
            return Err(GraphError::invalid_input(format!(
                "{} {id} already exists",
                self.kind
            )));
        }
        if id > MAX_ELEMENT_ID || id.saturating_sub(self.high_water) > MAX_ID_GAP {
            return Err(GraphError::invalid_input(format!(
                "{} {id} is out of range (high-water mark {})",
                self.kind, self.high_water
            )));
        }
        if id >= self.high_water {
            self.free.extend(self.high_water..id);
            self.high_water = id + 1;
        } else if let Some(pos) = self.free.iter().position(|&free| free == id) {
            self.free.remove(pos);
        }
        self.insert_live(id, record);
        Ok(())
    }

    fn insert_live(&mut self, id: ElementId, record: R) {
        if self.positions.len() <= id {
            self.positions.resize(id + 1, NOT_LIVE);
            self.records.resize_with(id + 1, || None);
        }
        self.positions[id] = self.live.len();
        self.live.push(id);
        self.records[id] = Some(record);
    }

    /// Retire `id`, returning its record. The id goes back on the free list.
    pub fn delete(&mut self, id: ElementId) -> Result<R, GraphError> {
        let position = self
            .position_of(id)
            .ok_or_else(|| self.missing(id))?;
        let record = self
            .records
            .get_mut(id)
            .and_then(Option::take)
            .ok_or_else(|| self.missing(id))?;
        self.live.swap_remove(position);
        if let Some(&moved) = self.live.get(position) {
            self.positions[moved] = position;
        }
        self.positions[id] = NOT_LIVE;
        self.free.push(id);
        Ok(record)
    }

    pub fn exists(&self, id: ElementId) -> bool {
        self.positions.get(id).is_some_and(|&p| p != NOT_LIVE)
    }

    pub fn count(&self) -> usize {
        self.live.len()
    }

    /// Id at `position` in the dense live list. Stable while unmutated.
    pub fn nth(&self, position: usize) -> Option<ElementId> {
        self.live.get(position).copied()
    }

    pub fn position_of(&self, id: ElementId) -> Option<usize> {
        match self.positions.get(id) {
            Some(&p) if p != NOT_LIVE => Some(p),
            _ => None,
        }
    }

    /// One past the largest id ever allocated.
    pub fn capacity(&self) -> usize {
        self.high_water
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.live
    }

    pub fn iter(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.live.iter().copied()
    }

    pub fn record(&self, id: ElementId) -> Option<&R> {
        self.records.get(id).and_then(Option::as_ref)
    }

    pub fn record_mut(&mut self, id: ElementId) -> Option<&mut R> {
        self.records.get_mut(id).and_then(Option::as_mut)
    }

    pub fn require(&self, id: ElementId) -> Result<&R, GraphError> {
        self.record(id).ok_or_else(|| self.missing(id))
    }

    pub fn require_mut(&mut self, id: ElementId) -> Result<&mut R, GraphError> {
        let kind = self.kind;
        self.record_mut(id)
            .ok_or_else(|| GraphError::unknown_element(format!("{kind} {id}")))
    }

    fn missing(&self, id: ElementId) -> GraphError {
        GraphError::unknown_element(format!("{} {id}", self.kind))
    }
}

impl<R: Clone> Clone for ElementTable<R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            high_water: self.high_water,
            free: self.free.clone(),
            live: self.live.clone(),
            positions: self.positions.clone(),
            records: self.records.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.kind = source.kind;
        self.high_water = source.high_water;
        self.free.clone_from(&source.free);
        self.live.clone_from(&source.live);
        self.positions.clone_from(&source.positions);
        self.records.clone_from(&source.records);
    }
}

impl<R> Default for ElementTable<R> {
    fn default() -> Self {
        Self::new(ElementKind::Vertex)
    }
}
