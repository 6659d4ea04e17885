//! Element CRUD and enumeration for GraphStore.

use crate::errors::GraphError;

use super::topology::Released;
use super::types::{ElementId, ElementKind, GRAPH_ELEMENT};
use super::GraphStore;

const GRAPH_IDS: &[ElementId] = &[GRAPH_ELEMENT];

impl GraphStore {
    pub fn add_vertex(&mut self) -> ElementId {
        let id = self.topology.add_vertex();
        self.bump_structure();
        id
    }

    /// Create a vertex under a caller-chosen id.
    pub fn add_vertex_with_id(&mut self, id: ElementId) -> Result<(), GraphError> {
        self.topology.add_vertex_with_id(id)?;
        self.clear_columns(ElementKind::Vertex, id);
        self.bump_structure();
        Ok(())
    }

    /// Remove a vertex together with every transaction touching it.
    pub fn remove_vertex(&mut self, id: ElementId) -> Result<(), GraphError> {
        let incident = self.topology.vertex_transactions(id)?.to_vec();
        for transaction in incident {
            self.remove_transaction(transaction)?;
        }
        self.topology.remove_vertex(id)?;
        self.clear_columns(ElementKind::Vertex, id);
        self.bump_structure();
        Ok(())
    }

    /// Add a transaction. Undirected transactions are stored low id first.
    pub fn add_transaction(
        &mut self,
        source: ElementId,
        destination: ElementId,
        directed: bool,
    ) -> Result<ElementId, GraphError> {
        let id = self.topology.add_transaction(source, destination, directed)?;
        self.bump_structure();
        Ok(id)
    }

    pub fn add_transaction_with_id(
        &mut self,
        id: ElementId,
        source: ElementId,
        destination: ElementId,
        directed: bool,
    ) -> Result<(), GraphError> {
        self.topology
            .add_transaction_with_id(id, source, destination, directed)?;
        self.clear_columns(ElementKind::Transaction, id);
        self.bump_structure();
        Ok(())
    }

    pub fn remove_transaction(&mut self, id: ElementId) -> Result<(), GraphError> {
        let released = self.topology.remove_transaction(id)?;
        self.clear_columns(ElementKind::Transaction, id);
        self.clear_released(released);
        self.bump_structure();
        Ok(())
    }

    pub fn set_transaction_source(&mut self, id: ElementId, source: ElementId) -> Result<(), GraphError> {
        let destination = self.topology.transaction(id)?.destination;
        self.set_transaction_endpoints(id, source, destination)
    }

    pub fn set_transaction_destination(
        &mut self,
        id: ElementId,
        destination: ElementId,
    ) -> Result<(), GraphError> {
        let source = self.topology.transaction(id)?.source;
        self.set_transaction_endpoints(id, source, destination)
    }

    pub fn set_transaction_endpoints(
        &mut self,
        id: ElementId,
        source: ElementId,
        destination: ElementId,
    ) -> Result<(), GraphError> {
        let released = self.topology.set_endpoints(id, source, destination)?;
        self.clear_released(released);
        self.bump_structure();
        Ok(())
    }

    fn clear_released(&mut self, released: Released) {
        if let Some(link) = released.link {
            self.clear_columns(ElementKind::Link, link);
        }
        if let Some(edge) = released.edge {
            self.clear_columns(ElementKind::Edge, edge);
        }
    }

    pub fn transaction_endpoints(&self, id: ElementId) -> Result<(ElementId, ElementId), GraphError> {
        let record = self.topology.transaction(id)?;
        Ok((record.source, record.destination))
    }

    pub fn transaction_directed(&self, id: ElementId) -> Result<bool, GraphError> {
        Ok(self.topology.transaction(id)?.directed)
    }

    pub fn vertex_count(&self) -> usize {
        self.topology.vertices().count()
    }

    pub fn transaction_count(&self) -> usize {
        self.topology.transactions().count()
    }

    pub fn link_count(&self) -> usize {
        self.topology.links().count()
    }

    pub fn edge_count(&self) -> usize {
        self.topology.edges().count()
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.element_ids(kind).len()
    }

    /// Element at `position` in `[0, count)`. Stable between mutations.
    pub fn nth(&self, kind: ElementKind, position: usize) -> Option<ElementId> {
        self.element_ids(kind).get(position).copied()
    }

    pub fn position_of(&self, kind: ElementKind, id: ElementId) -> Option<usize> {
        match kind {
            ElementKind::Graph => (id == GRAPH_ELEMENT).then_some(0),
            ElementKind::Vertex => self.topology.vertices().position_of(id),
            ElementKind::Transaction => self.topology.transactions().position_of(id),
            ElementKind::Link => self.topology.links().position_of(id),
            ElementKind::Edge => self.topology.edges().position_of(id),
        }
    }

    pub fn exists(&self, kind: ElementKind, id: ElementId) -> bool {
        self.position_of(kind, id).is_some()
    }

    pub fn element_ids(&self, kind: ElementKind) -> &[ElementId] {
        match kind {
            ElementKind::Graph => GRAPH_IDS,
            ElementKind::Vertex => self.topology.vertices().ids(),
            ElementKind::Transaction => self.topology.transactions().ids(),
            ElementKind::Link => self.topology.links().ids(),
            ElementKind::Edge => self.topology.edges().ids(),
        }
    }

    /// One past the largest id ever used for `kind`.
    pub fn capacity(&self, kind: ElementKind) -> usize {
        match kind {
            ElementKind::Graph => 1,
            ElementKind::Vertex => self.topology.vertices().capacity(),
            ElementKind::Transaction => self.topology.transactions().capacity(),
            ElementKind::Link => self.topology.links().capacity(),
            ElementKind::Edge => self.topology.edges().capacity(),
        }
    }

    pub(crate) fn require_element(&self, kind: ElementKind, id: ElementId) -> Result<(), GraphError> {
        if self.exists(kind, id) {
            Ok(())
        } else {
            Err(GraphError::unknown_element(format!("{kind} {id}")))
        }
    }
}
