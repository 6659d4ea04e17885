//! Vertex/transaction structure and the derived link and edge views.
//!
//! Links and edges are maintained incrementally: every transaction belongs
//! to exactly one link (its unordered endpoint pair) and one edge (that
//! link split by direction). A link or edge disappears with its last
//! transaction and its id is recycled like any other element id.

use ahash::AHashMap;

use crate::errors::GraphError;

use super::element_table::ElementTable;
use super::types::{EdgeDirection, ElementId, ElementKind};

#[derive(Clone, Debug, Default)]
pub struct VertexRecord {
    transactions: Vec<ElementId>,
    links: Vec<ElementId>,
}

#[derive(Clone, Debug)]
pub struct TransactionRecord {
    pub source: ElementId,
    pub destination: ElementId,
    pub directed: bool,
    pub link: ElementId,
    pub edge: ElementId,
}

#[derive(Clone, Debug)]
pub struct LinkRecord {
    pub low: ElementId,
    pub high: ElementId,
    transactions: Vec<ElementId>,
    edges: [Option<ElementId>; 3],
}

#[derive(Clone, Debug)]
pub struct EdgeRecord {
    pub link: ElementId,
    pub direction: EdgeDirection,
    transactions: Vec<ElementId>,
}

/// Link and edge ids released by a structural change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Released {
    pub link: Option<ElementId>,
    pub edge: Option<ElementId>,
}

#[derive(Debug)]
pub struct Topology {
    vertices: ElementTable<VertexRecord>,
    transactions: ElementTable<TransactionRecord>,
    links: ElementTable<LinkRecord>,
    edges: ElementTable<EdgeRecord>,
    link_index: AHashMap<(ElementId, ElementId), ElementId>,
}

impl Clone for Topology {
    fn clone(&self) -> Self {
        Self {
            vertices: self.vertices.clone(),
            transactions: self.transactions.clone(),
            links: self.links.clone(),
            edges: self.edges.clone(),
            link_index: self.link_index.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.vertices.clone_from(&source.vertices);
        self.transactions.clone_from(&source.transactions);
        self.links.clone_from(&source.links);
        self.edges.clone_from(&source.edges);
        self.link_index.clone_from(&source.link_index);
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::with_capacity(0, 0)
    }
}

fn remove_member(list: &mut Vec<ElementId>, id: ElementId) {
    if let Some(pos) = list.iter().position(|&member| member == id) {
        list.remove(pos);
    }
}

fn orient(source: ElementId, destination: ElementId, directed: bool) -> (ElementId, ElementId, EdgeDirection) {
    let (low, high) = if source <= destination {
        (source, destination)
    } else {
        (destination, source)
    };
    let direction = match (directed, source <= destination) {
        (false, _) => EdgeDirection::Flat,
        (true, true) => EdgeDirection::Uphill,
        (true, false) => EdgeDirection::Downhill,
    };
    (low, high, direction)
}

impl Topology {
    pub fn with_capacity(vertices: usize, transactions: usize) -> Self {
        Self {
            vertices: ElementTable::with_capacity(ElementKind::Vertex, vertices),
            transactions: ElementTable::with_capacity(ElementKind::Transaction, transactions),
            links: ElementTable::new(ElementKind::Link),
            edges: ElementTable::new(ElementKind::Edge),
            link_index: AHashMap::new(),
        }
    }

    pub fn vertices(&self) -> &ElementTable<VertexRecord> {
        &self.vertices
    }

    pub fn transactions(&self) -> &ElementTable<TransactionRecord> {
        &self.transactions
    }

    pub fn links(&self) -> &ElementTable<LinkRecord> {
        &self.links
    }

    pub fn edges(&self) -> &ElementTable<EdgeRecord> {
        &self.edges
    }

    pub(crate) fn add_vertex(&mut self) -> ElementId {
        self.vertices.create(VertexRecord::default())
    }

    pub(crate) fn add_vertex_with_id(&mut self, id: ElementId) -> Result<(), GraphError> {
        self.vertices.create_with_id(id, VertexRecord::default())
    }

    /// Remove an isolated vertex. Callers cascade its transactions first.
    pub(crate) fn remove_vertex(&mut self, id: ElementId) -> Result<(), GraphError> {
        let record = self.vertices.require(id)?;
        if !record.transactions.is_empty() {
            return Err(GraphError::invalid_input(format!(
                "vertex {id} still has {} transactions",
                record.transactions.len()
            )));
        }
        self.vertices.delete(id)?;
        Ok(())
    }

    pub(crate) fn add_transaction(
        &mut self,
        source: ElementId,
        destination: ElementId,
        directed: bool,
    ) -> Result<ElementId, GraphError> {
        self.check_endpoints(source, destination)?;
        let (source, destination) = Self::normalise(source, destination, directed);
        let id = self.transactions.create(TransactionRecord {
            source,
            destination,
            directed,
            link: 0,
            edge: 0,
        });
        self.attach(id)?;
        Ok(id)
    }

    pub(crate) fn add_transaction_with_id(
        &mut self,
        id: ElementId,
        source: ElementId,
        destination: ElementId,
        directed: bool,
    ) -> Result<(), GraphError> {
        self.check_endpoints(source, destination)?;
        let (source, destination) = Self::normalise(source, destination, directed);
        self.transactions.create_with_id(
            id,
            TransactionRecord {
                source,
                destination,
                directed,
                link: 0,
                edge: 0,
            },
        )?;
        self.attach(id)
    }

    pub(crate) fn remove_transaction(&mut self, id: ElementId) -> Result<Released, GraphError> {
        let released = self.detach(id)?;
        self.transactions.delete(id)?;
        Ok(released)
    }

    /// Move a transaction onto new endpoints, regrouping its link and edge.
    ///
    /// A transaction that stays on the same vertex pair keeps its link, and
    /// keeps its edge too unless its direction flips.
    pub(crate) fn set_endpoints(
        &mut self,
        id: ElementId,
        source: ElementId,
        destination: ElementId,
    ) -> Result<Released, GraphError> {
        self.check_endpoints(source, destination)?;
        let (directed, link, edge) = {
            let record = self.transactions.require(id)?;
            (record.directed, record.link, record.edge)
        };
        let (source, destination) = Self::normalise(source, destination, directed);
        let (low, high, direction) = orient(source, destination, directed);

        let current = self.links.require(link)?;
        if (current.low, current.high) == (low, high) {
            let released = if self.edges.require(edge)?.direction == direction {
                Released::default()
            } else {
                self.move_to_edge(id, link, edge, direction)?
            };
            let record = self.transactions.require_mut(id)?;
            record.source = source;
            record.destination = destination;
            return Ok(released);
        }

        let released = self.detach(id)?;
        let record = self.transactions.require_mut(id)?;
        record.source = source;
        record.destination = destination;
        self.attach(id)?;
        Ok(released)
    }

    /// Shift a transaction between the edges of its own link.
    fn move_to_edge(
        &mut self,
        id: ElementId,
        link: ElementId,
        edge: ElementId,
        direction: EdgeDirection,
    ) -> Result<Released, GraphError> {
        let mut released = Released::default();
        let edge_record = self.edges.require_mut(edge)?;
        remove_member(&mut edge_record.transactions, id);
        if edge_record.transactions.is_empty() {
            let old_direction = edge_record.direction;
            self.edges.delete(edge)?;
            self.links.require_mut(link)?.edges[old_direction.index()] = None;
            released.edge = Some(edge);
        }
        let target = self.edge_for(link, direction)?;
        self.edges.require_mut(target)?.transactions.push(id);
        self.transactions.require_mut(id)?.edge = target;
        Ok(released)
    }

    fn edge_for(&mut self, link: ElementId, direction: EdgeDirection) -> Result<ElementId, GraphError> {
        if let Some(edge) = self.links.require(link)?.edges[direction.index()] {
            return Ok(edge);
        }
        let edge = self.edges.create(EdgeRecord {
            link,
            direction,
            transactions: Vec::new(),
        });
        self.links.require_mut(link)?.edges[direction.index()] = Some(edge);
        Ok(edge)
    }

    /// Undirected transactions always run from the lower vertex id.
    fn normalise(source: ElementId, destination: ElementId, directed: bool) -> (ElementId, ElementId) {
        if !directed && source > destination {
            (destination, source)
        } else {
            (source, destination)
        }
    }

    fn check_endpoints(&self, source: ElementId, destination: ElementId) -> Result<(), GraphError> {
        self.vertices.require(source)?;
        self.vertices.require(destination)?;
        Ok(())
    }

    fn attach(&mut self, id: ElementId) -> Result<(), GraphError> {
        let (source, destination, directed) = {
            let record = self.transactions.require(id)?;
            (record.source, record.destination, record.directed)
        };
        let (low, high, direction) = orient(source, destination, directed);

        let existing_link = self.link_index.get(&(low, high)).copied();
        let link = match existing_link {
            Some(link) => link,
            None => {
                let link = self.links.create(LinkRecord {
                    low,
                    high,
                    transactions: Vec::new(),
                    edges: [None; 3],
                });
                self.link_index.insert((low, high), link);
                self.vertices.require_mut(low)?.links.push(link);
                if high != low {
                    self.vertices.require_mut(high)?.links.push(link);
                }
                link
            }
        };

        let edge = self.edge_for(link, direction)?;

        self.links.require_mut(link)?.transactions.push(id);
        self.edges.require_mut(edge)?.transactions.push(id);
        self.vertices.require_mut(source)?.transactions.push(id);
        if destination != source {
            self.vertices.require_mut(destination)?.transactions.push(id);
        }
        let record = self.transactions.require_mut(id)?;
        record.link = link;
        record.edge = edge;
        Ok(())
    }

    fn detach(&mut self, id: ElementId) -> Result<Released, GraphError> {
        let (source, destination, link, edge) = {
            let record = self.transactions.require(id)?;
            (record.source, record.destination, record.link, record.edge)
        };
        let mut released = Released::default();

        remove_member(&mut self.vertices.require_mut(source)?.transactions, id);
        if destination != source {
            remove_member(&mut self.vertices.require_mut(destination)?.transactions, id);
        }

        let edge_record = self.edges.require_mut(edge)?;
        remove_member(&mut edge_record.transactions, id);
        if edge_record.transactions.is_empty() {
            let direction = edge_record.direction;
            self.edges.delete(edge)?;
            self.links.require_mut(link)?.edges[direction.index()] = None;
            released.edge = Some(edge);
        }

        let link_record = self.links.require_mut(link)?;
        remove_member(&mut link_record.transactions, id);
        if link_record.transactions.is_empty() {
            let (low, high) = (link_record.low, link_record.high);
            self.links.delete(link)?;
            self.link_index.remove(&(low, high));
            remove_member(&mut self.vertices.require_mut(low)?.links, link);
            if high != low {
                remove_member(&mut self.vertices.require_mut(high)?.links, link);
            }
            released.link = Some(link);
        }
        Ok(released)
    }

    pub fn vertex_transactions(&self, vertex: ElementId) -> Result<&[ElementId], GraphError> {
        Ok(&self.vertices.require(vertex)?.transactions)
    }

    pub fn vertex_links(&self, vertex: ElementId) -> Result<&[ElementId], GraphError> {
        Ok(&self.vertices.require(vertex)?.links)
    }

    /// Distinct vertices joined to `vertex` by at least one transaction.
    pub fn vertex_neighbours(&self, vertex: ElementId) -> Result<Vec<ElementId>, GraphError> {
        let record = self.vertices.require(vertex)?;
        let mut neighbours = Vec::with_capacity(record.links.len());
        for &link in &record.links {
            let link = self.links.require(link)?;
            neighbours.push(if link.low == vertex { link.high } else { link.low });
        }
        Ok(neighbours)
    }

    pub fn link_between(&self, a: ElementId, b: ElementId) -> Option<ElementId> {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.link_index.get(&key).copied()
    }

    pub fn link_endpoints(&self, link: ElementId) -> Result<(ElementId, ElementId), GraphError> {
        let record = self.links.require(link)?;
        Ok((record.low, record.high))
    }

    pub fn link_transactions(&self, link: ElementId) -> Result<&[ElementId], GraphError> {
        Ok(&self.links.require(link)?.transactions)
    }

    /// Edges of a link in uphill, downhill, flat order.
    pub fn link_edges(&self, link: ElementId) -> Result<Vec<ElementId>, GraphError> {
        Ok(self.links.require(link)?.edges.iter().flatten().copied().collect())
    }

    pub fn edge_link(&self, edge: ElementId) -> Result<ElementId, GraphError> {
        Ok(self.edges.require(edge)?.link)
    }

    pub fn edge_direction(&self, edge: ElementId) -> Result<EdgeDirection, GraphError> {
        Ok(self.edges.require(edge)?.direction)
    }

    /// Source and destination of the edge; (low, high) when flat.
    pub fn edge_endpoints(&self, edge: ElementId) -> Result<(ElementId, ElementId), GraphError> {
        let record = self.edges.require(edge)?;
        let (low, high) = self.link_endpoints(record.link)?;
        Ok(match record.direction {
            EdgeDirection::Downhill => (high, low),
            EdgeDirection::Uphill | EdgeDirection::Flat => (low, high),
        })
    }

    pub fn edge_transactions(&self, edge: ElementId) -> Result<&[ElementId], GraphError> {
        Ok(&self.edges.require(edge)?.transactions)
    }

    pub fn transaction(&self, id: ElementId) -> Result<&TransactionRecord, GraphError> {
        self.transactions.require(id)
    }
}
