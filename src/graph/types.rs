//! Identifier and descriptor types shared across the graph store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeValue, ValueKey};

/// Identifier of an element within its kind. Recycled after deletion.
pub type ElementId = usize;

/// The single pseudo-element that carries graph-level attributes.
pub const GRAPH_ELEMENT: ElementId = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Graph-level (meta) attributes, one element with id [`GRAPH_ELEMENT`].
    Graph,
    Vertex,
    Transaction,
    /// Derived: all transactions between an unordered vertex pair.
    Link,
    /// Derived: the transactions of a link that share a direction.
    Edge,
}

impl ElementKind {
    pub const ALL: [ElementKind; 5] = [
        ElementKind::Graph,
        ElementKind::Vertex,
        ElementKind::Transaction,
        ElementKind::Link,
        ElementKind::Edge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Graph => "graph",
            ElementKind::Vertex => "vertex",
            ElementKind::Transaction => "transaction",
            ElementKind::Link => "link",
            ElementKind::Edge => "edge",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an edge relative to its link's (low, high) vertex pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
    /// Directed from the low vertex to the high vertex.
    Uphill,
    /// Directed from the high vertex to the low vertex.
    Downhill,
    /// Undirected.
    Flat,
}

impl EdgeDirection {
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Handle to an attribute column of one specific graph lineage.
///
/// Copies of a store share its lineage, so ids stay valid across
/// snapshots. Removing the attribute makes the id stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttributeId {
    pub(crate) graph: u64,
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl AttributeId {
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attribute#{}.{}", self.slot, self.generation)
    }
}

/// Schema information for one attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub kind: ElementKind,
    pub type_name: String,
    pub default: AttributeValue,
    pub description: Option<String>,
}

/// Lookup structure kept alongside an attribute column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeIndexType {
    #[default]
    None,
    /// Hash buckets from value to elements. Exact-match lookups only.
    Unordered,
}

impl AttributeIndexType {
    pub fn is_none(&self) -> bool {
        matches!(self, AttributeIndexType::None)
    }
}

/// Identity of an element under its kind's primary key.
///
/// Transactions are identified by their own key values together with the
/// keys of both endpoints and the directed flag. An endpoint whose kind has
/// no primary key contributes `None`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GraphKey {
    Vertex(Vec<ValueKey>),
    Transaction {
        source: Option<Vec<ValueKey>>,
        destination: Option<Vec<ValueKey>>,
        directed: bool,
        values: Vec<ValueKey>,
    },
}

/// Monotonic change counters, used to detect no-op writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModCounters {
    pub global: u64,
    pub structure: u64,
    pub attribute: u64,
}
