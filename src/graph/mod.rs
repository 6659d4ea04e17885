mod attribute_ops;
mod element_ops;
mod element_table;
mod index;
mod key_ops;
mod store;
mod topology;
mod types;

pub use element_table::{ElementTable, MAX_ELEMENT_ID, MAX_ID_GAP};
pub use store::GraphStore;
pub use topology::{EdgeRecord, LinkRecord, Topology, TransactionRecord, VertexRecord};
pub use types::{
    AttributeDescriptor, AttributeId, AttributeIndexType, EdgeDirection, ElementId, ElementKind,
    GRAPH_ELEMENT, GraphKey, ModCounters,
};

pub(crate) use store::DEFAULT_SCHEMA;
