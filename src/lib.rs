//! Versioned, attribute-typed in-memory graph store.
//!
//! snapgraph keeps a graph of vertices and transactions (directed or
//! undirected connections between vertices) together with typed attribute
//! columns for every element kind, and shares it between many readers and
//! one writer through copy-on-write snapshots.
//!
//! # Features
//!
//! - **Typed Attribute Columns**: boolean, numeric, string, datetime and opaque object columns with per-type conversion rules
//! - **Element Tables**: dense identifiers with recycling and stable positional enumeration
//! - **Links and Edges**: transactions grouped by vertex pair and by direction, maintained incrementally
//! - **Snapshots**: lock-free read handles, single-writer working copies, atomic commit and rollback
//! - **Archives**: JSON graph document plus binary blob entries in a checksummed container
//!
//! # Quick Start
//!
//! ```rust
//! use snapgraph::{ElementKind, GraphStore, SnapshotController, type_names};
//!
//! let controller = SnapshotController::new(GraphStore::new());
//! let alice = controller
//!     .write(|g| {
//!         let label = g.ensure_attribute(ElementKind::Vertex, "Label", type_names::STRING, "")?;
//!         let v = g.add_vertex();
//!         g.set(label, v, "Alice")?;
//!         Ok(v)
//!     })
//!     .unwrap();
//!
//! let snapshot = controller.acquire_read();
//! let label = snapshot.get_by_name(ElementKind::Vertex, "Label", alice).unwrap();
//! assert_eq!(label.as_str(), Some("Alice"));
//! ```
//!
//! # Public API Organization
//!
//! ## Core Types
//! - [`GraphStore`] - Element tables, link/edge views and attribute columns
//! - [`ElementTable`] - Identifier allocation and enumeration for one kind
//! - [`AttributeColumn`] / [`ColumnFactory`] - Column storage and construction
//! - [`AttributeValue`] - Dynamically typed attribute value
//!
//! ## Concurrency
//! - [`SnapshotController`] - Read/write handle protocol
//! - [`ReadHandle`] / [`WriteHandle`] - Pinned snapshot and private working copy
//!
//! ## Configuration
//! - [`GraphConfig`], [`StoreConfig`], [`ArchiveConfig`]
//! - [`open_archive()`] - Open an archive behind a controller
//!
//! ## Serialization
//! - [`archive`] - Container format, providers, save and load
//! - [`AttributeRegistry`] - Type name to column factory and provider
//!
//! ## Utilities
//! - [`GraphError`] - Error taxonomy
//! - [`cli`] - Argument parsing and commands behind the `snapgraph` binary

pub mod archive;
pub mod attribute;
pub mod bench_utils;
pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod mvcc;
pub mod registry;

pub use attribute::{
    AttributeColumn, AttributeValue, BlobData, ColumnFactory, GraphObject, NativeType,
    ObjectValue, StringList, ValueKey, type_names,
};
pub use config::{ArchiveConfig, GraphConfig, StoreConfig, open_archive};
pub use errors::GraphError;
pub use graph::{
    AttributeDescriptor, AttributeId, AttributeIndexType, EdgeDirection, ElementId, ElementKind,
    ElementTable, GRAPH_ELEMENT, GraphKey, GraphStore, MAX_ELEMENT_ID, MAX_ID_GAP, ModCounters,
    Topology,
};
pub use mvcc::{CommitOutcome, ControllerState, ReadHandle, SnapshotController, WriteHandle};
pub use registry::AttributeRegistry;
