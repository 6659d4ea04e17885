//! Configuration for store construction and archive I/O.
//!
//! This module provides the configuration structures used when creating a
//! fresh [`GraphStore`] and when reading or writing archives, along with the
//! [`open_archive`] factory that combines both.

use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::archive;
use crate::errors::GraphError;
use crate::graph::{DEFAULT_SCHEMA, GraphStore};
use crate::mvcc::SnapshotController;
use crate::registry::AttributeRegistry;

/// Options applied when a new, empty store is created.
///
/// # Default Configuration
///
/// ```rust
/// use snapgraph::StoreConfig;
/// let config = StoreConfig::default();
/// assert_eq!(config.schema, "bare");
/// assert!(config.reserve_vertex_capacity.is_none());
/// assert!(config.reserve_transaction_capacity.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Schema name recorded in the store and in its archives
    ///
    /// **Default:** `"bare"`
    ///
    /// The core does not interpret the name; schema layers use it to tell
    /// which attribute set a graph was built for.
    pub schema: String,

    /// Optional capacity pre-allocation for vertices
    ///
    /// **Default:** `None`
    ///
    /// A hint only. Element tables grow beyond it as needed.
    pub reserve_vertex_capacity: Option<usize>,

    /// Optional capacity pre-allocation for transactions
    ///
    /// **Default:** `None`
    pub reserve_transaction_capacity: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            reserve_vertex_capacity: None,
            reserve_transaction_capacity: None,
        }
    }
}

/// Options for archive reading and writing.
///
/// # Default Configuration
///
/// ```rust
/// use snapgraph::ArchiveConfig;
/// let config = ArchiveConfig::default();
/// assert!(!config.verbose);
/// assert!(config.sync_on_save);
/// assert!(config.create_if_missing);
/// assert_eq!(config.graph_entry, "graph.json");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Emit attribute values even when they equal the column default
    ///
    /// **Default:** `false`
    ///
    /// Non-verbose archives are smaller; verbose archives are easier to
    /// inspect by hand. Both read back to the same store.
    pub verbose: bool,

    /// Flush the temporary file to disk before moving it into place
    ///
    /// **Default:** `true`
    pub sync_on_save: bool,

    /// Start from an empty store when [`open_archive`] finds no file
    ///
    /// **Default:** `true`
    ///
    /// When `false`, opening a missing path fails with
    /// [`GraphError::IoFailure`].
    pub create_if_missing: bool,

    /// Container entry holding the JSON graph document
    ///
    /// **Default:** `"graph.json"`
    pub graph_entry: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            sync_on_save: true,
            create_if_missing: true,
            graph_entry: "graph.json".to_string(),
        }
    }
}

/// Complete configuration for opening a graph.
///
/// # Examples
///
/// ```rust
/// use snapgraph::GraphConfig;
///
/// let cfg = GraphConfig::default();
/// assert_eq!(cfg.store.schema, "bare");
///
/// let mut custom = GraphConfig::with_schema("analytic");
/// custom.store.reserve_vertex_capacity = Some(10_000);
/// custom.archive.verbose = true;
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphConfig {
    /// Options for newly created stores
    ///
    /// **Default:** [`StoreConfig::default()`]
    pub store: StoreConfig,

    /// Options for archive I/O
    ///
    /// **Default:** [`ArchiveConfig::default()`]
    pub archive: ArchiveConfig,
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with a specific schema name.
    pub fn with_schema<S: Into<String>>(schema: S) -> Self {
        let mut cfg = Self::default();
        cfg.store.schema = schema.into();
        cfg
    }

    /// Default configuration that writes default-valued attributes too.
    pub fn verbose() -> Self {
        let mut cfg = Self::default();
        cfg.archive.verbose = true;
        cfg
    }
}

/// Open the archive at `path` behind a snapshot controller.
///
/// Missing files yield an empty store built from `cfg.store` when
/// `cfg.archive.create_if_missing` is set.
///
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use snapgraph::{open_archive, AttributeRegistry, GraphConfig};
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("fresh.sgr");
/// let registry = Arc::new(AttributeRegistry::with_builtins());
/// let controller = open_archive(&path, &GraphConfig::default(), registry).unwrap();
/// assert_eq!(controller.acquire_read().vertex_count(), 0);
/// ```
pub fn open_archive<P: AsRef<Path>>(
    path: P,
    cfg: &GraphConfig,
    registry: Arc<AttributeRegistry>,
) -> Result<SnapshotController, GraphError> {
    let path = path.as_ref();
    let store = if path.exists() {
        archive::load_from_path(path, &cfg.archive, registry)?
    } else if cfg.archive.create_if_missing {
        GraphStore::with_config(&cfg.store, registry)
    } else {
        return Err(GraphError::IoFailure(io::Error::new(
            io::ErrorKind::NotFound,
            format!("archive {} does not exist", path.display()),
        )));
    };
    Ok(SnapshotController::new(store))
}
