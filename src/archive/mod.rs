//! Archive serialization: a container holding one JSON graph document plus
//! binary blob entries.
//!
//! Reads always populate a fresh store and hand it back only on success.
//! Writes to a path go through a temporary file in the destination
//! directory that is moved into place once complete.

mod blobs;
mod cache;
mod container;
mod document;
mod providers;

pub use blobs::{BLOB_PREFIX, BlobReader, BlobWriter};
pub use cache::{CacheStats, ObjectCache};
pub use container::{
    ArchiveReader, ArchiveWriter, ContainerHeader, EntryInfo, FORMAT_VERSION, HEADER_SIZE,
    MAGIC_BYTES,
};
pub use document::{
    AttributeDeclaration, DOCUMENT_VERSION, ElementSection, GraphDocument, RESERVED_KEYS,
    build_document, load_document,
};
pub use providers::{
    BlobProvider, DateTimeProvider, IdRemap, PrimitiveProvider, ReadContext, SerializationProvider,
    StringListProvider, StringProvider, WriteContext,
};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::ArchiveConfig;
use crate::errors::GraphError;
use crate::graph::GraphStore;
use crate::registry::AttributeRegistry;

/// Write `store` as a complete archive into `sink`.
pub fn write_archive<W: Write + Seek>(
    store: &GraphStore,
    sink: W,
    cfg: &ArchiveConfig,
) -> Result<W, GraphError> {
    let mut blobs = BlobWriter::new();
    let document = build_document(store, cfg, &mut blobs)?;
    let json = serde_json::to_vec(&document)
        .map_err(|e| GraphError::invalid_value(format!("graph document: {e}")))?;

    let mut writer = ArchiveWriter::new(sink)?;
    writer.add_entry(&cfg.graph_entry, &json)?;
    debug!(
        blobs = blobs.len(),
        blob_bytes = blobs.total_bytes(),
        json_bytes = json.len(),
        "writing archive entries"
    );
    for (name, bytes) in blobs.into_entries() {
        writer.add_entry(&name, &bytes)?;
    }
    writer.finish()
}

/// Read a complete archive from `source` into a new store.
pub fn read_archive<R: Read + Seek>(
    source: R,
    cfg: &ArchiveConfig,
    registry: Arc<AttributeRegistry>,
) -> Result<GraphStore, GraphError> {
    let mut reader = ArchiveReader::open(source)?;
    let document = read_document(&mut reader, cfg)?;
    let blobs = BlobReader::from_archive(&mut reader)?;
    let (store, _) = load_document(&document, &blobs, registry)?;
    Ok(store)
}

/// Parse only the JSON document of an opened archive.
pub fn read_document<R: Read + Seek>(
    reader: &mut ArchiveReader<R>,
    cfg: &ArchiveConfig,
) -> Result<GraphDocument, GraphError> {
    let json = reader.read_entry(&cfg.graph_entry)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Atomically replace `path` with an archive of `store`.
pub fn save_to_path<P: AsRef<Path>>(
    store: &GraphStore,
    path: P,
    cfg: &ArchiveConfig,
) -> Result<(), GraphError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    info!(path = %path.display(), vertices = store.vertex_count(), "saving archive");

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let sink = write_archive(store, BufWriter::new(temp.as_file_mut()), cfg)?;
        sink.into_inner().map_err(|e| GraphError::IoFailure(e.into_error()))?;
    }
    if cfg.sync_on_save {
        temp.as_file().sync_all()?;
    }
    temp.persist(path).map_err(|e| GraphError::IoFailure(e.error))?;
    Ok(())
}

/// Load the archive at `path` into a new store.
pub fn load_from_path<P: AsRef<Path>>(
    path: P,
    cfg: &ArchiveConfig,
    registry: Arc<AttributeRegistry>,
) -> Result<GraphStore, GraphError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let store = read_archive(BufReader::new(file), cfg, registry)?;
    info!(
        path = %path.display(),
        vertices = store.vertex_count(),
        transactions = store.transaction_count(),
        "archive loaded"
    );
    Ok(store)
}
