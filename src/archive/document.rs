//! JSON graph document: building it from a store and replaying it into one.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::attribute::AttributeValue;
use crate::config::ArchiveConfig;
use crate::errors::GraphError;
use crate::graph::{
    AttributeId, AttributeIndexType, ElementId, ElementKind, GRAPH_ELEMENT, GraphStore, ModCounters,
};
use crate::registry::AttributeRegistry;

use super::blobs::{BlobReader, BlobWriter};
use super::cache::{CacheStats, ObjectCache};
use super::providers::{IdRemap, ReadContext, WriteContext};

pub const DOCUMENT_VERSION: u32 = 1;

/// Keys with structural meaning inside element objects.
pub const RESERVED_KEYS: [&str; 4] = ["id", "src", "dst", "directed"];

/// Element kinds whose values are persisted per element.
const STORED_KINDS: [ElementKind; 2] = [ElementKind::Vertex, ElementKind::Transaction];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphDocument {
    pub version: u32,
    pub schema: String,
    #[serde(default)]
    pub mod_counts: ModCounters,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<AttributeDeclaration>>,
    /// Element kind name to key attribute names, in key order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub primary_keys: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub elements: ElementSection,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttributeDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub mod_count: u64,
    #[serde(default, skip_serializing_if = "AttributeIndexType::is_none")]
    pub index: AttributeIndexType,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElementSection {
    #[serde(default)]
    pub vertex: Vec<Map<String, Value>>,
    #[serde(default)]
    pub transaction: Vec<Map<String, Value>>,
}

impl GraphDocument {
    pub fn vertex_count(&self) -> usize {
        self.elements.vertex.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.elements.transaction.len()
    }
}

/// Build the document for `store`, sending blob payloads to `blobs`.
pub fn build_document(
    store: &GraphStore,
    cfg: &ArchiveConfig,
    blobs: &mut BlobWriter,
) -> Result<GraphDocument, GraphError> {
    let mut attributes = BTreeMap::new();
    for kind in ElementKind::ALL {
        let ids = store.attributes(kind);
        if ids.is_empty() {
            continue;
        }
        let mut declarations = Vec::with_capacity(ids.len());
        for &id in ids {
            let descriptor = store.descriptor(id)?;
            if kind != ElementKind::Graph && RESERVED_KEYS.contains(&descriptor.name.as_str()) {
                return Err(GraphError::invalid_value(format!(
                    "{kind} attribute name '{}' is reserved in archives",
                    descriptor.name
                )));
            }
            let provider = store.registry().provider(&descriptor.type_name)?;
            let mut ctx = WriteContext::new(kind, None, &descriptor.name, blobs);
            declarations.push(AttributeDeclaration {
                name: descriptor.name.clone(),
                type_name: descriptor.type_name.clone(),
                default: provider.write_value(&descriptor.default, &mut ctx)?,
                description: descriptor.description.clone(),
                mod_count: store.value_mod_count(id)?,
                index: store.attribute_index(id)?,
            });
        }
        attributes.insert(kind.as_str().to_string(), declarations);
    }

    let mut primary_keys = BTreeMap::new();
    for kind in ElementKind::ALL {
        let key = store.primary_key(kind);
        if key.is_empty() {
            continue;
        }
        let names = key
            .iter()
            .map(|&id| Ok(store.descriptor(id)?.name.clone()))
            .collect::<Result<Vec<_>, GraphError>>()?;
        primary_keys.insert(kind.as_str().to_string(), names);
    }

    let mut elements = ElementSection::default();
    for kind in STORED_KINDS {
        let mut objects = Vec::with_capacity(store.count(kind));
        for &element in store.element_ids(kind) {
            let mut object = Map::new();
            object.insert("id".to_string(), Value::from(element as u64));
            if kind == ElementKind::Transaction {
                let (source, destination) = store.transaction_endpoints(element)?;
                object.insert("src".to_string(), Value::from(source as u64));
                object.insert("dst".to_string(), Value::from(destination as u64));
                object.insert(
                    "directed".to_string(),
                    Value::Bool(store.transaction_directed(element)?),
                );
            }
            write_values(store, kind, element, cfg.verbose, blobs, &mut object)?;
            objects.push(object);
        }
        match kind {
            ElementKind::Vertex => elements.vertex = objects,
            _ => elements.transaction = objects,
        }
    }

    let mut meta = Map::new();
    write_values(store, ElementKind::Graph, GRAPH_ELEMENT, cfg.verbose, blobs, &mut meta)?;

    Ok(GraphDocument {
        version: DOCUMENT_VERSION,
        schema: store.schema().to_string(),
        mod_counts: store.counters(),
        attributes,
        primary_keys,
        elements,
        meta,
    })
}

fn write_values(
    store: &GraphStore,
    kind: ElementKind,
    element: ElementId,
    verbose: bool,
    blobs: &mut BlobWriter,
    object: &mut Map<String, Value>,
) -> Result<(), GraphError> {
    for &id in store.attributes(kind) {
        let column = store.column(id)?;
        if !verbose && column.is_default(element) {
            continue;
        }
        let descriptor = store.descriptor(id)?;
        let provider = store.registry().provider(&descriptor.type_name)?;
        let mut ctx = WriteContext::new(kind, Some(element), &descriptor.name, blobs);
        let node = provider.write_value(&column.get(element), &mut ctx)?;
        object.insert(descriptor.name.clone(), node);
    }
    Ok(())
}

/// Replay a parsed document into a fresh store.
pub fn load_document(
    document: &GraphDocument,
    blobs: &BlobReader,
    registry: Arc<AttributeRegistry>,
) -> Result<(GraphStore, CacheStats), GraphError> {
    if document.version != DOCUMENT_VERSION {
        return Err(GraphError::corrupt_archive(format!(
            "unsupported document version {} (expected {DOCUMENT_VERSION})",
            document.version
        )));
    }
    let mut store = GraphStore::with_registry(Arc::clone(&registry));
    store.set_schema(document.schema.clone());

    let cache = ObjectCache::new();
    let mut remap = IdRemap::new();
    let mut value_counts: Vec<(AttributeId, u64)> = Vec::new();
    let mut indexed: Vec<AttributeId> = Vec::new();

    for (kind_name, declarations) in &document.attributes {
        let kind = ElementKind::from_name(kind_name)
            .ok_or_else(|| GraphError::corrupt_archive(format!("unknown element kind '{kind_name}'")))?;
        for declaration in declarations {
            let provider = registry
                .provider(&declaration.type_name)
                .map_err(|e| GraphError::corrupt_archive(e.to_string()))?;
            let default = {
                let mut ctx = ReadContext::new(&remap, blobs, &cache);
                provider.read_value(&declaration.default, &mut ctx)?
            };
            let id = store
                .add_attribute(kind, &declaration.name, &declaration.type_name, default)
                .map_err(|e| {
                    GraphError::corrupt_archive(format!(
                        "{kind} attribute '{}': {e}",
                        declaration.name
                    ))
                })?;
            if declaration.description.is_some() {
                store.set_attribute_description(id, declaration.description.as_deref())?;
            }
            value_counts.push((id, declaration.mod_count));
            if !declaration.index.is_none() {
                indexed.push(id);
            }
        }
    }

    for (kind_name, names) in &document.primary_keys {
        let kind = ElementKind::from_name(kind_name)
            .ok_or_else(|| GraphError::corrupt_archive(format!("unknown element kind '{kind_name}'")))?;
        let key = names
            .iter()
            .map(|name| {
                store.attribute(kind, name).ok_or_else(|| {
                    GraphError::corrupt_archive(format!(
                        "{kind} primary key names undeclared attribute '{name}'"
                    ))
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()?;
        store
            .set_primary_key(kind, &key)
            .map_err(|e| GraphError::corrupt_archive(format!("{kind} primary key: {e}")))?;
    }

    // first pass: structure
    for object in &document.elements.vertex {
        let file_id = file_id(object, "id", ElementKind::Vertex)?;
        let id = store.add_vertex();
        if !remap.insert(ElementKind::Vertex, file_id, id) {
            return Err(GraphError::corrupt_archive(format!("duplicate vertex id {file_id}")));
        }
    }
    for object in &document.elements.transaction {
        let file_id = file_id(object, "id", ElementKind::Transaction)?;
        let source = file_id_ref(object, "src", &remap)?;
        let destination = file_id_ref(object, "dst", &remap)?;
        let directed = match object.get("directed") {
            Some(Value::Bool(directed)) => *directed,
            None => true,
            Some(other) => {
                return Err(GraphError::corrupt_archive(format!(
                    "transaction {file_id}: 'directed' must be a boolean, found {other}"
                )));
            }
        };
        let id = store.add_transaction(source, destination, directed)?;
        if !remap.insert(ElementKind::Transaction, file_id, id) {
            return Err(GraphError::corrupt_archive(format!(
                "duplicate transaction id {file_id}"
            )));
        }
    }

    // second pass: values
    for (kind, objects) in [
        (ElementKind::Vertex, &document.elements.vertex),
        (ElementKind::Transaction, &document.elements.transaction),
    ] {
        for object in objects {
            let element = remap
                .get(kind, file_id(object, "id", kind)?)
                .ok_or_else(|| GraphError::corrupt_archive(format!("unmapped {kind}")))?;
            read_values(&mut store, &registry, kind, element, object, &remap, blobs, &cache)?;
        }
    }
    read_values(
        &mut store,
        &registry,
        ElementKind::Graph,
        GRAPH_ELEMENT,
        &document.meta,
        &remap,
        blobs,
        &cache,
    )?;

    for id in indexed {
        store.set_attribute_index(id, AttributeIndexType::Unordered)?;
    }
    for (id, count) in value_counts {
        store.restore_value_mod_count(id, count)?;
    }
    store.restore_counters(document.mod_counts);

    let stats = cache.stats();
    debug!(
        vertices = store.vertex_count(),
        transactions = store.transaction_count(),
        cache_hits = stats.hits,
        cache_entries = stats.entries,
        "graph document loaded"
    );
    Ok((store, stats))
}

fn file_id(object: &Map<String, Value>, key: &str, kind: ElementKind) -> Result<u64, GraphError> {
    object
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| GraphError::corrupt_archive(format!("{kind} entry without numeric '{key}'")))
}

fn file_id_ref(object: &Map<String, Value>, key: &str, remap: &IdRemap) -> Result<ElementId, GraphError> {
    let file_id = file_id(object, key, ElementKind::Transaction)?;
    remap.get(ElementKind::Vertex, file_id).ok_or_else(|| {
        GraphError::corrupt_archive(format!("transaction endpoint '{key}' names unknown vertex {file_id}"))
    })
}

#[allow(clippy::too_many_arguments)]
fn read_values(
    store: &mut GraphStore,
    registry: &AttributeRegistry,
    kind: ElementKind,
    element: ElementId,
    object: &Map<String, Value>,
    remap: &IdRemap,
    blobs: &BlobReader,
    cache: &ObjectCache,
) -> Result<(), GraphError> {
    for (key, node) in object {
        if kind != ElementKind::Graph && RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let id = store.attribute(kind, key).ok_or_else(|| {
            GraphError::corrupt_archive(format!("{kind} value for undeclared attribute '{key}'"))
        })?;
        let type_name = store.descriptor(id)?.type_name.clone();
        let provider = registry
            .provider(&type_name)
            .map_err(|e| GraphError::corrupt_archive(e.to_string()))?;
        let value: AttributeValue = {
            let mut ctx = ReadContext::new(remap, blobs, cache);
            provider.read_value(node, &mut ctx)?
        };
        store.set(id, element, value).map_err(|e| {
            GraphError::corrupt_archive(format!("{kind} {element} attribute '{key}': {e}"))
        })?;
    }
    Ok(())
}
