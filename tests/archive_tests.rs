use std::io::Cursor;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use snapgraph::archive::{
    self, ArchiveReader, ReadContext, SerializationProvider, WriteContext,
};
use snapgraph::attribute::ObjectColumnFactory;
use snapgraph::{
    ArchiveConfig, AttributeIndexType, AttributeRegistry, AttributeValue, BlobData, ElementKind,
    GRAPH_ELEMENT, GraphError, GraphStore, ObjectValue, SnapshotController, StringList,
    type_names,
};

fn builtins() -> Arc<AttributeRegistry> {
    Arc::new(AttributeRegistry::with_builtins())
}

fn roundtrip(store: &GraphStore, cfg: &ArchiveConfig) -> GraphStore {
    let bytes = archive::write_archive(store, Cursor::new(Vec::new()), cfg)
        .expect("write")
        .into_inner();
    archive::read_archive(Cursor::new(bytes), cfg, builtins()).expect("read")
}

fn vertex_with_label(store: &GraphStore, label: &str) -> usize {
    store
        .element_ids(ElementKind::Vertex)
        .iter()
        .copied()
        .find(|&v| {
            store
                .get_by_name(ElementKind::Vertex, "Label", v)
                .map(|value| value.as_str() == Some(label))
                .unwrap_or(false)
        })
        .expect("vertex with label")
}

#[test]
fn test_alice_survives_commit_save_and_load() {
    let controller = SnapshotController::new(GraphStore::new());
    let alice = controller
        .write(|g| {
            let label = g.ensure_attribute(ElementKind::Vertex, "Label", type_names::STRING, "")?;
            let v = g.add_vertex();
            g.set(label, v, "Alice")?;
            Ok(v)
        })
        .expect("write");

    let snapshot = controller.acquire_read();
    assert_eq!(
        snapshot.get_by_name(ElementKind::Vertex, "Label", alice).expect("get"),
        AttributeValue::Text("Alice".to_string())
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("alice.sgr");
    controller
        .save_archive(&path, &ArchiveConfig::default())
        .expect("save");

    let loaded = archive::load_from_path(&path, &ArchiveConfig::default(), builtins()).expect("load");
    assert_eq!(loaded.vertex_count(), 1);
    let v = loaded.nth(ElementKind::Vertex, 0).expect("vertex");
    assert_eq!(
        loaded.get_by_name(ElementKind::Vertex, "Label", v).expect("get"),
        AttributeValue::Text("Alice".to_string())
    );
}

#[test]
fn test_roundtrip_every_builtin_type() {
    let mut store = GraphStore::new();
    let when = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
    let label = store
        .add_attribute(ElementKind::Vertex, "Label", type_names::STRING, AttributeValue::Null)
        .expect("label");
    let flag = store
        .add_attribute(ElementKind::Vertex, "flag", type_names::BOOLEAN, false)
        .expect("flag");
    let rank = store
        .add_attribute(ElementKind::Vertex, "rank", type_names::INTEGER, -1)
        .expect("rank");
    let big = store
        .add_attribute(ElementKind::Vertex, "big", type_names::LONG, 0i64)
        .expect("big");
    let ratio = store
        .add_attribute(ElementKind::Vertex, "ratio", type_names::FLOAT, 0.0f32)
        .expect("ratio");
    let seen = store
        .add_attribute(ElementKind::Vertex, "seen", type_names::DATETIME, AttributeValue::Null)
        .expect("seen");
    let icon = store
        .add_attribute(ElementKind::Vertex, "icon", type_names::BLOB, AttributeValue::Null)
        .expect("icon");
    let tags = store
        .add_attribute(ElementKind::Vertex, "tags", type_names::STRING_LIST, AttributeValue::Null)
        .expect("tags");
    let weight = store
        .add_attribute(ElementKind::Transaction, "weight", type_names::DOUBLE, 1.0)
        .expect("weight");
    let title = store
        .add_attribute(ElementKind::Graph, "title", type_names::STRING, AttributeValue::Null)
        .expect("title");

    let a = store.add_vertex();
    let b = store.add_vertex();
    let spare = store.add_vertex();
    store.remove_vertex(spare).expect("leave a hole");
    let ab = store.add_transaction(a, b, true).expect("ab");
    store.add_transaction(b, a, false).expect("ba");

    store.set(label, a, "a").expect("set");
    store.set(label, b, "b").expect("set");
    store.set(flag, a, true).expect("set");
    store.set(rank, b, 12).expect("set");
    store.set(big, a, 9_007_199_254_740_993i64).expect("set");
    store.set(ratio, b, 0.25f32).expect("set");
    store.set(seen, a, when).expect("set");
    store
        .set(icon, b, ObjectValue::new(BlobData(vec![0x89, b'P', b'N', b'G', 0, 255])))
        .expect("set");
    store
        .set(tags, a, ObjectValue::new(StringList::new(["person", "suspect"])))
        .expect("set");
    store.set(weight, ab, 2.5).expect("set");
    store.set(title, GRAPH_ELEMENT, "Case file").expect("set");

    let loaded = roundtrip(&store, &ArchiveConfig::default());
    assert_eq!(loaded.vertex_count(), 2);
    assert_eq!(loaded.transaction_count(), 2);

    let la = vertex_with_label(&loaded, "a");
    let lb = vertex_with_label(&loaded, "b");
    let get = |kind: ElementKind, name: &str, element: usize| {
        loaded.get_by_name(kind, name, element).expect(name)
    };
    assert_eq!(get(ElementKind::Vertex, "flag", la), AttributeValue::Boolean(true));
    assert_eq!(get(ElementKind::Vertex, "flag", lb), AttributeValue::Boolean(false));
    assert_eq!(get(ElementKind::Vertex, "rank", la), AttributeValue::Integer(-1));
    assert_eq!(get(ElementKind::Vertex, "rank", lb), AttributeValue::Integer(12));
    assert_eq!(
        get(ElementKind::Vertex, "big", la),
        AttributeValue::Long(9_007_199_254_740_993)
    );
    assert_eq!(get(ElementKind::Vertex, "ratio", lb), AttributeValue::Float(0.25));
    assert_eq!(get(ElementKind::Vertex, "seen", la), AttributeValue::DateTime(when));
    assert_eq!(get(ElementKind::Vertex, "seen", lb), AttributeValue::Null);

    let icon = get(ElementKind::Vertex, "icon", lb);
    let blob = icon.as_object().and_then(|o| o.downcast_ref::<BlobData>()).expect("blob");
    assert_eq!(blob.0, vec![0x89, b'P', b'N', b'G', 0, 255]);

    let tags = get(ElementKind::Vertex, "tags", la);
    let tags = tags.as_object().and_then(|o| o.downcast_ref::<StringList>()).expect("tags");
    assert_eq!(tags.0, vec!["person".to_string(), "suspect".to_string()]);

    let lab = loaded.topology().link_between(la, lb).expect("link");
    let mut weights: Vec<f64> = loaded
        .topology()
        .link_transactions(lab)
        .expect("transactions")
        .iter()
        .map(|&tx| get(ElementKind::Transaction, "weight", tx).as_f64().expect("weight"))
        .collect();
    weights.sort_by(|x, y| x.total_cmp(y));
    assert_eq!(weights, vec![1.0, 2.5]);

    let directed: Vec<(usize, usize, bool)> = loaded
        .element_ids(ElementKind::Transaction)
        .iter()
        .map(|&tx| {
            let (s, d) = loaded.transaction_endpoints(tx).expect("endpoints");
            (s, d, loaded.transaction_directed(tx).expect("directed"))
        })
        .collect();
    assert!(directed.contains(&(la, lb, true)));
    assert!(directed.contains(&(la, lb, false)));

    assert_eq!(get(ElementKind::Graph, "title", GRAPH_ELEMENT).as_str(), Some("Case file"));
}

#[test]
fn test_declarations_and_counters_are_restored() {
    let mut store = GraphStore::new();
    store.set_schema("analytic");
    let score = store
        .add_attribute(ElementKind::Vertex, "score", type_names::DOUBLE, 0.5)
        .expect("score");
    store
        .set_attribute_description(score, Some("model output"))
        .expect("describe");
    store
        .add_attribute(ElementKind::Edge, "bundle", type_names::INTEGER, 3)
        .expect("edge attribute");
    let v = store.add_vertex();
    store.set(score, v, 0.75).expect("set");
    store.set(score, v, 0.875).expect("set");

    let loaded = roundtrip(&store, &ArchiveConfig::default());
    assert_eq!(loaded.schema(), "analytic");
    assert_eq!(loaded.counters(), store.counters());

    let loaded_score = loaded.attribute(ElementKind::Vertex, "score").expect("score");
    let descriptor = loaded.descriptor(loaded_score).expect("descriptor");
    assert_eq!(descriptor.type_name, type_names::DOUBLE);
    assert_eq!(descriptor.default, AttributeValue::Double(0.5));
    assert_eq!(descriptor.description.as_deref(), Some("model output"));
    assert_eq!(loaded.value_mod_count(loaded_score).expect("count"), 2);

    let bundle = loaded.attribute(ElementKind::Edge, "bundle").expect("edge attribute");
    assert_eq!(
        loaded.descriptor(bundle).expect("descriptor").default,
        AttributeValue::Integer(3)
    );
    assert!(!loaded.same_lineage(&store));
}

#[test]
fn test_primary_keys_and_indexes_are_restored() {
    let mut store = GraphStore::new();
    let name = store
        .add_attribute(ElementKind::Vertex, "Name", type_names::STRING, "")
        .expect("name");
    let kind = store
        .add_attribute(ElementKind::Vertex, "Kind", type_names::STRING, "")
        .expect("kind");
    let when = store
        .add_attribute(ElementKind::Transaction, "When", type_names::LONG, 0i64)
        .expect("when");
    store.set_primary_key(ElementKind::Vertex, &[kind, name]).expect("vertex key");
    store.set_primary_key(ElementKind::Transaction, &[when]).expect("transaction key");
    store.set_attribute_index(kind, AttributeIndexType::Unordered).expect("index");
    let a = store.add_vertex();
    let b = store.add_vertex();
    store.set(name, a, "Alice").expect("set");
    store.set(name, b, "Bob").expect("set");
    store.set(kind, a, "person").expect("set");
    store.set(kind, b, "person").expect("set");

    let loaded = roundtrip(&store, &ArchiveConfig::default());
    assert_eq!(loaded.counters(), store.counters());
    let key_names: Vec<_> = loaded
        .primary_key(ElementKind::Vertex)
        .iter()
        .map(|&id| loaded.descriptor(id).expect("descriptor").name.clone())
        .collect();
    assert_eq!(key_names, ["Kind", "Name"]);
    assert_eq!(loaded.primary_key(ElementKind::Transaction).len(), 1);

    let loaded_kind = loaded.attribute(ElementKind::Vertex, "Kind").expect("kind");
    let loaded_name = loaded.attribute(ElementKind::Vertex, "Name").expect("name");
    assert_eq!(
        loaded.attribute_index(loaded_kind).expect("index"),
        AttributeIndexType::Unordered
    );
    assert_eq!(
        loaded.attribute_index(loaded_name).expect("index"),
        AttributeIndexType::None
    );
    assert_eq!(
        loaded.elements_with_value(loaded_kind, "person").expect("lookup").len(),
        2
    );
    loaded.validate_keys().expect("keys stay unique");
}

#[test]
fn test_identical_objects_share_one_instance_after_load() {
    let mut store = GraphStore::new();
    let tags = store
        .add_attribute(ElementKind::Vertex, "tags", type_names::STRING_LIST, AttributeValue::Null)
        .expect("tags");
    for _ in 0..6 {
        let v = store.add_vertex();
        store
            .set(tags, v, ObjectValue::new(StringList::new(["Person"])))
            .expect("set");
    }

    let loaded = roundtrip(&store, &ArchiveConfig::default());
    let tags = loaded.attribute(ElementKind::Vertex, "tags").expect("tags");
    let values: Vec<ObjectValue> = loaded
        .element_ids(ElementKind::Vertex)
        .iter()
        .map(|&v| {
            loaded
                .get(tags, v)
                .expect("get")
                .as_object()
                .cloned()
                .expect("object")
        })
        .collect();
    assert_eq!(values.len(), 6);
    for value in &values[1..] {
        assert!(value.ptr_eq(&values[0]));
    }
}

#[test]
fn test_default_values_are_skipped_unless_verbose() {
    let mut store = GraphStore::new();
    let label = store
        .add_attribute(ElementKind::Vertex, "Label", type_names::STRING, "unnamed")
        .expect("label");
    let a = store.add_vertex();
    store.add_vertex();
    store.set(label, a, "set").expect("set");

    let document = |cfg: &ArchiveConfig| {
        let bytes = archive::write_archive(&store, Cursor::new(Vec::new()), cfg)
            .expect("write")
            .into_inner();
        let mut reader = ArchiveReader::open(Cursor::new(bytes)).expect("open");
        archive::read_document(&mut reader, cfg).expect("document")
    };

    let terse = document(&ArchiveConfig::default());
    let with_label = terse
        .elements
        .vertex
        .iter()
        .filter(|object| object.contains_key("Label"))
        .count();
    assert_eq!(terse.vertex_count(), 2);
    assert_eq!(with_label, 1);

    let verbose = document(&ArchiveConfig {
        verbose: true,
        ..ArchiveConfig::default()
    });
    assert!(verbose.elements.vertex.iter().all(|object| object.contains_key("Label")));
    assert!(verbose.elements.vertex.iter().any(|object| object["Label"] == json!("unnamed")));
}

#[test]
fn test_blobs_become_separate_entries() {
    let mut store = GraphStore::new();
    let icon = store
        .add_attribute(ElementKind::Vertex, "icon", type_names::BLOB, AttributeValue::Null)
        .expect("icon");
    let v = store.add_vertex();
    store
        .set(icon, v, ObjectValue::new(BlobData(vec![7; 64])))
        .expect("set");

    let cfg = ArchiveConfig::default();
    let bytes = archive::write_archive(&store, Cursor::new(Vec::new()), &cfg)
        .expect("write")
        .into_inner();
    let reader = ArchiveReader::open(Cursor::new(bytes)).expect("open");
    assert_eq!(reader.entries().len(), 2);
    assert!(reader.contains(&cfg.graph_entry));
    let blob = reader
        .entries()
        .iter()
        .find(|entry| entry.name.starts_with(archive::BLOB_PREFIX))
        .expect("blob entry");
    assert_eq!(blob.len, 64);
}

#[test]
fn test_corrupt_inputs_fail_cleanly() {
    let mut store = GraphStore::new();
    let label = store
        .add_attribute(ElementKind::Vertex, "Label", type_names::STRING, "")
        .expect("label");
    let v = store.add_vertex();
    store.set(label, v, "x").expect("set");
    let cfg = ArchiveConfig::default();
    let good = archive::write_archive(&store, Cursor::new(Vec::new()), &cfg)
        .expect("write")
        .into_inner();

    let truncated = good[..good.len() - 5].to_vec();
    let mut bad_magic = good.clone();
    bad_magic[0] ^= 0xFF;
    let mut bad_checksum = good.clone();
    bad_checksum[20] ^= 0x01;

    for (name, bytes) in [
        ("empty", Vec::new()),
        ("truncated", truncated),
        ("bad magic", bad_magic),
        ("bad checksum", bad_checksum),
    ] {
        let result = archive::read_archive(Cursor::new(bytes), &cfg, builtins());
        assert!(
            matches!(result, Err(GraphError::CorruptArchive(_))),
            "{name}: {result:?}"
        );
    }

    let other_entry = ArchiveConfig {
        graph_entry: "elsewhere.json".to_string(),
        ..ArchiveConfig::default()
    };
    assert!(matches!(
        archive::read_archive(Cursor::new(good), &other_entry, builtins()),
        Err(GraphError::CorruptArchive(_))
    ));
}

#[test]
fn test_malformed_documents_are_rejected() {
    let cfg = ArchiveConfig::default();
    let cases = [
        json!({"version": 99, "schema": "bare", "mod_counts": {"global": 0, "structure": 0, "attribute": 0},
               "attributes": {}, "elements": {"vertex": [], "transaction": []}, "meta": {}}),
        json!({"version": 1, "schema": "bare", "mod_counts": {"global": 0, "structure": 0, "attribute": 0},
               "attributes": {"vertex": [{"name": "shape", "type": "polygon", "default": null, "mod_count": 0}]},
               "elements": {"vertex": [], "transaction": []}, "meta": {}}),
        json!({"version": 1, "schema": "bare", "mod_counts": {"global": 0, "structure": 0, "attribute": 0},
               "attributes": {}, "elements": {"vertex": [{"id": 0}],
               "transaction": [{"id": 0, "src": 0, "dst": 7, "directed": true}]}, "meta": {}}),
        json!({"version": 1, "schema": "bare", "mod_counts": {"global": 0, "structure": 0, "attribute": 0},
               "attributes": {"vertex": [{"name": "n", "type": "integer", "default": 0, "mod_count": 0}]},
               "elements": {"vertex": [{"id": 0, "n": "twelve"}], "transaction": []}, "meta": {}}),
        json!({"version": 1, "schema": "bare", "mod_counts": {"global": 0, "structure": 0, "attribute": 0},
               "attributes": {"vertex": [{"name": "n", "type": "integer", "default": 0, "mod_count": 0}]},
               "primary_keys": {"vertex": ["missing"]},
               "elements": {"vertex": [], "transaction": []}, "meta": {}}),
        json!({"version": 1, "schema": "bare", "mod_counts": {"global": 0, "structure": 0, "attribute": 0},
               "attributes": {"graph": [{"name": "n", "type": "integer", "default": 0, "mod_count": 0}]},
               "primary_keys": {"graph": ["n"]},
               "elements": {"vertex": [], "transaction": []}, "meta": {}}),
    ];
    for (index, document) in cases.iter().enumerate() {
        let mut writer = archive::ArchiveWriter::new(Cursor::new(Vec::new())).expect("writer");
        writer
            .add_entry(&cfg.graph_entry, document.to_string().as_bytes())
            .expect("entry");
        let bytes = writer.finish().expect("finish").into_inner();
        let result = archive::read_archive(Cursor::new(bytes), &cfg, builtins());
        assert!(
            matches!(result, Err(GraphError::CorruptArchive(_))),
            "case {index}: {result:?}"
        );
    }
}

#[test]
fn test_failed_save_leaves_existing_file_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("graph.sgr");
    let mut store = GraphStore::new();
    store.add_vertex();
    archive::save_to_path(&store, &path, &ArchiveConfig::default()).expect("first save");
    let original = std::fs::read(&path).expect("read");

    store
        .add_attribute(ElementKind::Vertex, "id", type_names::INTEGER, 0)
        .expect("reserved name is fine in memory");
    store.add_vertex();
    let result = archive::save_to_path(&store, &path, &ArchiveConfig::default());
    assert!(matches!(result, Err(GraphError::InvalidValue(_))));

    assert_eq!(std::fs::read(&path).expect("read"), original);
    let leftovers = std::fs::read_dir(dir.path()).expect("list").count();
    assert_eq!(leftovers, 1);
}

#[test]
fn test_save_into_missing_directory_is_io_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("graph.sgr");
    let result = archive::save_to_path(&GraphStore::new(), &path, &ArchiveConfig::default());
    assert!(matches!(result, Err(GraphError::IoFailure(_))));
    assert!(!path.exists());
}

#[test]
fn test_controller_load_publishes_archive() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("graph.sgr");
    let mut store = GraphStore::new();
    for _ in 0..3 {
        store.add_vertex();
    }
    archive::save_to_path(&store, &path, &ArchiveConfig::default()).expect("save");

    let controller = SnapshotController::new(GraphStore::new());
    let before = controller.acquire_read();
    let outcome = controller
        .load_archive(&path, &ArchiveConfig::default())
        .expect("load");
    assert!(matches!(outcome, snapgraph::CommitOutcome::Published { .. }));
    assert_eq!(before.vertex_count(), 0);
    assert_eq!(controller.acquire_read().vertex_count(), 3);
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct Point {
    x: i32,
    y: i32,
}

struct PointProvider;

impl SerializationProvider for PointProvider {
    fn type_name(&self) -> &str {
        "point"
    }

    fn write_value(&self, value: &AttributeValue, _ctx: &mut WriteContext<'_>) -> Result<Value, GraphError> {
        match value.as_object().and_then(|o| o.downcast_ref::<Point>()) {
            Some(point) => Ok(json!([point.x, point.y])),
            None => Ok(Value::Null),
        }
    }

    fn read_value(&self, node: &Value, ctx: &mut ReadContext<'_>) -> Result<AttributeValue, GraphError> {
        match node {
            Value::Null => Ok(AttributeValue::Null),
            Value::Array(items) if items.len() == 2 => {
                let coord = |v: &Value| {
                    v.as_i64()
                        .and_then(|n| i32::try_from(n).ok())
                        .ok_or_else(|| GraphError::corrupt_archive("point coordinate"))
                };
                let point = Point {
                    x: coord(&items[0])?,
                    y: coord(&items[1])?,
                };
                Ok(AttributeValue::Object(ctx.intern(ObjectValue::new(point))))
            }
            other => Err(GraphError::corrupt_archive(format!("not a point: {other}"))),
        }
    }
}

#[test]
fn test_custom_type_roundtrip_and_missing_provider() {
    let mut registry = AttributeRegistry::with_builtins();
    registry.register(ObjectColumnFactory::<Point>::new("point"), PointProvider);
    let registry = Arc::new(registry);

    let mut store = GraphStore::with_registry(Arc::clone(&registry));
    let position = store
        .add_attribute(ElementKind::Vertex, "position", "point", AttributeValue::Null)
        .expect("point attribute");
    let v = store.add_vertex();
    store
        .set(position, v, ObjectValue::new(Point { x: 3, y: -4 }))
        .expect("set");

    let cfg = ArchiveConfig::default();
    let bytes = archive::write_archive(&store, Cursor::new(Vec::new()), &cfg)
        .expect("write")
        .into_inner();

    let loaded = archive::read_archive(Cursor::new(bytes.clone()), &cfg, registry).expect("read");
    let value = loaded
        .get_by_name(ElementKind::Vertex, "position", 0)
        .expect("get");
    assert_eq!(
        value.as_object().and_then(|o| o.downcast_ref::<Point>()),
        Some(&Point { x: 3, y: -4 })
    );

    assert!(matches!(
        archive::read_archive(Cursor::new(bytes), &cfg, builtins()),
        Err(GraphError::CorruptArchive(_))
    ));
}
