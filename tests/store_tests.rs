use snapgraph::{
    AttributeValue, ElementKind, GRAPH_ELEMENT, GraphError, GraphStore, MAX_ELEMENT_ID,
    type_names,
};

#[test]
fn test_ensure_attribute_is_idempotent() {
    let mut store = GraphStore::new();
    let first = store
        .ensure_attribute(ElementKind::Vertex, "Label", type_names::STRING, "")
        .expect("first");
    let second = store
        .ensure_attribute(ElementKind::Vertex, "Label", type_names::STRING, "")
        .expect("second");
    assert_eq!(first, second);
    assert_eq!(store.attribute_count(ElementKind::Vertex), 1);
}

#[test]
fn test_ensure_attribute_with_other_type_fails() {
    let mut store = GraphStore::new();
    store
        .ensure_attribute(ElementKind::Vertex, "Label", type_names::STRING, "")
        .expect("create");
    assert!(matches!(
        store.ensure_attribute(ElementKind::Vertex, "Label", type_names::INTEGER, 0),
        Err(GraphError::DuplicateAttribute(_))
    ));
}

#[test]
fn test_names_are_scoped_per_kind() {
    let mut store = GraphStore::new();
    let on_vertex = store
        .add_attribute(ElementKind::Vertex, "name", type_names::STRING, "")
        .expect("vertex");
    let on_tx = store
        .add_attribute(ElementKind::Transaction, "name", type_names::STRING, "")
        .expect("transaction");
    assert_ne!(on_vertex, on_tx);
    assert!(matches!(
        store.add_attribute(ElementKind::Vertex, "name", type_names::INTEGER, 0),
        Err(GraphError::DuplicateAttribute(_))
    ));
    assert!(matches!(
        store.add_attribute(ElementKind::Vertex, "", type_names::INTEGER, 0),
        Err(GraphError::InvalidInput(_))
    ));
}

#[test]
fn test_removed_attribute_id_is_stale() {
    let mut store = GraphStore::new();
    let v = store.add_vertex();
    let id = store
        .add_attribute(ElementKind::Vertex, "score", type_names::DOUBLE, 0.0)
        .expect("add");
    let descriptor = store.remove_attribute(id).expect("remove");
    assert_eq!(descriptor.name, "score");
    assert_eq!(store.attribute(ElementKind::Vertex, "score"), None);
    assert!(matches!(store.get(id, v), Err(GraphError::UnknownAttribute(_))));
    assert!(matches!(store.set(id, v, 1.0), Err(GraphError::UnknownAttribute(_))));
    assert!(matches!(store.remove_attribute(id), Err(GraphError::UnknownAttribute(_))));
}

#[test]
fn test_attribute_id_from_other_store_is_rejected() {
    let mut left = GraphStore::new();
    let mut right = GraphStore::new();
    let v = right.add_vertex();
    let foreign = left
        .add_attribute(ElementKind::Vertex, "x", type_names::INTEGER, 0)
        .expect("add");
    right
        .add_attribute(ElementKind::Vertex, "x", type_names::INTEGER, 0)
        .expect("add");
    assert!(matches!(right.get(foreign, v), Err(GraphError::UnknownAttribute(_))));
}

#[test]
fn test_unknown_element_is_rejected() {
    let mut store = GraphStore::new();
    let id = store
        .add_attribute(ElementKind::Vertex, "x", type_names::INTEGER, 0)
        .expect("add");
    assert!(matches!(store.get(id, 3), Err(GraphError::UnknownElement(_))));
    assert!(matches!(store.set(id, 3, 1), Err(GraphError::UnknownElement(_))));
    assert!(matches!(
        store.add_transaction(0, 1, true),
        Err(GraphError::UnknownElement(_))
    ));
}

#[test]
fn test_deleting_vertex_clears_its_slots_for_reuse() {
    let mut store = GraphStore::new();
    let label = store
        .add_attribute(ElementKind::Vertex, "Label", type_names::STRING, "none")
        .expect("add");
    let v = store.add_vertex();
    store.set(label, v, "old").expect("set");
    store.remove_vertex(v).expect("remove");

    let reused = store.add_vertex();
    assert_eq!(reused, v);
    assert_eq!(store.get(label, reused).expect("get").as_str(), Some("none"));
}

#[test]
fn test_deleting_vertex_cascades_to_transactions() {
    let mut store = GraphStore::new();
    let weight = store
        .add_attribute(ElementKind::Transaction, "weight", type_names::DOUBLE, 0.0)
        .expect("add");
    let a = store.add_vertex();
    let b = store.add_vertex();
    let c = store.add_vertex();
    let ab = store.add_transaction(a, b, true).expect("ab");
    let bc = store.add_transaction(b, c, false).expect("bc");
    let ca = store.add_transaction(c, a, true).expect("ca");
    store.set(weight, ab, 5.0).expect("set");

    store.remove_vertex(b).expect("remove b");
    assert_eq!(store.vertex_count(), 2);
    assert_eq!(store.transaction_count(), 1);
    assert!(!store.exists(ElementKind::Transaction, ab));
    assert!(!store.exists(ElementKind::Transaction, bc));
    assert!(store.exists(ElementKind::Transaction, ca));
    assert_eq!(store.link_count(), 1);

    let again = store.add_transaction(a, c, true).expect("reuse id");
    assert!(again == ab || again == bc);
    assert_eq!(store.get(weight, again).expect("get"), AttributeValue::Double(0.0));
}

#[test]
fn test_graph_attributes_use_pseudo_element() {
    let mut store = GraphStore::new();
    let title = store
        .add_attribute(ElementKind::Graph, "title", type_names::STRING, AttributeValue::Null)
        .expect("add");
    store.set(title, GRAPH_ELEMENT, "Case 7").expect("set");
    assert_eq!(store.count(ElementKind::Graph), 1);
    assert_eq!(store.element_ids(ElementKind::Graph), &[GRAPH_ELEMENT]);
    assert_eq!(
        store.get_by_name(ElementKind::Graph, "title", GRAPH_ELEMENT).expect("get"),
        AttributeValue::Text("Case 7".to_string())
    );
    assert!(matches!(store.get(title, 1), Err(GraphError::UnknownElement(_))));
}

#[test]
fn test_rename_and_describe_attribute() {
    let mut store = GraphStore::new();
    let a = store
        .add_attribute(ElementKind::Vertex, "a", type_names::INTEGER, 0)
        .expect("a");
    store
        .add_attribute(ElementKind::Vertex, "b", type_names::INTEGER, 0)
        .expect("b");
    assert!(matches!(
        store.rename_attribute(a, "b"),
        Err(GraphError::DuplicateAttribute(_))
    ));
    store.rename_attribute(a, "alpha").expect("rename");
    store
        .set_attribute_description(a, Some("first letter"))
        .expect("describe");
    assert_eq!(store.attribute(ElementKind::Vertex, "alpha"), Some(a));
    assert_eq!(store.attribute(ElementKind::Vertex, "a"), None);
    let descriptor = store.descriptor(a).expect("descriptor");
    assert_eq!(descriptor.description.as_deref(), Some("first letter"));
    assert_eq!(store.attribute_at(ElementKind::Vertex, 0), Some(a));
}

#[test]
fn test_modification_counters() {
    let mut store = GraphStore::new();
    let start = store.counters();
    let x = store
        .add_attribute(ElementKind::Vertex, "x", type_names::INTEGER, 0)
        .expect("add");
    assert_eq!(store.attribute_mod_count(), start.attribute + 1);

    let v = store.add_vertex();
    assert_eq!(store.structure_mod_count(), start.structure + 1);

    let before = store.global_mod_count();
    store.set(x, v, 3).expect("set");
    store.set(x, v, 4).expect("set");
    assert_eq!(store.value_mod_count(x).expect("count"), 2);
    assert_eq!(store.global_mod_count(), before + 2);
    assert_eq!(store.structure_mod_count(), start.structure + 1);
}

#[test]
fn test_copy_is_deep_and_independent() {
    let mut store = GraphStore::new();
    let label = store
        .add_attribute(ElementKind::Vertex, "Label", type_names::STRING, "")
        .expect("add");
    let a = store.add_vertex();
    let b = store.add_vertex();
    store.add_transaction(a, b, true).expect("tx");
    store.set(label, a, "a").expect("set");
    store.remove_vertex(b).expect("remove");

    let copy = store.copy();
    assert!(copy.same_lineage(&store));

    store.set(label, a, "changed").expect("set");
    let c = store.add_vertex();
    assert_eq!(c, b);

    assert_eq!(copy.get(label, a).expect("get").as_str(), Some("a"));
    assert_eq!(copy.vertex_count(), 1);
    assert!(!copy.exists(ElementKind::Vertex, b));
    assert_eq!(copy.topology().vertices().free_count(), 1);
}

#[test]
fn test_explicit_id_creation() {
    let mut store = GraphStore::new();
    store.add_vertex_with_id(5).expect("vertex 5");
    store.add_vertex_with_id(1).expect("vertex 1");
    assert!(matches!(
        store.add_vertex_with_id(5),
        Err(GraphError::InvalidInput(_))
    ));
    store
        .add_transaction_with_id(9, 5, 1, true)
        .expect("transaction 9");
    assert_eq!(store.transaction_endpoints(9).expect("endpoints"), (5, 1));
    assert_eq!(store.capacity(ElementKind::Vertex), 6);
    assert_eq!(store.capacity(ElementKind::Transaction), 10);

    let next = store.add_vertex();
    assert!(next < 5 && next != 1);
}

#[test]
fn test_explicit_id_out_of_range_is_rejected() {
    let mut store = GraphStore::new();
    let a = store.add_vertex();
    let structure = store.structure_mod_count();

    for id in [usize::MAX, MAX_ELEMENT_ID + 1, 1 << 40] {
        assert!(matches!(
            store.add_vertex_with_id(id),
            Err(GraphError::InvalidInput(_))
        ));
        assert!(matches!(
            store.add_transaction_with_id(id, a, a, true),
            Err(GraphError::InvalidInput(_))
        ));
    }

    assert_eq!(store.structure_mod_count(), structure);
    assert_eq!(store.capacity(ElementKind::Vertex), 1);
    assert_eq!(store.capacity(ElementKind::Transaction), 0);
    assert_eq!(store.vertex_count(), 1);
    assert!(store.topology().vertex_transactions(a).expect("vertex").is_empty());
}

#[test]
fn test_schema_name() {
    let mut store = GraphStore::new();
    assert_eq!(store.schema(), "bare");
    store.set_schema("analytic");
    assert_eq!(store.schema(), "analytic");
}
