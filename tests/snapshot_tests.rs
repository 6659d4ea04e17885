use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use snapgraph::{
    ArchiveConfig, AttributeValue, CommitOutcome, ControllerState, ElementKind, GRAPH_ELEMENT,
    GraphError, GraphStore, SnapshotController, type_names,
};

fn labelled_controller() -> (SnapshotController, usize) {
    let controller = SnapshotController::new(GraphStore::new());
    let vertex = controller
        .write(|g| {
            let label = g.ensure_attribute(ElementKind::Vertex, "Label", type_names::STRING, "")?;
            let v = g.add_vertex();
            g.set(label, v, "before")?;
            Ok(v)
        })
        .expect("seed");
    (controller, vertex)
}

fn label_of(store: &GraphStore, vertex: usize) -> String {
    store
        .get_by_name(ElementKind::Vertex, "Label", vertex)
        .expect("label")
        .as_str()
        .map(str::to_string)
        .unwrap_or_default()
}

#[test]
fn test_reader_keeps_pre_commit_view() {
    let (controller, v) = labelled_controller();
    let old = controller.acquire_read();

    let mut writer = controller.acquire_write();
    let label = writer.attribute(ElementKind::Vertex, "Label").expect("label");
    writer.set(label, v, "after").expect("set");
    let extra = writer.add_vertex();
    assert!(matches!(writer.commit(), CommitOutcome::Published { .. }));

    let new = controller.acquire_read();
    assert_eq!(label_of(&old, v), "before");
    assert_eq!(old.vertex_count(), 1);
    assert!(!old.exists(ElementKind::Vertex, extra));
    assert_eq!(label_of(&new, v), "after");
    assert_eq!(new.vertex_count(), 2);
    assert!(new.sequence() > old.sequence());
}

#[test]
fn test_writer_does_not_leak_before_commit() {
    let (controller, v) = labelled_controller();
    let mut writer = controller.acquire_write();
    let label = writer.attribute(ElementKind::Vertex, "Label").expect("label");
    writer.set(label, v, "pending").expect("set");

    let during = controller.acquire_read();
    assert_eq!(label_of(&during, v), "before");
    writer.commit();
    assert_eq!(label_of(&during, v), "before");
    assert_eq!(label_of(&controller.acquire_read(), v), "pending");
}

#[test]
fn test_rollback_restores_pre_write_state() {
    let (controller, v) = labelled_controller();
    let sequence = controller.sequence();

    let mut writer = controller.acquire_write();
    let label = writer.attribute(ElementKind::Vertex, "Label").expect("label");
    writer.set(label, v, "discarded").expect("set");
    writer.remove_vertex(v).expect("remove");
    writer
        .add_attribute(ElementKind::Transaction, "weight", type_names::DOUBLE, 1.0)
        .expect("add");
    writer.rollback();

    let read = controller.acquire_read();
    assert_eq!(controller.sequence(), sequence);
    assert_eq!(controller.state(), ControllerState::Idle);
    assert_eq!(read.vertex_count(), 1);
    assert_eq!(label_of(&read, v), "before");
    assert_eq!(read.attribute_count(ElementKind::Transaction), 0);
}

#[test]
fn test_failed_scoped_write_rolls_back() {
    let (controller, v) = labelled_controller();
    let result: Result<(), GraphError> = controller.write(|g| {
        let label = g.attribute(ElementKind::Vertex, "Label").expect("label");
        g.set(label, v, "half done")?;
        g.add_transaction(v, 404, true)?;
        Ok(())
    });
    assert!(matches!(result, Err(GraphError::UnknownElement(_))));
    assert_eq!(label_of(&controller.acquire_read(), v), "before");
    assert_eq!(controller.state(), ControllerState::Idle);
}

#[test]
fn test_dropped_write_handle_rolls_back() {
    let (controller, v) = labelled_controller();
    {
        let mut writer = controller.acquire_write();
        writer.add_vertex();
        assert_eq!(controller.state(), ControllerState::Writing);
    }
    assert_eq!(controller.state(), ControllerState::Idle);
    assert_eq!(controller.acquire_read().vertex_count(), 1);
    assert_eq!(label_of(&controller.acquire_read(), v), "before");
}

#[test]
fn test_second_writer_is_busy() {
    let controller = SnapshotController::new(GraphStore::new());
    let first = controller.try_acquire_write().expect("first writer");
    let busy = controller.try_acquire_write();
    assert!(matches!(busy, Err(GraphError::WriteBusy(_))));
    let err = controller
        .acquire_write_timeout(Duration::from_millis(20))
        .expect_err("timeout");
    assert!(err.is_retryable());
    first.rollback();
    assert!(controller.try_acquire_write().is_ok());
}

#[test]
fn test_blocking_writer_waits_for_release() {
    let controller = SnapshotController::new(GraphStore::new());
    thread::scope(|scope| {
        let mut first = controller.acquire_write();
        first.add_vertex();
        let waiter = scope.spawn(|| {
            let mut second = controller.acquire_write();
            assert_eq!(second.vertex_count(), 1);
            second.add_vertex();
            second.commit()
        });
        thread::sleep(Duration::from_millis(20));
        first.commit();
        let outcome = waiter.join().expect("join");
        assert_eq!(outcome, CommitOutcome::Published { sequence: 2 });
    });
    assert_eq!(controller.acquire_read().vertex_count(), 2);
}

#[test]
fn test_unchanged_commit_publishes_nothing() {
    let (controller, _) = labelled_controller();
    let before = controller.acquire_read();
    let writer = controller.acquire_write();
    assert_eq!(writer.commit(), CommitOutcome::Unchanged);
    assert_eq!(controller.acquire_read().sequence(), before.sequence());
}

#[test]
fn test_commits_apply_in_order() {
    let controller = SnapshotController::new(GraphStore::new());
    let mut sequences = Vec::new();
    for _ in 0..5 {
        let mut writer = controller.acquire_write();
        writer.add_vertex();
        match writer.commit() {
            CommitOutcome::Published { sequence } => sequences.push(sequence),
            CommitOutcome::Unchanged => panic!("vertex added but nothing published"),
        }
    }
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    assert_eq!(controller.acquire_read().vertex_count(), 5);
}

#[test]
fn test_standby_pinned_by_reader_is_not_reused() {
    let (controller, v) = labelled_controller();
    let pinned = controller.acquire_read();
    controller
        .write(|g| {
            let label = g.attribute(ElementKind::Vertex, "Label").expect("label");
            g.set(label, v, "one")
        })
        .expect("first");
    assert_eq!(controller.standby_readers(), Some(1));
    controller
        .write(|g| {
            let label = g.attribute(ElementKind::Vertex, "Label").expect("label");
            g.set(label, v, "two")
        })
        .expect("second");
    assert_eq!(label_of(&pinned, v), "before");
    assert_eq!(label_of(&controller.acquire_read(), v), "two");
}

#[test]
fn test_concurrent_readers_never_see_partial_writes() {
    let controller = SnapshotController::new(GraphStore::new());
    controller
        .write(|g| {
            g.add_attribute(ElementKind::Graph, "vertices", type_names::LONG, 0i64)?;
            Ok(())
        })
        .expect("seed");
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let snapshot = controller.acquire_read();
                    let recorded = snapshot
                        .get_by_name(ElementKind::Graph, "vertices", GRAPH_ELEMENT)
                        .expect("counter");
                    assert_eq!(
                        recorded,
                        AttributeValue::Long(snapshot.vertex_count() as i64)
                    );
                }
            });
        }
        for _ in 0..100 {
            controller
                .write(|g| {
                    g.add_vertex();
                    let counter = g.attribute(ElementKind::Graph, "vertices").expect("counter");
                    g.set(counter, GRAPH_ELEMENT, g.vertex_count() as i64)
                })
                .expect("write");
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(controller.acquire_read().vertex_count(), 100);
}

#[test]
fn test_failed_archive_load_keeps_active_store() {
    let (controller, v) = labelled_controller();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.sgr");
    std::fs::write(&path, b"definitely not an archive").expect("write");

    let result = controller.load_archive(&path, &ArchiveConfig::default());
    assert!(matches!(result, Err(GraphError::CorruptArchive(_))));
    assert_eq!(controller.sequence(), 1);
    assert_eq!(label_of(&controller.acquire_read(), v), "before");
}
