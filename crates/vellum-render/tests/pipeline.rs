//! End-to-end scenarios across the store, bridge, engine and geometry.

use std::sync::Arc;
use vellum_core::{
    geometry::aabb_of, geometry::world_outline, DocumentStore, Element, MemoryStore,
    SerializableColor,
};
use vellum_render::{NodeKind, RenderBridge, RenderEngine};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One store commit updating one element and creating another yields
/// exactly one UPDATE and one CREATE in the same frame, nothing else.
#[test]
fn update_and_create_in_one_frame() {
    init_logging();
    let mut bridge = RenderBridge::new(RenderEngine::default());
    let store = MemoryStore::new();

    let existing = Element::rect(0.0, 0.0, 100.0, 100.0);
    let existing_id = existing.id();
    store.insert_element(existing.clone());
    bridge.observe(&store.state());
    bridge.on_frame();
    assert_eq!(bridge.engine().node_count(), 1);

    // Single commit: move the old element and add a new one.
    let added = Element::circle(200.0, 200.0, 50.0, 50.0);
    let added_id = added.id();
    store.update(|snapshot| {
        let elements = Arc::make_mut(&mut snapshot.elements);
        if let Some(element) = elements.get_mut(&existing_id) {
            element.common_mut().x = 500.0;
        }
        elements.insert(added_id, added.clone());
    });

    bridge.observe(&store.state());
    assert_eq!(bridge.pending_commands(), 2);
    bridge.on_frame();

    assert_eq!(bridge.engine().node_count(), 2);
    let moved = bridge.engine().element(existing_id).unwrap();
    assert!((moved.common().x - 500.0).abs() < f64::EPSILON);
    assert!(bridge.engine().node(added_id).is_some());
}

/// Two elements rotated 45 degrees select with one oriented box whose
/// area never exceeds the axis-aligned union box.
#[test]
fn rotated_multi_selection_box_is_tight() {
    init_logging();
    let mut bridge = RenderBridge::new(RenderEngine::default());
    let store = MemoryStore::new();

    let a = Element::rect(0.0, 0.0, 100.0, 40.0).with_rotation(45.0);
    let b = Element::rect(150.0, 150.0, 100.0, 40.0).with_rotation(45.0);
    let (id_a, id_b) = (a.id(), b.id());
    store.insert_element(a.clone());
    store.insert_element(b.clone());
    bridge.observe(&store.state());
    bridge.on_frame();

    store.set_selection(vec![id_a, id_b]);
    bridge.observe(&store.state());

    let obb = bridge
        .engine()
        .selection_box()
        .expect("multi selection draws one box")
        .clone();

    let resolve = |_| None;
    let mut points = world_outline(&a, &resolve);
    points.extend(world_outline(&b, &resolve));
    let aabb = aabb_of(&points).unwrap();
    assert!(obb.area() <= aabb.area() + 1e-6);
    // Both shapes lean the same way, so the tight box is truly rotated.
    assert!(obb.rotation.abs() > 1e-6);
}

/// A burst of edits followed by a delete leaves no trace of the element.
#[test]
fn coalesced_edits_then_delete_leave_no_orphans() {
    init_logging();
    let mut bridge = RenderBridge::new(RenderEngine::default());
    let store = MemoryStore::new();

    let element = Element::rect(0.0, 0.0, 100.0, 100.0);
    let id = element.id();
    store.insert_element(element.clone());
    bridge.observe(&store.state());
    bridge.on_frame();

    for i in 1..=5 {
        let mut edited = element.clone();
        edited.common_mut().x = i as f64;
        store.insert_element(edited);
        bridge.observe(&store.state());
    }
    store.remove_element(id);
    bridge.observe(&store.state());
    // The pending updates merged with the delete: one command remains.
    assert_eq!(bridge.pending_commands(), 1);

    bridge.on_frame();
    assert!(bridge.engine().node(id).is_none());
    assert!(bridge.engine().element(id).is_none());
    assert_eq!(bridge.engine().node_count(), 0);
}

/// Create-then-delete within one frame is observably nothing.
#[test]
fn create_then_delete_within_frame_never_materializes() {
    init_logging();
    let mut bridge = RenderBridge::new(RenderEngine::default());
    let store = MemoryStore::new();

    let flash = Element::rect(0.0, 0.0, 10.0, 10.0);
    let id = flash.id();
    store.insert_element(flash);
    bridge.observe(&store.state());
    store.remove_element(id);
    bridge.observe(&store.state());

    assert_eq!(bridge.pending_commands(), 0);
    bridge.on_frame();
    assert!(bridge.engine().node(id).is_none());
}

/// A style-only change patches paint without disturbing the transform.
#[test]
fn style_change_keeps_node_transform() {
    init_logging();
    let mut bridge = RenderBridge::new(RenderEngine::default());
    let store = MemoryStore::new();

    let element = Element::rect(40.0, 40.0, 100.0, 100.0).with_rotation(15.0);
    let id = element.id();
    store.insert_element(element.clone());
    bridge.observe(&store.state());
    bridge.on_frame();
    let transform_before = bridge.engine().node(id).unwrap().transform;

    let mut restyled = element;
    restyled.style_mut().unwrap().fill = Some(SerializableColor::from_hex("#22cc88"));
    store.insert_element(restyled);
    bridge.observe(&store.state());
    bridge.on_frame();

    let node = bridge.engine().node(id).unwrap();
    assert_eq!(node.transform, transform_before);
    let NodeKind::Path(content) = &node.kind else {
        panic!("expected path node");
    };
    assert!(content.fill.is_some());
}

/// Selection survives element churn: deleting one of two selected
/// elements downgrades the overlay from multi to single.
#[test]
fn selection_overlay_tracks_deletions() {
    init_logging();
    let mut bridge = RenderBridge::new(RenderEngine::default());
    let store = MemoryStore::new();

    let a = Element::rect(0.0, 0.0, 50.0, 50.0);
    let b = Element::rect(100.0, 0.0, 50.0, 50.0);
    let (id_a, id_b) = (a.id(), b.id());
    store.insert_element(a);
    store.insert_element(b);
    bridge.observe(&store.state());
    bridge.on_frame();

    store.set_selection(vec![id_a, id_b]);
    bridge.observe(&store.state());
    assert_eq!(bridge.engine().selection_overlay().len(), 1);

    store.remove_element(id_b);
    bridge.observe(&store.state());
    bridge.on_frame();
    // Single remaining selection draws box plus handles.
    assert_eq!(bridge.engine().selection_overlay().len(), 10);
}
