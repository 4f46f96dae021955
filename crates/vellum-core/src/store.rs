//! Document store contract consumed by the render bridge.
//!
//! The store holds the application state (elements, selection, viewport,
//! live drawing preview). Snapshots share their collections behind `Arc`
//! so an unchanged slice keeps its pointer identity across snapshots and
//! observers can short-circuit with a cheap pointer comparison.

use crate::element::{Element, ElementId};
use crate::viewport::ViewportState;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable view of the document state at one instant.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub elements: Arc<HashMap<ElementId, Element>>,
    pub selected_ids: Arc<Vec<ElementId>>,
    pub viewport: Arc<ViewportState>,
    /// Live preview element while the user is drawing, not yet committed.
    pub temp_element: Option<Arc<Element>>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            elements: Arc::new(HashMap::new()),
            selected_ids: Arc::new(Vec::new()),
            viewport: Arc::new(ViewportState::default()),
            temp_element: None,
        }
    }
}

/// Callback invoked with the full new snapshot on every store change.
pub type StoreListener = Box<dyn FnMut(&StoreSnapshot)>;

/// Handle returned by [`DocumentStore::subscribe`]; dropping it
/// unsubscribes the listener.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// The contract the bridge requires from the host application's store.
///
/// Listeners receive the whole snapshot; deciding which parts changed is
/// the observer's job, not the store's.
pub trait DocumentStore {
    fn state(&self) -> StoreSnapshot;
    fn subscribe(&self, listener: StoreListener) -> Subscription;
}

/// Reference single-threaded store, used by the app shell and in tests.
///
/// Mutations rebuild only the collections they touch, preserving `Arc`
/// identity for everything else.
#[derive(Default)]
pub struct MemoryStore {
    inner: std::rc::Rc<std::cell::RefCell<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    snapshot: StoreSnapshot,
    listeners: HashMap<u64, StoreListener>,
    next_listener_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the snapshot through `f` and notify listeners.
    pub fn update(&self, f: impl FnOnce(&mut StoreSnapshot)) {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            f(&mut inner.snapshot);
            inner.snapshot.clone()
        };
        // Listener map is copied out so a listener may subscribe or drop
        // subscriptions without deadlocking the borrow.
        let ids: Vec<u64> = self.inner.borrow().listeners.keys().copied().collect();
        for id in ids {
            let listener = self.inner.borrow_mut().listeners.remove(&id);
            if let Some(mut listener) = listener {
                listener(&snapshot);
                self.inner.borrow_mut().listeners.insert(id, listener);
            }
        }
    }

    pub fn insert_element(&self, element: Element) {
        self.update(|snapshot| {
            let elements = Arc::make_mut(&mut snapshot.elements);
            elements.insert(element.id(), element);
        });
    }

    pub fn remove_element(&self, id: ElementId) {
        self.update(|snapshot| {
            Arc::make_mut(&mut snapshot.elements).remove(&id);
            if snapshot.selected_ids.contains(&id) {
                Arc::make_mut(&mut snapshot.selected_ids).retain(|sel| *sel != id);
            }
        });
    }

    pub fn set_selection(&self, ids: Vec<ElementId>) {
        self.update(|snapshot| {
            snapshot.selected_ids = Arc::new(ids);
        });
    }

    pub fn set_viewport(&self, viewport: ViewportState) {
        self.update(|snapshot| {
            snapshot.viewport = Arc::new(viewport);
        });
    }

    pub fn set_temp_element(&self, element: Option<Element>) {
        self.update(|snapshot| {
            snapshot.temp_element = element.map(Arc::new);
        });
    }
}

impl DocumentStore for MemoryStore {
    fn state(&self) -> StoreSnapshot {
        self.inner.borrow().snapshot.clone()
    }

    fn subscribe(&self, listener: StoreListener) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.insert(id, listener);
            id
        };
        let weak = std::rc::Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.remove(&id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_unchanged_collections_keep_identity() {
        let store = MemoryStore::new();
        store.insert_element(Element::rect(0.0, 0.0, 10.0, 10.0));

        let before = store.state();
        store.set_selection(vec![ElementId::new_v4()]);
        let after = store.state();

        assert!(Arc::ptr_eq(&before.elements, &after.elements));
        assert!(!Arc::ptr_eq(&before.selected_ids, &after.selected_ids));
    }

    #[test]
    fn test_listener_receives_snapshot() {
        let store = MemoryStore::new();
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let _sub = store.subscribe(Box::new(move |snapshot| {
            seen.set(snapshot.elements.len());
        }));

        store.insert_element(Element::rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let store = MemoryStore::new();
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let sub = store.subscribe(Box::new(move |_| {
            seen.set(seen.get() + 1);
        }));

        store.insert_element(Element::rect(0.0, 0.0, 10.0, 10.0));
        drop(sub);
        store.insert_element(Element::rect(5.0, 5.0, 10.0, 10.0));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_remove_element_clears_selection() {
        let store = MemoryStore::new();
        let element = Element::rect(0.0, 0.0, 10.0, 10.0);
        let id = element.id();
        store.insert_element(element);
        store.set_selection(vec![id]);

        store.remove_element(id);
        assert!(store.state().selected_ids.is_empty());
        assert!(store.state().elements.is_empty());
    }
}
