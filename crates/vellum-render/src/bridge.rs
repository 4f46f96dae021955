//! State-diff bridge: observes store snapshots and feeds the engine.
//!
//! On every store change the bridge compares the new snapshot against the
//! previous one slice by slice. Unchanged slices keep their `Arc` pointer
//! identity, so the comparison short-circuits before any structural diff
//! runs. Changed element slices produce minimal keyed commands through the
//! coalescing queue; viewport and temp-element changes bypass the queue
//! and reach the engine immediately.

use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use vellum_core::{
    diff_elements, CommandQueue, DocumentStore, Element, ElementId, Priority, RenderCommand,
    StoreSnapshot, Subscription,
};

use crate::engine::RenderEngine;
use crate::scheduler::{FlushDecision, RenderScheduler};

pub struct RenderBridge {
    engine: RenderEngine,
    queue: CommandQueue,
    scheduler: RenderScheduler,
    prev: StoreSnapshot,
}

impl RenderBridge {
    pub fn new(engine: RenderEngine) -> Self {
        Self {
            engine,
            queue: CommandQueue::new(),
            scheduler: RenderScheduler::new(),
            prev: StoreSnapshot::default(),
        }
    }

    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut RenderEngine {
        &mut self.engine
    }

    /// Subscribe a shared bridge to a store and prime it with the current
    /// state. Dropping the returned subscription detaches it.
    pub fn attach(bridge: Rc<RefCell<RenderBridge>>, store: &dyn DocumentStore) -> Subscription {
        bridge.borrow_mut().observe(&store.state());
        let weak = Rc::downgrade(&bridge);
        store.subscribe(Box::new(move |snapshot| {
            if let Some(bridge) = weak.upgrade() {
                bridge.borrow_mut().observe(snapshot);
            }
        }))
    }

    /// Process one store snapshot.
    pub fn observe(&mut self, snapshot: &StoreSnapshot) {
        let mut highest: Option<Priority> = None;
        let mut bump = |priority: Priority, highest: &mut Option<Priority>| {
            *highest = Some(highest.map_or(priority, |h| h.max(priority)));
        };

        if !Arc::ptr_eq(&self.prev.elements, &snapshot.elements) {
            if let Some(priority) = self.diff_element_slice(&snapshot.elements) {
                bump(priority, &mut highest);
            }
        }

        if !Arc::ptr_eq(&self.prev.selected_ids, &snapshot.selected_ids)
            && *self.prev.selected_ids != *snapshot.selected_ids
        {
            self.queue.push(RenderCommand::UpdateSelection {
                selected_ids: snapshot.selected_ids.as_ref().clone(),
                priority: Priority::High,
            });
            bump(Priority::High, &mut highest);
        }

        // Viewport and temp element preempt: straight to the engine, no
        // queueing, no frame wait.
        if !Arc::ptr_eq(&self.prev.viewport, &snapshot.viewport)
            && *self.prev.viewport != *snapshot.viewport
        {
            self.engine
                .execute_all(vec![RenderCommand::UpdateViewport {
                    viewport: snapshot.viewport.as_ref().clone(),
                    priority: Priority::Critical,
                }]);
        }

        let temp_changed = match (&self.prev.temp_element, &snapshot.temp_element) {
            (None, None) => false,
            (Some(prev), Some(next)) => !Arc::ptr_eq(prev, next) && **prev != **next,
            _ => true,
        };
        if temp_changed {
            self.engine
                .set_temp_element(snapshot.temp_element.as_deref());
        }

        self.prev = snapshot.clone();

        if let Some(priority) = highest {
            match self.scheduler.request(priority) {
                FlushDecision::Immediate => self.flush(),
                FlushDecision::Scheduled | FlushDecision::AlreadyScheduled => {}
            }
        }
    }

    /// Keyed diff of the element map. Returns the highest priority queued.
    fn diff_element_slice(
        &mut self,
        next: &Arc<HashMap<ElementId, Element>>,
    ) -> Option<Priority> {
        let prev = Arc::clone(&self.prev.elements);
        let mut queued = None;
        let mut bump = |priority: Priority, queued: &mut Option<Priority>| {
            *queued = Some(queued.map_or(priority, |q: Priority| q.max(priority)));
        };

        for (id, prev_element) in prev.iter() {
            if !next.contains_key(id) {
                self.queue.push(RenderCommand::DeleteElement {
                    id: *id,
                    priority: Priority::Normal,
                });
                bump(Priority::Normal, &mut queued);
            } else if let Some(next_element) = next.get(id) {
                if prev_element.element_type() != next_element.element_type() {
                    // A type change is a delete plus a create.
                    self.queue.push(RenderCommand::DeleteElement {
                        id: *id,
                        priority: Priority::Normal,
                    });
                    self.queue.push(RenderCommand::CreateElement {
                        element: next_element.clone(),
                        priority: Priority::Normal,
                    });
                    bump(Priority::Normal, &mut queued);
                } else if let Some(patch) = diff_elements(prev_element, next_element) {
                    debug!("UPDATE {id}: {patch:?}");
                    self.queue.push(RenderCommand::UpdateElement {
                        id: *id,
                        patch,
                        priority: Priority::Normal,
                    });
                    bump(Priority::Normal, &mut queued);
                }
            }
        }

        for (id, element) in next.iter() {
            if !prev.contains_key(id) {
                self.queue.push(RenderCommand::CreateElement {
                    element: element.clone(),
                    priority: Priority::Normal,
                });
                bump(Priority::Normal, &mut queued);
            }
        }
        queued
    }

    /// Host frame tick: run the pending flush, if one was scheduled.
    pub fn on_frame(&mut self) {
        if self.scheduler.begin_frame() {
            self.flush();
        }
        self.engine.viewport_mut().tick();
    }

    /// Drain the queue and execute everything in coalesced order.
    pub fn flush(&mut self) {
        let commands = self.queue.drain();
        if !commands.is_empty() {
            debug!("Flushing {} commands", commands.len());
            self.engine.execute_all(commands);
        }
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }
}
