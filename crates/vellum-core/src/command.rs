//! Render commands and the coalescing queue that feeds the engine.
//!
//! Element-keyed commands accumulate in a map across a frame and merge
//! according to a small lattice, so a burst of updates to one element
//! reaches the engine as a single command. Unkeyed commands (selection,
//! batches, viewport) bypass merging and keep arrival order.

use crate::element::{Element, ElementId};
use crate::patch::ElementPatch;
use crate::viewport::ViewportState;
use std::collections::HashMap;

/// Scheduling priority of a render command.
///
/// Ordered ascending so `Critical` compares greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

/// A single unit of work for the render engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    CreateElement {
        element: Element,
        priority: Priority,
    },
    UpdateElement {
        id: ElementId,
        patch: ElementPatch,
        priority: Priority,
    },
    DeleteElement {
        id: ElementId,
        priority: Priority,
    },
    BatchUpdate {
        updates: Vec<(ElementId, ElementPatch)>,
        priority: Priority,
    },
    BatchDelete {
        ids: Vec<ElementId>,
        priority: Priority,
    },
    UpdateSelection {
        selected_ids: Vec<ElementId>,
        priority: Priority,
    },
    UpdateViewport {
        viewport: ViewportState,
        priority: Priority,
    },
}

impl RenderCommand {
    pub fn priority(&self) -> Priority {
        match self {
            RenderCommand::CreateElement { priority, .. }
            | RenderCommand::UpdateElement { priority, .. }
            | RenderCommand::DeleteElement { priority, .. }
            | RenderCommand::BatchUpdate { priority, .. }
            | RenderCommand::BatchDelete { priority, .. }
            | RenderCommand::UpdateSelection { priority, .. }
            | RenderCommand::UpdateViewport { priority, .. } => *priority,
        }
    }

    /// The element this command is keyed on, if it participates in merging.
    pub fn element_key(&self) -> Option<ElementId> {
        match self {
            RenderCommand::CreateElement { element, .. } => Some(element.id()),
            RenderCommand::UpdateElement { id, .. } | RenderCommand::DeleteElement { id, .. } => {
                Some(*id)
            }
            _ => None,
        }
    }

    /// Execution order within one priority band: deletes first to free
    /// identifiers, creates before updates.
    fn kind_rank(&self) -> u8 {
        match self {
            RenderCommand::DeleteElement { .. } | RenderCommand::BatchDelete { .. } => 0,
            RenderCommand::CreateElement { .. } => 1,
            _ => 2,
        }
    }
}

/// Accumulates commands between flushes, coalescing per element.
///
/// Merge lattice, by existing then incoming command type:
/// update+update merges patches, update+delete becomes delete,
/// create+update folds the patch into the snapshot, create+delete drops
/// the entry entirely, delete+create becomes a replacement (both halves
/// flush, delete first), and a pending delete absorbs updates.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: HashMap<ElementId, PendingEntry>,
    /// Keyed insertion sequence, to keep flush order stable across equal
    /// priorities and kinds.
    order: Vec<ElementId>,
    passthrough: Vec<RenderCommand>,
}

/// One pending slot per element id.
///
/// `Replace` holds a delete followed by a create for the same id (an
/// element changed type between snapshots). Both halves must reach the
/// engine, delete first, so the old node is torn down before the new one
/// materializes; a single command cannot express that.
#[derive(Debug)]
enum PendingEntry {
    Single(RenderCommand),
    Replace {
        id: ElementId,
        element: Element,
        priority: Priority,
    },
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.passthrough.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len() + self.passthrough.len()
    }

    /// Enqueue a command, merging with any pending command for the same
    /// element.
    pub fn push(&mut self, command: RenderCommand) {
        let Some(key) = command.element_key() else {
            self.passthrough.push(command);
            return;
        };

        match self.pending.remove(&key) {
            None => {
                self.order.push(key);
                self.pending.insert(key, PendingEntry::Single(command));
            }
            Some(existing) => {
                if let Some(merged) = merge_entry(existing, command) {
                    self.pending.insert(key, merged);
                } else {
                    // CREATE then DELETE: the element observably never
                    // existed, drop it from the queue.
                    self.order.retain(|id| *id != key);
                }
            }
        }
    }

    /// Drain every pending command in execution order.
    ///
    /// The queue is emptied before the commands are returned, so a handler
    /// that re-enters `push` during execution cannot corrupt this flush.
    pub fn drain(&mut self) -> Vec<RenderCommand> {
        let order = std::mem::take(&mut self.order);
        let mut pending = std::mem::take(&mut self.pending);
        let mut commands: Vec<RenderCommand> = Vec::with_capacity(order.len());
        for id in order {
            match pending.remove(&id) {
                Some(PendingEntry::Single(command)) => commands.push(command),
                Some(PendingEntry::Replace {
                    id,
                    element,
                    priority,
                }) => {
                    // Both halves share one priority, so the sort below
                    // keeps the delete ahead of the create.
                    commands.push(RenderCommand::DeleteElement { id, priority });
                    commands.push(RenderCommand::CreateElement { element, priority });
                }
                None => {}
            }
        }

        // Priority descending, then deletes < creates < updates.
        commands.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.kind_rank().cmp(&b.kind_rank()))
        });

        let mut passthrough = std::mem::take(&mut self.passthrough);
        commands.append(&mut passthrough);
        commands
    }
}

/// Merge `incoming` into the pending entry for one element key.
///
/// Returns `None` when the pair cancels out (create then delete).
fn merge_entry(existing: PendingEntry, incoming: RenderCommand) -> Option<PendingEntry> {
    use RenderCommand::*;
    match existing {
        PendingEntry::Single(DeleteElement { id, priority }) => match incoming {
            // Delete then create for one id: the element changed type and
            // must be torn down and rebuilt.
            CreateElement {
                element,
                priority: incoming_priority,
            } => Some(PendingEntry::Replace {
                id,
                element,
                priority: priority.max(incoming_priority),
            }),
            // The pending delete absorbs updates and repeated deletes.
            _ => Some(PendingEntry::Single(DeleteElement { id, priority })),
        },
        PendingEntry::Single(existing) => {
            merge_commands(existing, incoming).map(PendingEntry::Single)
        }
        PendingEntry::Replace {
            id,
            mut element,
            priority,
        } => match incoming {
            // The replacement never materialized; deleting the original
            // element still stands.
            DeleteElement {
                priority: incoming_priority,
                ..
            } => Some(PendingEntry::Single(DeleteElement {
                id,
                priority: priority.max(incoming_priority),
            })),
            UpdateElement {
                patch,
                priority: incoming_priority,
                ..
            } => {
                element.apply_patch(&patch);
                Some(PendingEntry::Replace {
                    id,
                    element,
                    priority: priority.max(incoming_priority),
                })
            }
            CreateElement {
                element: incoming_element,
                priority: incoming_priority,
            } => Some(PendingEntry::Replace {
                id,
                element: incoming_element,
                priority: priority.max(incoming_priority),
            }),
            // Unkeyed commands never reach the pending map.
            _ => Some(PendingEntry::Replace {
                id,
                element,
                priority,
            }),
        },
    }
}

/// Merge `incoming` into an existing update or create; pending deletes
/// are handled by [`merge_entry`] before this runs.
fn merge_commands(existing: RenderCommand, incoming: RenderCommand) -> Option<RenderCommand> {
    use RenderCommand::*;
    let priority = existing.priority().max(incoming.priority());
    match (existing, incoming) {
        (UpdateElement { id, mut patch, .. }, UpdateElement { patch: incoming, .. }) => {
            patch.merge(incoming);
            Some(UpdateElement { id, patch, priority })
        }
        (UpdateElement { id, .. }, DeleteElement { .. }) => Some(DeleteElement { id, priority }),

        (CreateElement { mut element, .. }, UpdateElement { patch, .. }) => {
            element.apply_patch(&patch);
            Some(CreateElement { element, priority })
        }
        (CreateElement { .. }, DeleteElement { .. }) => None,
        // A second create for the same id replaces the first.
        (CreateElement { .. }, incoming @ CreateElement { .. }) => Some(incoming),

        // Create after update: the incoming snapshot wins.
        (_, incoming) => Some(incoming),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::SerializableColor;
    use crate::patch::StylePatch;

    fn update(id: ElementId, x: f64, priority: Priority) -> RenderCommand {
        RenderCommand::UpdateElement {
            id,
            patch: ElementPatch {
                x: Some(x),
                ..Default::default()
            },
            priority,
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn test_update_update_merges() {
        let mut queue = CommandQueue::new();
        let element = Element::rect(0.0, 0.0, 10.0, 10.0);
        let id = element.id();

        queue.push(update(id, 5.0, Priority::Normal));
        queue.push(RenderCommand::UpdateElement {
            id,
            patch: ElementPatch {
                x: Some(9.0),
                style: Some(StylePatch {
                    fill: Some(Some(SerializableColor::black())),
                    ..Default::default()
                }),
                ..Default::default()
            },
            priority: Priority::Normal,
        });

        let commands = queue.drain();
        assert_eq!(commands.len(), 1);
        let RenderCommand::UpdateElement { patch, .. } = &commands[0] else {
            panic!("expected update");
        };
        assert_eq!(patch.x, Some(9.0));
        assert!(patch.style.is_some());
    }

    #[test]
    fn test_update_then_delete_is_delete() {
        let mut queue = CommandQueue::new();
        let id = ElementId::new_v4();
        queue.push(update(id, 5.0, Priority::Normal));
        queue.push(RenderCommand::DeleteElement {
            id,
            priority: Priority::Normal,
        });

        let commands = queue.drain();
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], RenderCommand::DeleteElement { .. }));
    }

    #[test]
    fn test_create_then_update_folds_into_snapshot() {
        let mut queue = CommandQueue::new();
        let element = Element::rect(0.0, 0.0, 10.0, 10.0);
        let id = element.id();
        queue.push(RenderCommand::CreateElement {
            element,
            priority: Priority::Normal,
        });
        queue.push(update(id, 42.0, Priority::Normal));

        let commands = queue.drain();
        assert_eq!(commands.len(), 1);
        let RenderCommand::CreateElement { element, .. } = &commands[0] else {
            panic!("expected create");
        };
        assert!((element.common().x - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_create_then_delete_cancels() {
        let mut queue = CommandQueue::new();
        let element = Element::rect(0.0, 0.0, 10.0, 10.0);
        let id = element.id();
        queue.push(RenderCommand::CreateElement {
            element,
            priority: Priority::Normal,
        });
        queue.push(RenderCommand::DeleteElement {
            id,
            priority: Priority::Normal,
        });

        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_delete_then_create_keeps_both() {
        // An element that changed type arrives as a delete plus a create
        // under the same id; the flush must carry both, delete first.
        let mut queue = CommandQueue::new();
        let mut circle = Element::circle(0.0, 0.0, 10.0, 10.0);
        let id = ElementId::new_v4();
        circle.common_mut().id = id;

        queue.push(RenderCommand::DeleteElement {
            id,
            priority: Priority::Normal,
        });
        queue.push(RenderCommand::CreateElement {
            element: circle,
            priority: Priority::Normal,
        });

        let commands = queue.drain();
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], RenderCommand::DeleteElement { .. }));
        let RenderCommand::CreateElement { element, .. } = &commands[1] else {
            panic!("expected create after delete");
        };
        assert_eq!(element.id(), id);
    }

    #[test]
    fn test_replacement_then_delete_collapses_to_delete() {
        // The replacement never materialized, but the original element is
        // live and still has to be deleted.
        let mut queue = CommandQueue::new();
        let mut circle = Element::circle(0.0, 0.0, 10.0, 10.0);
        let id = ElementId::new_v4();
        circle.common_mut().id = id;

        queue.push(RenderCommand::DeleteElement {
            id,
            priority: Priority::Normal,
        });
        queue.push(RenderCommand::CreateElement {
            element: circle,
            priority: Priority::Normal,
        });
        queue.push(RenderCommand::DeleteElement {
            id,
            priority: Priority::Normal,
        });

        let commands = queue.drain();
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], RenderCommand::DeleteElement { .. }));
    }

    #[test]
    fn test_replacement_folds_later_updates() {
        let mut queue = CommandQueue::new();
        let mut circle = Element::circle(0.0, 0.0, 10.0, 10.0);
        let id = ElementId::new_v4();
        circle.common_mut().id = id;

        queue.push(RenderCommand::DeleteElement {
            id,
            priority: Priority::Normal,
        });
        queue.push(RenderCommand::CreateElement {
            element: circle,
            priority: Priority::Normal,
        });
        queue.push(update(id, 42.0, Priority::Normal));

        let commands = queue.drain();
        assert_eq!(commands.len(), 2);
        let RenderCommand::CreateElement { element, .. } = &commands[1] else {
            panic!("expected create carrying the folded update");
        };
        assert!((element.common().x - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delete_absorbs_later_commands() {
        let mut queue = CommandQueue::new();
        let id = ElementId::new_v4();
        queue.push(RenderCommand::DeleteElement {
            id,
            priority: Priority::Normal,
        });
        queue.push(update(id, 5.0, Priority::High));

        let commands = queue.drain();
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], RenderCommand::DeleteElement { .. }));
    }

    #[test]
    fn test_flush_order_priority_then_kind() {
        let mut queue = CommandQueue::new();
        let low = Element::rect(0.0, 0.0, 10.0, 10.0);
        let high_id = ElementId::new_v4();
        let delete_id = ElementId::new_v4();

        queue.push(RenderCommand::CreateElement {
            element: low,
            priority: Priority::Low,
        });
        queue.push(update(high_id, 1.0, Priority::High));
        queue.push(RenderCommand::DeleteElement {
            id: delete_id,
            priority: Priority::High,
        });

        let commands = queue.drain();
        assert_eq!(commands.len(), 3);
        // High-priority band first, deletes ahead of updates within it.
        assert!(matches!(commands[0], RenderCommand::DeleteElement { .. }));
        assert!(matches!(commands[1], RenderCommand::UpdateElement { .. }));
        assert!(matches!(commands[2], RenderCommand::CreateElement { .. }));
    }

    #[test]
    fn test_unkeyed_commands_keep_arrival_order() {
        let mut queue = CommandQueue::new();
        queue.push(RenderCommand::UpdateSelection {
            selected_ids: vec![],
            priority: Priority::High,
        });
        queue.push(RenderCommand::UpdateViewport {
            viewport: ViewportState::default(),
            priority: Priority::Critical,
        });

        let commands = queue.drain();
        assert!(matches!(commands[0], RenderCommand::UpdateSelection { .. }));
        assert!(matches!(commands[1], RenderCommand::UpdateViewport { .. }));
    }

    #[test]
    fn test_merged_command_keeps_highest_priority() {
        let mut queue = CommandQueue::new();
        let id = ElementId::new_v4();
        queue.push(update(id, 1.0, Priority::Low));
        queue.push(update(id, 2.0, Priority::Critical));

        let commands = queue.drain();
        assert_eq!(commands[0].priority(), Priority::Critical);
    }
}
