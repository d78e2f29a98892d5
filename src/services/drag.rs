use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use super::anchor_layout::Point;

pub type PanelPosition = Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragPhase {
    Idle,
    /// `offset` is the pointer position relative to the panel origin at pointer-down.
    Dragging { offset: Point },
}

struct DragSlot {
    phase: DragPhase,
    position: PanelPosition,
}

/// Pointer-driven repositioning of the panel.
///
/// The host should only route pointer-move/up events here while
/// [`DragController::is_dragging`] is true; moves while idle are ignored.
pub struct DragController {
    slot: Mutex<DragSlot>,
    changed: watch::Sender<PanelPosition>,
}

impl DragController {
    pub fn new(initial: PanelPosition) -> Self {
        let (changed, _) = watch::channel(initial);
        Self {
            slot: Mutex::new(DragSlot {
                phase: DragPhase::Idle,
                position: initial,
            }),
            changed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, DragSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, position: PanelPosition) {
        self.changed.send_if_modified(|current| {
            if *current == position {
                return false;
            }
            *current = position;
            true
        });
    }

    /// Pointer-down on the header: start dragging.
    pub fn pointer_down(&self, pointer: Point) {
        let mut slot = self.lock();
        let offset = pointer - slot.position;
        slot.phase = DragPhase::Dragging { offset };
    }

    /// Returns `true` if the panel moved.
    pub fn pointer_move(&self, pointer: Point) -> bool {
        let mut slot = self.lock();
        let DragPhase::Dragging { offset } = slot.phase else {
            return false;
        };
        let next = pointer - offset;
        if next == slot.position {
            return false;
        }
        slot.position = next;
        self.publish(next);
        true
    }

    /// Pointer-up anywhere ends the drag.
    pub fn pointer_up(&self) {
        self.lock().phase = DragPhase::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.lock().phase, DragPhase::Dragging { .. })
    }

    pub fn phase(&self) -> DragPhase {
        self.lock().phase
    }

    pub fn position(&self) -> PanelPosition {
        self.lock().position
    }

    /// Jump to `position`, abandoning any drag in progress.
    pub fn reset(&self, position: PanelPosition) {
        let mut slot = self.lock();
        slot.phase = DragPhase::Idle;
        slot.position = position;
        self.publish(position);
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelPosition> {
        self.changed.subscribe()
    }
}
