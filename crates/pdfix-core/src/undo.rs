//! Per-page undo history
//!
//! Each page keeps a bounded stack of scene snapshots captured immediately
//! before a mutating action. Restoring a snapshot replaces the live scene
//! programmatically, and that replacement must not be recorded as a new
//! action: capture is disabled for as long as a [`SuppressGuard`] is alive.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::trace;

use crate::scene::PageScene;

pub const DEFAULT_UNDO_DEPTH: usize = 30;

#[derive(Debug)]
pub struct UndoLog {
    capacity: usize,
    stacks: HashMap<u32, VecDeque<PageScene>>,
    suppressed: Rc<Cell<usize>>,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

impl UndoLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            stacks: HashMap::new(),
            suppressed: Rc::new(Cell::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push `live` as the state before the action about to happen on `page`.
    ///
    /// Returns `false` without recording anything while suppressed. The
    /// oldest snapshot is evicted once the page's stack is full.
    pub fn snapshot(&mut self, page: u32, live: &PageScene) -> bool {
        if self.is_suppressed() {
            trace!(page, "undo capture suppressed");
            return false;
        }
        let stack = self.stacks.entry(page).or_default();
        stack.push_back(live.clone());
        if stack.len() > self.capacity {
            stack.pop_front();
        }
        trace!(page, depth = stack.len(), "undo snapshot");
        true
    }

    /// Pop the most recent snapshot for `page`. An empty history is a no-op.
    pub fn undo(&mut self, page: u32) -> Option<PageScene> {
        self.stacks.get_mut(&page).and_then(VecDeque::pop_back)
    }

    /// Disable capture until the returned guard is dropped.
    pub fn suppress(&self) -> SuppressGuard {
        self.suppressed.set(self.suppressed.get() + 1);
        SuppressGuard {
            depth: Rc::clone(&self.suppressed),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed.get() > 0
    }

    pub fn depth(&self, page: u32) -> usize {
        self.stacks.get(&page).map_or(0, VecDeque::len)
    }

    pub fn clear_page(&mut self, page: u32) {
        self.stacks.remove(&page);
    }

    pub fn clear_all(&mut self) {
        self.stacks.clear();
    }
}

/// Scoped suppression of undo capture. Dropping it (on any exit path)
/// restores the previous capture behavior.
#[must_use = "capture is only suppressed while the guard is alive"]
#[derive(Debug)]
pub struct SuppressGuard {
    depth: Rc<Cell<usize>>,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Makes one continuous gesture produce exactly one snapshot no matter how
/// many intermediate move or resize events it emits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GestureLatch {
    taken: bool,
}

impl GestureLatch {
    /// `true` for the first event of the current gesture only.
    pub fn first_event(&mut self) -> bool {
        !std::mem::replace(&mut self.taken, true)
    }

    pub fn end(&mut self) {
        self.taken = false;
    }

    pub fn is_taken(&self) -> bool {
        self.taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Bounds;
    use crate::scene::{RedactionObject, SceneObject};

    fn scene_with(n: usize) -> PageScene {
        PageScene::from_objects(
            (0..n)
                .map(|i| {
                    SceneObject::Redaction(RedactionObject::new(Bounds::new(
                        i as f64, 0.0, 1.0, 1.0,
                    )))
                })
                .collect(),
        )
    }

    #[test]
    fn test_undo_on_empty_history_is_noop() {
        let mut log = UndoLog::default();
        assert!(log.undo(1).is_none());
        assert_eq!(log.depth(1), 0);
    }

    #[test]
    fn test_undo_returns_most_recent_first() {
        let mut log = UndoLog::default();
        log.snapshot(1, &scene_with(0));
        log.snapshot(1, &scene_with(1));
        assert_eq!(log.undo(1), Some(scene_with(1)));
        assert_eq!(log.undo(1), Some(scene_with(0)));
        assert_eq!(log.undo(1), None);
    }

    #[test]
    fn test_pages_are_independent() {
        let mut log = UndoLog::default();
        log.snapshot(1, &scene_with(1));
        assert!(log.undo(2).is_none());
        assert_eq!(log.depth(1), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = UndoLog::new(3);
        for i in 0..5 {
            log.snapshot(1, &scene_with(i));
        }
        assert_eq!(log.depth(1), 3);
        assert_eq!(log.undo(1), Some(scene_with(4)));
        assert_eq!(log.undo(1), Some(scene_with(3)));
        assert_eq!(log.undo(1), Some(scene_with(2)));
        assert_eq!(log.undo(1), None);
    }

    #[test]
    fn test_default_capacity_is_thirty() {
        let mut log = UndoLog::default();
        for i in 0..40 {
            log.snapshot(1, &scene_with(i));
        }
        assert_eq!(log.depth(1), DEFAULT_UNDO_DEPTH);
    }

    #[test]
    fn test_snapshot_suppressed_while_guard_alive() {
        let mut log = UndoLog::default();
        {
            let _guard = log.suppress();
            assert!(!log.snapshot(1, &scene_with(1)));
        }
        assert!(log.snapshot(1, &scene_with(1)));
        assert_eq!(log.depth(1), 1);
    }

    #[test]
    fn test_nested_guards() {
        let log = UndoLog::default();
        let outer = log.suppress();
        let inner = log.suppress();
        drop(inner);
        assert!(log.is_suppressed());
        drop(outer);
        assert!(!log.is_suppressed());
    }

    #[test]
    fn test_guard_released_on_error_path() {
        let mut log = UndoLog::default();
        let failing_restore = |log: &UndoLog| -> Result<(), String> {
            let _guard = log.suppress();
            Err("restore failed".to_string())
        };
        assert!(failing_restore(&log).is_err());
        assert!(!log.is_suppressed());
        assert!(log.snapshot(1, &scene_with(0)));
    }

    #[test]
    fn test_clear_page() {
        let mut log = UndoLog::default();
        log.snapshot(1, &scene_with(0));
        log.snapshot(2, &scene_with(0));
        log.clear_page(1);
        assert_eq!(log.depth(1), 0);
        assert_eq!(log.depth(2), 1);
        log.clear_all();
        assert_eq!(log.depth(2), 0);
    }

    #[test]
    fn test_gesture_latch_fires_once_per_gesture() {
        let mut latch = GestureLatch::default();
        assert!(latch.first_event());
        assert!(!latch.first_event());
        assert!(!latch.first_event());
        latch.end();
        assert!(latch.first_event());
    }
}
