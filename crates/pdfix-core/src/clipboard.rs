//! Single-slot clipboard for copy, cut and paste

use crate::coords::Point;
use crate::scene::SceneObject;

/// Holds at most one cloned object or group. Pasting does not consume it.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    slot: Option<Vec<SceneObject>>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents. An empty group clears the slot.
    pub fn set(&mut self, objects: Vec<SceneObject>) {
        self.slot = if objects.is_empty() {
            None
        } else {
            Some(objects)
        };
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn len(&self) -> usize {
        self.slot.as_ref().map_or(0, Vec::len)
    }

    /// Fresh clones of the slot contents, moved so that the group's center
    /// lands on `center`. `None` when nothing was copied.
    pub fn paste_at(&self, center: Point) -> Option<Vec<SceneObject>> {
        let objects = self.slot.as_ref()?;
        let group = objects
            .iter()
            .map(SceneObject::bounds)
            .reduce(|acc, b| acc.union(&b))
            .unwrap_or_default();
        let current = group.center();
        let (dx, dy) = (center.x - current.x, center.y - current.y);
        Some(
            objects
                .iter()
                .cloned()
                .map(|mut object| {
                    object.translate(dx, dy);
                    object
                })
                .collect(),
        )
    }
}
