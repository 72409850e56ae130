//! Live editing surface for the displayed page
//!
//! Holds the objects of the page currently on screen with stable identities,
//! the selection, and hit testing. Stored scenes carry no identities; every
//! object loaded or pasted gets a fresh [`ObjectId`].

use crate::coords::{Bounds, PageSize, Point};
use crate::scene::{PageScene, SceneObject};

/// Grab distance around thin objects and resize handles, in display units.
pub const HIT_TOLERANCE: f64 = 4.0;
pub const HANDLE_RADIUS: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasItem {
    pub id: ObjectId,
    pub object: SceneObject,
}

#[derive(Debug, Clone)]
pub struct Canvas {
    size: PageSize,
    items: Vec<CanvasItem>,
    selection: Vec<ObjectId>,
    next_id: u64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            size: PageSize::new(0.0, 0.0),
            items: Vec::new(),
            selection: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    /// Match the displayed base image dimensions.
    pub fn set_size(&mut self, size: PageSize) {
        self.size = size;
    }

    /// Replace every object with the contents of `scene`.
    pub fn load_scene(&mut self, scene: &PageScene) {
        self.items.clear();
        self.selection.clear();
        for object in &scene.objects {
            self.add(object.clone());
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.selection.clear();
    }

    pub fn to_scene(&self) -> PageScene {
        PageScene::from_objects(self.items.iter().map(|item| item.object.clone()).collect())
    }

    /// Append on top of the stack.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = self.allocate_id();
        self.items.push(CanvasItem { id, object });
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .map(|item| &item.object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .map(|item| &mut item.object)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let pos = self.items.iter().position(|item| item.id == id)?;
        self.selection.retain(|selected| *selected != id);
        Some(self.items.remove(pos).object)
    }

    pub fn items(&self) -> &[CanvasItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Topmost object under `point`.
    pub fn hit_test(&self, point: Point) -> Option<ObjectId> {
        self.items
            .iter()
            .rev()
            .find(|item| grab_bounds(&item.object).contains(point))
            .map(|item| item.id)
    }

    /// Selected object whose bottom-right resize handle is under `point`.
    /// Redaction covers have no resize controls.
    pub fn resize_handle_at(&self, point: Point) -> Option<ObjectId> {
        self.selection.iter().rev().copied().find(|id| {
            self.get(*id).is_some_and(|object| {
                if matches!(object, SceneObject::Redaction(_)) {
                    return false;
                }
                let b = object.bounds();
                (point.x - b.right()).abs() <= HANDLE_RADIUS
                    && (point.y - b.bottom()).abs() <= HANDLE_RADIUS
            })
        })
    }

    /// Select the given objects, ignoring ids that are not on the canvas.
    pub fn select(&mut self, ids: &[ObjectId]) {
        self.selection = ids
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_some())
            .collect();
    }

    pub fn select_all(&mut self) {
        self.selection = self.items.iter().map(|item| item.id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    /// Selected objects in z-order.
    pub fn selected_objects(&self) -> Vec<&SceneObject> {
        self.items
            .iter()
            .filter(|item| self.selection.contains(&item.id))
            .map(|item| &item.object)
            .collect()
    }

    /// Bounds enclosing the whole selection.
    pub fn selection_bounds(&self) -> Option<Bounds> {
        self.selected_objects()
            .into_iter()
            .map(SceneObject::bounds)
            .reduce(|acc, b| acc.union(&b))
    }
}

fn grab_bounds(object: &SceneObject) -> Bounds {
    let b = object.bounds();
    Bounds::new(
        b.left - HIT_TOLERANCE,
        b.top - HIT_TOLERANCE,
        b.width + HIT_TOLERANCE * 2.0,
        b.height + HIT_TOLERANCE * 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{RedactionObject, ShapeObject, ShapeStyle};

    fn rect(left: f64, top: f64, w: f64, h: f64) -> SceneObject {
        SceneObject::Rectangle(ShapeObject {
            bounds: Bounds::new(left, top, w, h),
            style: ShapeStyle::outline("#000000", 1.0),
        })
    }

    #[test]
    fn test_load_assigns_fresh_ids() {
        let mut canvas = Canvas::new();
        let scene = PageScene::from_objects(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        canvas.load_scene(&scene);
        let first = canvas.items()[0].id;
        canvas.load_scene(&scene);
        assert_ne!(first, canvas.items()[0].id);
        assert_eq!(canvas.to_scene(), scene);
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut canvas = Canvas::new();
        let bottom = canvas.add(rect(0.0, 0.0, 100.0, 100.0));
        let top = canvas.add(rect(50.0, 50.0, 100.0, 100.0));
        assert_eq!(canvas.hit_test(Point::new(75.0, 75.0)), Some(top));
        assert_eq!(canvas.hit_test(Point::new(10.0, 10.0)), Some(bottom));
        assert_eq!(canvas.hit_test(Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_remove_drops_from_selection() {
        let mut canvas = Canvas::new();
        let id = canvas.add(rect(0.0, 0.0, 10.0, 10.0));
        canvas.select(&[id]);
        assert!(canvas.remove(id).is_some());
        assert!(canvas.selection().is_empty());
        assert!(canvas.remove(id).is_none());
    }

    #[test]
    fn test_select_ignores_unknown_ids() {
        let mut canvas = Canvas::new();
        let id = canvas.add(rect(0.0, 0.0, 10.0, 10.0));
        canvas.select(&[id, ObjectId(999)]);
        assert_eq!(canvas.selection(), &[id]);
    }

    #[test]
    fn test_resize_handle_only_for_selected_non_redactions() {
        let mut canvas = Canvas::new();
        let shape = canvas.add(rect(0.0, 0.0, 10.0, 10.0));
        let cover = canvas.add(SceneObject::Redaction(RedactionObject::new(Bounds::new(
            50.0, 50.0, 10.0, 10.0,
        ))));
        assert_eq!(canvas.resize_handle_at(Point::new(10.0, 10.0)), None);
        canvas.select(&[shape, cover]);
        assert_eq!(canvas.resize_handle_at(Point::new(11.0, 9.0)), Some(shape));
        assert_eq!(canvas.resize_handle_at(Point::new(60.0, 60.0)), None);
    }

    #[test]
    fn test_selection_bounds_union() {
        let mut canvas = Canvas::new();
        let a = canvas.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = canvas.add(rect(20.0, 20.0, 10.0, 10.0));
        assert_eq!(canvas.selection_bounds(), None);
        canvas.select(&[a, b]);
        assert_eq!(
            canvas.selection_bounds(),
            Some(Bounds::new(0.0, 0.0, 30.0, 30.0))
        );
    }
}
