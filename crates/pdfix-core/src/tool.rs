//! Tool state machine
//!
//! Exactly one tool is active at a time. Each state carries the data of the
//! gesture in flight, so replacing the state drops any half-finished gesture
//! along with the handlers that would have completed it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::canvas::{Canvas, ObjectId};
use crate::coords::{Bounds, Point};
use crate::scene::{
    PathObject, RedactionObject, SceneObject, ShapeObject, ShapeStyle, Stroke, TextObject,
};
use crate::undo::{GestureLatch, UndoLog};

/// Color and width used for new strokes and outlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub color: String,
    pub width: f64,
}

impl Brush {
    pub fn new(color: &str, width: f64) -> Self {
        Self {
            color: color.to_string(),
            width,
        }
    }

    /// Fixed pen used by the signature tool.
    pub fn signature() -> Self {
        Self::new("#000000", 2.0)
    }
}

/// Tools a front end can switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    Select,
    Draw,
    Sign,
    Text,
    Rectangle,
    Ellipse,
    Highlight,
    Redaction,
}

/// Box-shaped objects placed by dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTool {
    Rectangle,
    Ellipse,
    Highlight,
    Redaction,
}

impl ShapeTool {
    fn create(self, bounds: Bounds, brush: &Brush) -> SceneObject {
        match self {
            ShapeTool::Rectangle => SceneObject::Rectangle(ShapeObject {
                bounds,
                style: ShapeStyle::outline(&brush.color, brush.width),
            }),
            ShapeTool::Ellipse => SceneObject::Ellipse(ShapeObject {
                bounds,
                style: ShapeStyle::outline(&brush.color, brush.width),
            }),
            ShapeTool::Highlight => SceneObject::Highlight(ShapeObject {
                bounds,
                style: ShapeStyle::highlight(),
            }),
            ShapeTool::Redaction => SceneObject::Redaction(RedactionObject::new(bounds)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub id: ObjectId,
    pub origin: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragMode {
    /// Translate every selected object.
    Move,
    /// Stretch one object from its bottom-right corner.
    Resize { id: ObjectId, start: Bounds },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub mode: DragMode,
    pub origin: Point,
    pub last: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolState {
    Select { drag: Option<Drag> },
    Freehand {
        signature: bool,
        stroke: Option<Vec<Point>>,
    },
    PlaceText,
    PlaceShape {
        shape: ShapeTool,
        active: Option<Placement>,
    },
}

impl Default for ToolState {
    fn default() -> Self {
        ToolState::Select { drag: None }
    }
}

impl ToolState {
    pub fn for_tool(tool: Tool) -> Self {
        match tool {
            Tool::Select => ToolState::Select { drag: None },
            Tool::Draw => ToolState::Freehand {
                signature: false,
                stroke: None,
            },
            Tool::Sign => ToolState::Freehand {
                signature: true,
                stroke: None,
            },
            Tool::Text => ToolState::PlaceText,
            Tool::Rectangle => ToolState::PlaceShape {
                shape: ShapeTool::Rectangle,
                active: None,
            },
            Tool::Ellipse => ToolState::PlaceShape {
                shape: ShapeTool::Ellipse,
                active: None,
            },
            Tool::Highlight => ToolState::PlaceShape {
                shape: ShapeTool::Highlight,
                active: None,
            },
            Tool::Redaction => ToolState::PlaceShape {
                shape: ShapeTool::Redaction,
                active: None,
            },
        }
    }

    pub fn tool(&self) -> Tool {
        match self {
            ToolState::Select { .. } => Tool::Select,
            ToolState::Freehand {
                signature: false, ..
            } => Tool::Draw,
            ToolState::Freehand {
                signature: true, ..
            } => Tool::Sign,
            ToolState::PlaceText => Tool::Text,
            ToolState::PlaceShape { shape, .. } => match shape {
                ShapeTool::Rectangle => Tool::Rectangle,
                ShapeTool::Ellipse => Tool::Ellipse,
                ShapeTool::Highlight => Tool::Highlight,
                ShapeTool::Redaction => Tool::Redaction,
            },
        }
    }

    /// Whether a gesture is in flight.
    pub fn is_busy(&self) -> bool {
        match self {
            ToolState::Select { drag } => drag.is_some(),
            ToolState::Freehand { stroke, .. } => stroke.is_some(),
            ToolState::PlaceText => false,
            ToolState::PlaceShape { active, .. } => active.is_some(),
        }
    }
}

/// Everything a pointer event may touch.
pub struct ToolContext<'a> {
    pub page: u32,
    pub canvas: &'a mut Canvas,
    pub undo: &'a mut UndoLog,
    pub latch: &'a mut GestureLatch,
    pub brush: &'a Brush,
    pub text_size: f64,
    pub redaction_pad: f64,
}

impl ToolContext<'_> {
    /// Record the live scene before the first mutation of a gesture.
    fn snapshot_once(&mut self) {
        if self.latch.first_event() {
            let live = self.canvas.to_scene();
            self.undo.snapshot(self.page, &live);
        }
    }
}

/// Owns the active tool state and dispatches pointer events to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolMachine {
    state: ToolState,
}

impl ToolMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    pub fn tool(&self) -> Tool {
        self.state.tool()
    }

    /// Replace the state wholesale. Any gesture in flight is abandoned; an
    /// object it already placed stays on the canvas as it is.
    pub fn set_tool(&mut self, tool: Tool, latch: &mut GestureLatch) {
        if self.state.is_busy() {
            debug!(from = ?self.state.tool(), to = ?tool, "abandoning gesture on tool switch");
        }
        latch.end();
        self.state = ToolState::for_tool(tool);
    }

    pub fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, at: Point) {
        ctx.latch.end();
        match &mut self.state {
            ToolState::Select { drag } => {
                *drag = begin_drag(ctx.canvas, at);
            }
            ToolState::Freehand { stroke, .. } => {
                *stroke = Some(vec![at]);
            }
            ToolState::PlaceText => {
                ctx.snapshot_once();
                let text = TextObject::new(at.x, at.y, "Text", ctx.text_size, &ctx.brush.color);
                let id = ctx.canvas.add(SceneObject::Text(text));
                ctx.canvas.select(&[id]);
                ctx.latch.end();
                self.state = ToolState::Select { drag: None };
            }
            ToolState::PlaceShape { shape, active } => {
                ctx.snapshot_once();
                let bounds = Bounds::new(at.x, at.y, 0.0, 0.0);
                let id = ctx.canvas.add(shape.create(bounds, ctx.brush));
                *active = Some(Placement { id, origin: at });
            }
        }
    }

    pub fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, at: Point) {
        match &mut self.state {
            ToolState::Select { drag: Some(drag) } => {
                ctx.snapshot_once();
                apply_drag(ctx.canvas, drag, at);
            }
            ToolState::Freehand {
                stroke: Some(points),
                ..
            } => points.push(at),
            ToolState::PlaceShape {
                shape,
                active: Some(placement),
            } => {
                let mut bounds = Bounds::spanning(placement.origin, at);
                if *shape == ShapeTool::Redaction {
                    bounds = bounds.padded_outward(ctx.redaction_pad);
                }
                if let Some(object) = ctx.canvas.get_mut(placement.id) {
                    object.set_bounds(bounds);
                }
            }
            _ => {}
        }
    }

    pub fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, at: Point) {
        match &mut self.state {
            ToolState::Select { drag } => {
                *drag = None;
            }
            ToolState::Freehand { signature, stroke } => {
                if let Some(mut points) = stroke.take() {
                    if points.last() != Some(&at) {
                        points.push(at);
                    }
                    ctx.snapshot_once();
                    let pen = if *signature {
                        Brush::signature()
                    } else {
                        ctx.brush.clone()
                    };
                    ctx.canvas.add(SceneObject::Path(PathObject {
                        points,
                        stroke: Stroke {
                            color: pen.color,
                            width: pen.width,
                        },
                    }));
                }
            }
            ToolState::PlaceText => {}
            ToolState::PlaceShape { active, .. } => {
                if active.take().is_some() {
                    self.state = ToolState::Select { drag: None };
                }
            }
        }
        ctx.latch.end();
    }
}

fn begin_drag(canvas: &mut Canvas, at: Point) -> Option<Drag> {
    if let Some(id) = canvas.resize_handle_at(at) {
        let start = canvas.get(id)?.bounds();
        return Some(Drag {
            mode: DragMode::Resize { id, start },
            origin: at,
            last: at,
        });
    }
    match canvas.hit_test(at) {
        Some(id) => {
            if !canvas.selection().contains(&id) {
                canvas.select(&[id]);
            }
            Some(Drag {
                mode: DragMode::Move,
                origin: at,
                last: at,
            })
        }
        None => {
            canvas.clear_selection();
            None
        }
    }
}

fn apply_drag(canvas: &mut Canvas, drag: &mut Drag, at: Point) {
    match drag.mode {
        DragMode::Move => {
            let (dx, dy) = (at.x - drag.last.x, at.y - drag.last.y);
            let selected = canvas.selection().to_vec();
            for id in selected {
                if let Some(object) = canvas.get_mut(id) {
                    object.translate(dx, dy);
                }
            }
        }
        DragMode::Resize { id, start } => {
            let width = (start.width + at.x - drag.origin.x).max(1.0);
            let height = (start.height + at.y - drag.origin.y).max(1.0);
            if let Some(object) = canvas.get_mut(id) {
                object.set_bounds(Bounds::new(start.left, start.top, width, height));
            }
        }
    }
    drag.last = at;
}
