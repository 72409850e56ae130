//! Scene model for page annotations
//!
//! A page scene is the ordered list of annotation objects drawn on one page,
//! in display coordinates. Order is z-order: later objects are drawn on top.

use serde::{Deserialize, Serialize};

use crate::coords::{Bounds, Point};

/// Format tag written into every serialized scene.
pub const SCENE_FORMAT_VERSION: &str = "1";

/// Line height multiple used for multi-line text.
pub const TEXT_LINE_HEIGHT: f64 = 1.16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    FreehandPath,
    Rectangle,
    Ellipse,
    Highlight,
    Redaction,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathObject {
    pub points: Vec<Point>,
    pub stroke: Stroke,
}

impl PathObject {
    /// Box around the points, widened by half the stroke on each side.
    pub fn bounds(&self) -> Bounds {
        path_bounds(&self.points, self.stroke.width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub stroke: String,
    pub stroke_width: f64,
    pub fill: String,
}

impl ShapeStyle {
    /// Outline only, as placed by the rectangle and ellipse tools.
    pub fn outline(color: &str, width: f64) -> Self {
        Self {
            stroke: color.to_string(),
            stroke_width: width,
            fill: "transparent".to_string(),
        }
    }

    /// Translucent yellow marker without a border.
    pub fn highlight() -> Self {
        Self {
            stroke: "transparent".to_string(),
            stroke_width: 0.0,
            fill: "rgba(255,255,0,0.35)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeObject {
    pub bounds: Bounds,
    pub style: ShapeStyle,
}

/// Opaque cover drawn over content that must not be visible in the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionObject {
    pub bounds: Bounds,
    #[serde(default = "default_redaction_fill")]
    pub fill: String,
}

fn default_redaction_fill() -> String {
    "#ffffff".to_string()
}

impl RedactionObject {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            fill: default_redaction_fill(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObject {
    pub left: f64,
    pub top: f64,
    pub text: String,
    pub font_size: f64,
    pub fill: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
}

fn default_font_family() -> String {
    "Arial".to_string()
}

impl TextObject {
    pub fn new(left: f64, top: f64, text: &str, font_size: f64, fill: &str) -> Self {
        Self {
            left,
            top,
            text: text.to_string(),
            font_size,
            fill: fill.to_string(),
            font_family: default_font_family(),
        }
    }

    /// Approximate layout box; glyph metrics belong to the renderer.
    pub fn bounds(&self) -> Bounds {
        let line_count = self.text.lines().count().max(1);
        let longest = self
            .text
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        Bounds::new(
            self.left,
            self.top,
            longest as f64 * self.font_size * 0.5,
            line_count as f64 * self.font_size * TEXT_LINE_HEIGHT,
        )
    }

    /// Map the font family to one of the PDF standard 14 fonts.
    pub fn pdf_font_name(&self) -> &'static str {
        map_font_family_to_base(&self.font_family)
    }
}

/// Map font family name to base PDF font (without style variants)
fn map_font_family_to_base(name: &str) -> &'static str {
    let lower = name.to_lowercase();

    match lower.as_str() {
        "serif" => return "Times-Roman",
        "sans-serif" => return "Helvetica",
        "monospace" => return "Courier",
        _ => {}
    }

    if lower.contains("times") || lower.contains("georgia") || lower.contains("garamond") {
        return "Times-Roman";
    }

    if lower.contains("courier")
        || lower.contains("mono")
        || lower.contains("consolas")
        || lower.contains("monaco")
    {
        return "Courier";
    }

    "Helvetica"
}

/// A single annotation primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SceneObject {
    Path(PathObject),
    Rectangle(ShapeObject),
    Ellipse(ShapeObject),
    Highlight(ShapeObject),
    Redaction(RedactionObject),
    Text(TextObject),
}

impl SceneObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            SceneObject::Path(_) => ObjectKind::FreehandPath,
            SceneObject::Rectangle(_) => ObjectKind::Rectangle,
            SceneObject::Ellipse(_) => ObjectKind::Ellipse,
            SceneObject::Highlight(_) => ObjectKind::Highlight,
            SceneObject::Redaction(_) => ObjectKind::Redaction,
            SceneObject::Text(_) => ObjectKind::Text,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            SceneObject::Path(path) => path.bounds(),
            SceneObject::Rectangle(shape)
            | SceneObject::Ellipse(shape)
            | SceneObject::Highlight(shape) => shape.bounds,
            SceneObject::Redaction(cover) => cover.bounds,
            SceneObject::Text(text) => text.bounds(),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            SceneObject::Path(path) => {
                for p in &mut path.points {
                    p.x += dx;
                    p.y += dy;
                }
            }
            SceneObject::Rectangle(shape)
            | SceneObject::Ellipse(shape)
            | SceneObject::Highlight(shape) => {
                shape.bounds.left += dx;
                shape.bounds.top += dy;
            }
            SceneObject::Redaction(cover) => {
                cover.bounds.left += dx;
                cover.bounds.top += dy;
            }
            SceneObject::Text(text) => {
                text.left += dx;
                text.top += dy;
            }
        }
    }

    /// Fit the object into `target`. Shapes take the bounds directly, paths
    /// are remapped point by point and text scales its font size with the
    /// height change.
    pub fn set_bounds(&mut self, target: Bounds) {
        let current = self.bounds();
        match self {
            SceneObject::Path(path) => {
                let sx = ratio(target.width, current.width);
                let sy = ratio(target.height, current.height);
                for p in &mut path.points {
                    p.x = target.left + (p.x - current.left) * sx;
                    p.y = target.top + (p.y - current.top) * sy;
                }
            }
            SceneObject::Rectangle(shape)
            | SceneObject::Ellipse(shape)
            | SceneObject::Highlight(shape) => shape.bounds = target,
            SceneObject::Redaction(cover) => cover.bounds = target,
            SceneObject::Text(text) => {
                let sy = ratio(target.height, current.height);
                text.left = target.left;
                text.top = target.top;
                text.font_size = (text.font_size * sy).max(1.0);
            }
        }
    }
}

fn ratio(target: f64, current: f64) -> f64 {
    if current.abs() < f64::EPSILON {
        1.0
    } else {
        target / current
    }
}

fn path_bounds(points: &[Point], stroke_width: f64) -> Bounds {
    let Some(first) = points.first() else {
        return Bounds::default();
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let half = stroke_width / 2.0;
    Bounds::new(
        min_x - half,
        min_y - half,
        max_x - min_x + stroke_width,
        max_y - min_y + stroke_width,
    )
}

/// Ordered objects of one page plus the format tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageScene {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

fn default_version() -> String {
    SCENE_FORMAT_VERSION.to_string()
}

impl Default for PageScene {
    fn default() -> Self {
        Self::new()
    }
}

impl PageScene {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            objects: Vec::new(),
        }
    }

    pub fn from_objects(objects: Vec<SceneObject>) -> Self {
        Self {
            version: default_version(),
            objects,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Split into export buckets, preserving z-order within each bucket.
    pub fn partition(&self) -> Partition<'_> {
        let mut partition = Partition::default();
        for object in &self.objects {
            match object {
                SceneObject::Redaction(cover) => partition.cover_rects.push(cover),
                SceneObject::Text(text) => partition.text_objects.push(text),
                SceneObject::Path(_)
                | SceneObject::Rectangle(_)
                | SceneObject::Ellipse(_)
                | SceneObject::Highlight(_) => partition.rest_objects.push(object),
            }
        }
        partition
    }
}

/// Export buckets of a page scene.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    /// Drawn as opaque vector fills before anything else.
    pub cover_rects: Vec<&'a RedactionObject>,
    /// Drawn as vector text after the raster overlay.
    pub text_objects: Vec<&'a TextObject>,
    /// Painted into the raster overlay.
    pub rest_objects: Vec<&'a SceneObject>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_scene() -> PageScene {
        PageScene::from_objects(vec![
            SceneObject::Path(PathObject {
                points: vec![Point::new(1.0, 2.0), Point::new(30.0, 40.0)],
                stroke: Stroke {
                    color: "#ff0000".to_string(),
                    width: 3.0,
                },
            }),
            SceneObject::Redaction(RedactionObject::new(Bounds::new(10.0, 10.0, 50.0, 20.0))),
            SceneObject::Rectangle(ShapeObject {
                bounds: Bounds::new(5.0, 5.0, 100.0, 60.0),
                style: ShapeStyle::outline("#0000ff", 2.0),
            }),
            SceneObject::Text(TextObject::new(20.0, 30.0, "Hello", 18.0, "#333333")),
            SceneObject::Highlight(ShapeObject {
                bounds: Bounds::new(0.0, 100.0, 200.0, 20.0),
                style: ShapeStyle::highlight(),
            }),
            SceneObject::Ellipse(ShapeObject {
                bounds: Bounds::new(50.0, 50.0, 40.0, 30.0),
                style: ShapeStyle::outline("#00ff00", 1.0),
            }),
        ])
    }

    #[test]
    fn test_json_roundtrip_preserves_order_and_content() {
        let scene = sample_scene();
        let json = scene.to_json().unwrap();
        let restored = PageScene::from_json(&json).unwrap();
        assert_eq!(scene, restored);
        let kinds: Vec<ObjectKind> = restored.objects.iter().map(SceneObject::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ObjectKind::FreehandPath,
                ObjectKind::Redaction,
                ObjectKind::Rectangle,
                ObjectKind::Text,
                ObjectKind::Highlight,
                ObjectKind::Ellipse,
            ]
        );
    }

    #[test]
    fn test_json_uses_type_tag() {
        let json = PageScene::from_objects(vec![SceneObject::Redaction(RedactionObject::new(
            Bounds::new(0.0, 0.0, 1.0, 1.0),
        ))])
        .to_json()
        .unwrap();
        assert!(json.contains(r#""type":"redaction""#));
        assert!(json.contains(r#""version":"1""#));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let scene = PageScene::from_json(
            r##"{"objects":[{"type":"text","left":1,"top":2,"text":"x","font_size":12,"fill":"#000000"}]}"##,
        )
        .unwrap();
        assert_eq!(scene.version, SCENE_FORMAT_VERSION);
        match &scene.objects[0] {
            SceneObject::Text(text) => assert_eq!(text.font_family, "Arial"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_partition_buckets() {
        let scene = sample_scene();
        let partition = scene.partition();
        assert_eq!(partition.cover_rects.len(), 1);
        assert_eq!(partition.text_objects.len(), 1);
        assert_eq!(partition.rest_objects.len(), 4);
        assert!(partition
            .rest_objects
            .iter()
            .all(|o| !matches!(o.kind(), ObjectKind::Redaction | ObjectKind::Text)));
    }

    #[test]
    fn test_partition_of_empty_scene() {
        let scene = PageScene::new();
        let partition = scene.partition();
        assert!(partition.cover_rects.is_empty());
        assert!(partition.text_objects.is_empty());
        assert!(partition.rest_objects.is_empty());
    }

    #[test]
    fn test_path_bounds_include_stroke() {
        let path = SceneObject::Path(PathObject {
            points: vec![Point::new(10.0, 10.0), Point::new(20.0, 30.0)],
            stroke: Stroke {
                color: "#000000".to_string(),
                width: 4.0,
            },
        });
        assert_eq!(path.bounds(), Bounds::new(8.0, 8.0, 14.0, 24.0));
    }

    #[test]
    fn test_translate_moves_every_kind() {
        let mut scene = sample_scene();
        let before: Vec<Bounds> = scene.objects.iter().map(SceneObject::bounds).collect();
        for object in &mut scene.objects {
            object.translate(5.0, -3.0);
        }
        for (object, old) in scene.objects.iter().zip(before) {
            let new = object.bounds();
            assert!((new.left - old.left - 5.0).abs() < 1e-9);
            assert!((new.top - old.top + 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_set_bounds_on_path_remaps_points() {
        let mut path = SceneObject::Path(PathObject {
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)],
            stroke: Stroke {
                color: "#000000".to_string(),
                width: 0.0,
            },
        });
        path.set_bounds(Bounds::new(100.0, 100.0, 20.0, 40.0));
        assert_eq!(path.bounds(), Bounds::new(100.0, 100.0, 20.0, 40.0));
    }

    #[test]
    fn test_set_bounds_on_text_scales_font() {
        let mut text = SceneObject::Text(TextObject::new(0.0, 0.0, "Hi", 10.0, "#000000"));
        let height = text.bounds().height;
        text.set_bounds(Bounds::new(5.0, 6.0, 50.0, height * 2.0));
        match text {
            SceneObject::Text(t) => {
                assert_eq!((t.left, t.top), (5.0, 6.0));
                assert!((t.font_size - 20.0).abs() < 1e-9);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_font_family_mapping() {
        let mut text = TextObject::new(0.0, 0.0, "x", 12.0, "#000000");
        assert_eq!(text.pdf_font_name(), "Helvetica");
        text.font_family = "Times New Roman".to_string();
        assert_eq!(text.pdf_font_name(), "Times-Roman");
        text.font_family = "monospace".to_string();
        assert_eq!(text.pdf_font_name(), "Courier");
    }
}
