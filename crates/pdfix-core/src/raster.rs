//! Raster painting of annotation objects
//!
//! Freehand strokes, outlines and highlights reach the output PDF as a
//! transparent full-page image, and pages without an original PDF carry
//! their whole scene in pixels. Coordinates are display units; `scale` maps
//! them onto surface pixels so the same scene can be painted at display or
//! export resolution.
//!
//! Vector objects go through vello_cpu. Text is typeset into a throwaway
//! one-page PDF and rendered by hayro, so pixels match the standard fonts
//! used for vector export.

use std::sync::Arc;

use hayro::hayro_interpret::InterpreterSettings;
use hayro::hayro_syntax::Pdf;
use hayro::vello_cpu::color::palette::css::TRANSPARENT;
use hayro::vello_cpu::color::{AlphaColor, Srgb};
use hayro::vello_cpu::kurbo::{Affine, BezPath, Cap, Circle, Ellipse, Join, Rect, Shape, Stroke};
use hayro::vello_cpu::{Pixmap, RenderContext};
use hayro::{render, RenderSettings};
use image::imageops;
use image::RgbaImage;
use tracing::debug;

use crate::color::{parse_paint, Rgba8};
use crate::coords::{Bounds, PageSize};
use crate::error::{PdfixError, Result};
use crate::export;
use crate::scene::{PathObject, SceneObject, ShapeObject, TextObject};

/// Flattening tolerance for curves, in surface pixels.
const TOLERANCE: f64 = 0.1;

/// Transparent surface with the vector objects among `objects` painted in
/// order. Text objects are skipped.
pub fn render_overlay(
    width: u32,
    height: u32,
    objects: &[&SceneObject],
    scale: f64,
) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Ok(RgbaImage::new(width, height));
    }
    let (w, h) = surface_size(width, height)?;
    let mut ctx = RenderContext::new(w, h);
    ctx.set_transform(Affine::scale(scale));
    for object in objects {
        paint_object(&mut ctx, object);
    }
    ctx.flush();
    let mut pixmap = Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);
    into_image(&pixmap)
}

/// Paint every object of a scene over `surface`, later objects on top.
/// Runs of vector objects and runs of text are layered in scene order.
pub fn paint_scene(surface: &mut RgbaImage, objects: &[&SceneObject], scale: f64) -> Result<()> {
    let (width, height) = surface.dimensions();
    for run in objects.chunk_by(|a, b| is_text(a) == is_text(b)) {
        let layer = if is_text(run[0]) {
            let texts: Vec<&TextObject> = run
                .iter()
                .filter_map(|object| match object {
                    SceneObject::Text(text) => Some(text),
                    _ => None,
                })
                .collect();
            render_text(width, height, &texts, scale)?
        } else {
            render_overlay(width, height, run, scale)?
        };
        imageops::overlay(surface, &layer, 0, 0);
    }
    Ok(())
}

/// `true` when no pixel has any opacity.
pub fn is_blank(surface: &RgbaImage) -> bool {
    surface.pixels().all(|p| p.0[3] == 0)
}

fn is_text(object: &SceneObject) -> bool {
    matches!(object, SceneObject::Text(_))
}

fn surface_size(width: u32, height: u32) -> Result<(u16, u16)> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(PdfixError::Render(format!(
            "surface {}x{} exceeds the painter's limit of {} pixels per side",
            width,
            height,
            u16::MAX
        ))),
    }
}

fn paint_object(ctx: &mut RenderContext, object: &SceneObject) {
    match object {
        SceneObject::Path(path) => paint_path(ctx, path),
        SceneObject::Rectangle(shape) | SceneObject::Highlight(shape) => {
            let rect = to_rect(&shape.bounds);
            paint_shape(ctx, shape, &rect.to_path(TOLERANCE));
        }
        SceneObject::Ellipse(shape) => {
            let ellipse = Ellipse::from_rect(to_rect(&shape.bounds));
            paint_shape(ctx, shape, &ellipse.to_path(TOLERANCE));
        }
        SceneObject::Redaction(cover) => {
            if let Some(paint) = parse_paint(&cover.fill) {
                ctx.set_paint(to_color(Rgba8 { a: 255, ..paint }));
                ctx.fill_rect(&to_rect(&cover.bounds));
            }
        }
        SceneObject::Text(_) => {}
    }
}

fn paint_shape(ctx: &mut RenderContext, shape: &ShapeObject, outline: &BezPath) {
    if let Some(paint) = parse_paint(&shape.style.fill) {
        ctx.set_paint(to_color(paint));
        ctx.fill_path(outline);
    }
    if let Some(paint) = stroke_paint(&shape.style.stroke, shape.style.stroke_width) {
        ctx.set_paint(to_color(paint));
        ctx.set_stroke(Stroke::new(shape.style.stroke_width).with_join(Join::Miter));
        ctx.stroke_path(outline);
    }
}

fn paint_path(ctx: &mut RenderContext, path: &PathObject) {
    let Some(paint) = stroke_paint(&path.stroke.color, path.stroke.width) else {
        return;
    };
    ctx.set_paint(to_color(paint));
    match path.points.as_slice() {
        [] => {}
        // A single-point stroke still leaves a dot.
        [only] => {
            let dot = Circle::new((only.x, only.y), path.stroke.width / 2.0);
            ctx.fill_path(&dot.to_path(TOLERANCE));
        }
        [first, rest @ ..] => {
            let mut line = BezPath::new();
            line.move_to((first.x, first.y));
            for p in rest {
                line.line_to((p.x, p.y));
            }
            ctx.set_stroke(
                Stroke::new(path.stroke.width)
                    .with_caps(Cap::Round)
                    .with_join(Join::Round),
            );
            ctx.stroke_path(&line);
        }
    }
}

fn stroke_paint(color: &str, width: f64) -> Option<Rgba8> {
    if width <= 0.0 {
        return None;
    }
    parse_paint(color)
}

fn to_rect(b: &Bounds) -> Rect {
    Rect::new(b.left, b.top, b.right(), b.bottom())
}

fn to_color(paint: Rgba8) -> AlphaColor<Srgb> {
    AlphaColor::from_rgba8(paint.r, paint.g, paint.b, paint.a)
}

/// Text objects on a transparent surface, typeset in the export fonts.
fn render_text(width: u32, height: u32, texts: &[&TextObject], scale: f64) -> Result<RgbaImage> {
    let display = PageSize::new(width as f64 / scale, height as f64 / scale);
    let bytes = export::text_page(texts, display)?;
    let pdf = Pdf::new(Arc::new(bytes))
        .map_err(|_| PdfixError::Render("text layer could not be parsed".to_string()))?;
    let pages = pdf.pages();
    let page = pages
        .get(0)
        .ok_or_else(|| PdfixError::Render("text layer has no page".to_string()))?;

    let render_settings = RenderSettings {
        x_scale: scale as f32,
        y_scale: scale as f32,
        bg_color: TRANSPARENT,
        ..Default::default()
    };
    let pixmap = render(page, &InterpreterSettings::default(), &render_settings);
    debug!(texts = texts.len(), width = pixmap.width(), height = pixmap.height(), "text layer");

    // Rounding may leave the layer a pixel off the surface size.
    let layer = into_image(&pixmap)?;
    if layer.dimensions() == (width, height) {
        return Ok(layer);
    }
    let mut fitted = RgbaImage::new(width, height);
    imageops::overlay(&mut fitted, &layer, 0, 0);
    Ok(fitted)
}

/// Straight-alpha copy of a premultiplied pixmap.
fn into_image(pixmap: &Pixmap) -> Result<RgbaImage> {
    let (width, height) = (pixmap.width() as u32, pixmap.height() as u32);
    let data: Vec<u8> = pixmap
        .data_as_u8_slice()
        .chunks_exact(4)
        .flat_map(|px| unpremultiply([px[0], px[1], px[2], px[3]]))
        .collect();
    RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| PdfixError::Render("painter produced a malformed pixmap".to_string()))
}

fn unpremultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    match a {
        0 => [0, 0, 0, 0],
        255 => [r, g, b, a],
        _ => {
            let scale = |c: u8| ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
            [scale(r), scale(g), scale(b), a]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Point;
    use crate::scene::{RedactionObject, ShapeStyle, Stroke as InkStroke};
    use image::Rgba;

    fn alpha_at(img: &RgbaImage, x: u32, y: u32) -> u8 {
        img.get_pixel(x, y).0[3]
    }

    fn ink(points: Vec<Point>, color: &str, width: f64) -> SceneObject {
        SceneObject::Path(PathObject {
            points,
            stroke: InkStroke {
                color: color.to_string(),
                width,
            },
        })
    }

    fn dark_pixels(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| p.0[0] < 128 && p.0[3] == 255).count()
    }

    #[test]
    fn test_empty_overlay_is_blank() {
        let img = render_overlay(20, 20, &[], 1.0).unwrap();
        assert_eq!(img.dimensions(), (20, 20));
        assert!(is_blank(&img));
    }

    #[test]
    fn test_overlay_skips_text() {
        let text = SceneObject::Text(TextObject::new(0.0, 0.0, "Hello", 18.0, "#000000"));
        let img = render_overlay(100, 100, &[&text], 1.0).unwrap();
        assert!(is_blank(&img));
    }

    #[test]
    fn test_rectangle_outline_leaves_interior_clear() {
        let rect = SceneObject::Rectangle(ShapeObject {
            bounds: Bounds::new(10.0, 10.0, 40.0, 40.0),
            style: ShapeStyle::outline("#0000ff", 2.0),
        });
        let img = render_overlay(60, 60, &[&rect], 1.0).unwrap();
        let edge = img.get_pixel(10, 30).0;
        assert!(edge[2] > 250 && edge[0] < 5 && edge[3] > 250, "{:?}", edge);
        assert_eq!(alpha_at(&img, 30, 30), 0);
        assert_eq!(alpha_at(&img, 2, 2), 0);
    }

    #[test]
    fn test_highlight_is_translucent() {
        let highlight = SceneObject::Highlight(ShapeObject {
            bounds: Bounds::new(0.0, 0.0, 20.0, 10.0),
            style: ShapeStyle::highlight(),
        });
        let img = render_overlay(30, 30, &[&highlight], 1.0).unwrap();
        let p = img.get_pixel(5, 5).0;
        assert!(p[0] > 245 && p[1] > 245 && p[2] < 10, "{:?}", p);
        assert!((86..=92).contains(&p[3]), "{:?}", p);
        assert_eq!(alpha_at(&img, 25, 25), 0);
    }

    #[test]
    fn test_ellipse_center_clear_edge_painted() {
        let ellipse = SceneObject::Ellipse(ShapeObject {
            bounds: Bounds::new(0.0, 0.0, 40.0, 20.0),
            style: ShapeStyle::outline("#00ff00", 2.0),
        });
        let img = render_overlay(50, 30, &[&ellipse], 1.0).unwrap();
        assert_eq!(alpha_at(&img, 20, 10), 0);
        assert!(alpha_at(&img, 20, 0) > 200);
        assert_eq!(alpha_at(&img, 0, 0), 0);
    }

    #[test]
    fn test_path_follows_points() {
        let path = ink(vec![Point::new(0.0, 5.0), Point::new(30.0, 5.0)], "#000000", 4.0);
        let img = render_overlay(40, 20, &[&path], 1.0).unwrap();
        assert_eq!(img.get_pixel(15, 5).0, [0, 0, 0, 255]);
        assert_eq!(alpha_at(&img, 15, 15), 0);
    }

    #[test]
    fn test_single_point_leaves_a_dot() {
        let dot = ink(vec![Point::new(10.0, 10.0)], "#000000", 6.0);
        let img = render_overlay(20, 20, &[&dot], 1.0).unwrap();
        assert!(alpha_at(&img, 10, 10) > 250);
        assert_eq!(alpha_at(&img, 1, 1), 0);
    }

    #[test]
    fn test_overlapping_segments_blend_once() {
        let path = ink(
            vec![Point::new(0.0, 5.0), Point::new(10.0, 5.0), Point::new(0.0, 5.0)],
            "rgba(0,0,0,0.5)",
            4.0,
        );
        let img = render_overlay(20, 10, &[&path], 1.0).unwrap();
        assert!((125..=131).contains(&alpha_at(&img, 5, 5)));
    }

    #[test]
    fn test_scale_maps_display_to_surface() {
        let cover = SceneObject::Redaction(RedactionObject::new(Bounds::new(10.0, 10.0, 10.0, 10.0)));
        let img = render_overlay(100, 100, &[&cover], 2.0).unwrap();
        assert_eq!(img.get_pixel(30, 30).0, [255, 255, 255, 255]);
        assert_eq!(alpha_at(&img, 15, 15), 0);
        assert_eq!(alpha_at(&img, 41, 41), 0);
    }

    #[test]
    fn test_objects_outside_surface_are_clipped() {
        let rect = SceneObject::Rectangle(ShapeObject {
            bounds: Bounds::new(-50.0, -50.0, 500.0, 500.0),
            style: ShapeStyle::outline("#000000", 2.0),
        });
        let img = render_overlay(10, 10, &[&rect], 1.0).unwrap();
        assert!(is_blank(&img));
    }

    #[test]
    fn test_oversized_surface_is_an_error() {
        assert!(matches!(
            render_overlay(70_000, 10, &[], 1.0),
            Err(PdfixError::Render(_))
        ));
    }

    #[test]
    fn test_text_is_painted_into_scene() {
        let mut surface = RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255]));
        let text = SceneObject::Text(TextObject::new(10.0, 20.0, "HELLO", 40.0, "#000000"));
        paint_scene(&mut surface, &[&text], 1.0).unwrap();
        assert!(dark_pixels(&surface) > 100);
        // Nothing lands far below the single line.
        assert!((0..200).all(|x| surface.get_pixel(x, 95).0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_scene_order_decides_what_is_on_top() {
        let rect = SceneObject::Rectangle(ShapeObject {
            bounds: Bounds::new(0.0, 0.0, 20.0, 20.0),
            style: ShapeStyle {
                fill: "#ff0000".to_string(),
                ..ShapeStyle::outline("#ff0000", 1.0)
            },
        });
        let cover = SceneObject::Redaction(RedactionObject::new(Bounds::new(0.0, 0.0, 20.0, 20.0)));

        let mut covered = RgbaImage::from_pixel(30, 30, Rgba([0, 0, 0, 255]));
        paint_scene(&mut covered, &[&rect, &cover], 1.0).unwrap();
        assert_eq!(covered.get_pixel(10, 10).0, [255, 255, 255, 255]);

        let mut on_top = RgbaImage::from_pixel(30, 30, Rgba([0, 0, 0, 255]));
        paint_scene(&mut on_top, &[&cover, &rect], 1.0).unwrap();
        assert_eq!(on_top.get_pixel(10, 10).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_text_under_a_cover_is_hidden() {
        let text = SceneObject::Text(TextObject::new(10.0, 10.0, "SECRET", 30.0, "#000000"));
        let cover = SceneObject::Redaction(RedactionObject::new(Bounds::new(0.0, 0.0, 200.0, 60.0)));
        let mut surface = RgbaImage::from_pixel(200, 60, Rgba([255, 255, 255, 255]));
        paint_scene(&mut surface, &[&text, &cover], 1.0).unwrap();
        assert_eq!(dark_pixels(&surface), 0);
    }

    #[test]
    fn test_unpremultiply() {
        assert_eq!(unpremultiply([0, 0, 0, 0]), [0, 0, 0, 0]);
        assert_eq!(unpremultiply([10, 20, 30, 255]), [10, 20, 30, 255]);
        assert_eq!(unpremultiply([64, 0, 0, 128]), [128, 0, 0, 128]);
    }
}
