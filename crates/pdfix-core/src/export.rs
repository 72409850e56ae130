//! Export annotated pages to a new PDF
//!
//! Pages are processed one at a time and in a fixed order:
//!
//! 1. Redaction rectangles become opaque vector fills.
//! 2. Shapes, ink and highlights are painted into one transparent image laid
//!    over the whole page.
//! 3. Text becomes real PDF text in a standard font.
//!
//! With the original PDF available its pages are kept intact: the original
//! content is isolated in its own graphics state and the annotations are
//! appended after it. Without one (image imports) each page is rasterized
//! and its whole scene, text included, is burned into that single image.

use std::collections::BTreeMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info, warn};

use crate::color::{parse_color, Rgb};
use crate::coords::{DisplayToPdf, PageSize};
use crate::error::{PdfixError, Result};
use crate::raster;
use crate::render::{PageRasterizer, PageRenderer};
use crate::scene::{PageScene, SceneObject, TextObject, TEXT_LINE_HEIGHT};

/// Everything an export needs. Pages without an entry in `scenes` are
/// copied through unchanged.
pub struct ExportInput<'a> {
    pub original: Option<&'a [u8]>,
    pub rasterizer: &'a dyn PageRasterizer,
    pub renderer: &'a PageRenderer,
    /// Pixels per point when whole pages are rasterized.
    pub export_scale: f64,
    pub scenes: &'a BTreeMap<u32, PageScene>,
}

/// Produce the output PDF. Any failure aborts the whole export.
pub fn export_document(input: &ExportInput<'_>) -> Result<Vec<u8>> {
    let result = match input.original {
        Some(bytes) => export_over_original(bytes, input),
        None => export_rasterized(input),
    };
    result.map_err(|e| match e {
        PdfixError::Export(_) => e,
        other => PdfixError::Export(other.to_string()),
    })
}

fn export_over_original(bytes: &[u8], input: &ExportInput<'_>) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(bytes).map_err(|e| PdfixError::Export(e.to_string()))?;
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

    for (page_num, page_id) in &pages {
        let Some(scene) = input.scenes.get(page_num).filter(|s| !s.is_empty()) else {
            continue;
        };
        let display = input.renderer.display_size(input.rasterizer, *page_num)?;
        let media = media_box(&doc, *page_id)?;
        debug!(page = page_num, objects = scene.len(), "stamping page");
        stamp_page(&mut doc, *page_id, scene, display, media)?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PdfixError::Export(e.to_string()))?;
    info!(pages = pages.len(), bytes = output.len(), "exported over original");
    Ok(output)
}

/// Page box as origin plus size, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MediaBox {
    x0: f64,
    y0: f64,
    size: PageSize,
}

fn media_box(doc: &Document, page_id: ObjectId) -> Result<MediaBox> {
    let object = inherited(doc, page_id, b"MediaBox")
        .ok_or_else(|| PdfixError::Export(format!("page {:?} has no MediaBox", page_id)))?;
    let values = match resolve(doc, object) {
        Object::Array(items) => items
            .iter()
            .map(|item| number(resolve(doc, item)))
            .collect::<Option<Vec<f64>>>(),
        _ => None,
    };
    match values.as_deref() {
        Some([a, b, c, d]) => Ok(MediaBox {
            x0: a.min(*c),
            y0: b.min(*d),
            size: PageSize::new((c - a).abs(), (d - b).abs()),
        }),
        _ => Err(PdfixError::Export(format!(
            "page {:?} has a malformed MediaBox",
            page_id
        ))),
    }
}

/// Look `key` up on the page, then on its ancestors in the page tree.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Depth guard against cyclic Parent links.
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    let mut current = object;
    for _ in 0..16 {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Inline copy of a resource sub-dictionary (`Font`, `XObject`, ...).
fn resource_category(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    match resources.get(key).map(|o| resolve(doc, o)) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    }
}

/// Name with `prefix` that is not yet used in `dict`.
fn unique_name(dict: &Dictionary, prefix: &str) -> String {
    (0u32..)
        .map(|n| format!("{}{}", prefix, n))
        .find(|name| !dict.has(name.as_bytes()))
        .unwrap_or_else(|| prefix.to_string())
}

/// Append the annotations of `scene` to an existing page.
fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    scene: &PageScene,
    display: PageSize,
    media: MediaBox,
) -> Result<()> {
    let transform = DisplayToPdf::new(display, media.size);
    let partition = scene.partition();

    // Effective resources, copied so inherited and shared dictionaries stay
    // untouched for other pages.
    let mut resources = match inherited(doc, page_id, b"Resources").map(|o| resolve(doc, o)) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let mut xobjects = resource_category(doc, &resources, b"XObject");
    let mut fonts = resource_category(doc, &resources, b"Font");

    let mut ops = OverlayOps::new();
    ops.push(
        "cm",
        vec![1.into(), 0.into(), 0.into(), 1.into(), real(media.x0), real(media.y0)],
    );

    for cover in &partition.cover_rects {
        ops.fill_rect(parse_color(&cover.fill), transform.rect(&cover.bounds));
    }

    if !partition.rest_objects.is_empty() {
        let (width, height) = pixel_size(display);
        let overlay = raster::render_overlay(width, height, &partition.rest_objects, 1.0)?;
        let image_id = add_image(doc, &overlay, true)?;
        let name = unique_name(&xobjects, "PdfixIm");
        xobjects.set(name.as_bytes(), Object::Reference(image_id));
        ops.draw_image(&name, media.size);
    }

    write_text(doc, &mut ops, &mut fonts, &partition.text_objects, &transform);

    if !xobjects.is_empty() {
        resources.set("XObject", Object::Dictionary(xobjects));
    }
    if !fonts.is_empty() {
        resources.set("Font", Object::Dictionary(fonts));
    }

    // The leading `Q` pops the state pushed before the original content.
    let mut overlay = b"\nQ\n".to_vec();
    overlay.extend(ops.finish()?);
    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let existing = match doc.get_dictionary(page_id).ok().and_then(|d| d.get(b"Contents").ok()) {
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Some(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(prefix_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfixError::Export(e.to_string()))?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn export_rasterized(input: &ExportInput<'_>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_count = input.rasterizer.page_count();
    let mut kids = Vec::with_capacity(page_count as usize);

    for page_num in 1..=page_count {
        let size = input.rasterizer.page_size(page_num)?;
        let mut pixels = input.rasterizer.render_page(page_num, input.export_scale)?;

        if let Some(scene) = input.scenes.get(&page_num).filter(|s| !s.is_empty()) {
            let display = input.renderer.display_size(input.rasterizer, page_num)?;
            let ratio = pixels.width() as f64 / display.width;
            let objects: Vec<&SceneObject> = scene.objects.iter().collect();
            raster::paint_scene(&mut pixels, &objects, ratio)?;
        }

        let image_id = add_image(&mut doc, &pixels, false)?;
        drop(pixels);
        let mut ops = OverlayOps::new();
        ops.draw_image("PdfixIm0", size);
        let resources = dictionary! {
            "XObject" => dictionary! { "PdfixIm0" => image_id },
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), ops.finish()?));
        kids.push(add_page(&mut doc, pages_id, size, content_id, resources));
        debug!(page = page_num, "rasterized page exported");
    }

    let output = save_with_pages(doc, pages_id, kids)?;
    info!(pages = page_count, bytes = output.len(), "exported rasterized pages");
    Ok(output)
}

/// One-page PDF holding only `texts`, one point per display unit. The
/// raster painter renders it to put text into pixels.
pub(crate) fn text_page(texts: &[&TextObject], display: PageSize) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let transform = DisplayToPdf::new(display, display);
    let mut fonts = Dictionary::new();
    let mut ops = OverlayOps::new();
    write_text(&mut doc, &mut ops, &mut fonts, texts, &transform);

    let content_id = doc.add_object(Stream::new(Dictionary::new(), ops.finish()?));
    let resources = dictionary! { "Font" => fonts };
    let page_id = add_page(&mut doc, pages_id, display, content_id, resources);
    save_with_pages(doc, pages_id, vec![page_id])
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    size: PageSize,
    content_id: ObjectId,
    resources: Dictionary,
) -> Object {
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), real(size.width), real(size.height)],
        "Contents" => content_id,
        "Resources" => resources,
    });
    Object::Reference(page_id)
}

/// Finish the page tree and catalog, then serialize.
fn save_with_pages(mut doc: Document, pages_id: ObjectId, kids: Vec<Object>) -> Result<Vec<u8>> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PdfixError::Export(e.to_string()))?;
    Ok(output)
}

fn pixel_size(display: PageSize) -> (u32, u32) {
    (
        (display.width.round() as u32).max(1),
        (display.height.round() as u32).max(1),
    )
}

/// Content stream operators for one page's annotations.
struct OverlayOps {
    operations: Vec<Operation>,
}

impl OverlayOps {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn set_fill(&mut self, color: Rgb) {
        self.push(
            "rg",
            vec![Object::Real(color.r), Object::Real(color.g), Object::Real(color.b)],
        );
    }

    fn fill_rect(&mut self, color: Rgb, (x, y, w, h): (f64, f64, f64, f64)) {
        self.set_fill(color);
        self.push("re", vec![real(x), real(y), real(w), real(h)]);
        self.push("f", vec![]);
    }

    fn draw_image(&mut self, name: &str, page: PageSize) {
        self.push("q", vec![]);
        self.push(
            "cm",
            vec![real(page.width), 0.into(), 0.into(), real(page.height), 0.into(), 0.into()],
        );
        self.push("Do", vec![Object::Name(name.as_bytes().to_vec())]);
        self.push("Q", vec![]);
    }

    /// The operators wrapped in their own `q`/`Q` pair, encoded.
    fn finish(self) -> Result<Vec<u8>> {
        let mut operations = Vec::with_capacity(self.operations.len() + 2);
        operations.push(Operation::new("q", vec![]));
        operations.extend(self.operations);
        operations.push(Operation::new("Q", vec![]));
        Content { operations }
            .encode()
            .map_err(|e| PdfixError::Export(e.to_string()))
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Write each text object; one that cannot be encoded is skipped.
fn write_text(
    doc: &mut Document,
    ops: &mut OverlayOps,
    fonts: &mut Dictionary,
    texts: &[&TextObject],
    transform: &DisplayToPdf,
) {
    // Base font name -> resource name on this page.
    let mut registered: BTreeMap<&'static str, String> = BTreeMap::new();
    for text in texts {
        match text_ops(text, transform) {
            Ok(shown) => {
                let base = text.pdf_font_name();
                let resource = registered
                    .entry(base)
                    .or_insert_with(|| {
                        let name = unique_name(fonts, "PdfixF");
                        let font_id = doc.add_object(dictionary! {
                            "Type" => "Font",
                            "Subtype" => "Type1",
                            "BaseFont" => base,
                            "Encoding" => "WinAnsiEncoding",
                        });
                        fonts.set(name.as_bytes(), Object::Reference(font_id));
                        name
                    })
                    .clone();
                let (_, _, size) = transform.text_origin(text.left, text.top, text.font_size);
                ops.push("BT", vec![]);
                ops.push("Tf", vec![Object::Name(resource.into_bytes()), real(size)]);
                ops.set_fill(parse_color(&text.fill));
                ops.operations.extend(shown);
                ops.push("ET", vec![]);
            }
            Err(e) => {
                warn!(text = %text.text, error = %e, "skipping text that cannot be exported");
            }
        }
    }
}

/// Positioning and show operators, one baseline per line.
fn text_ops(text: &TextObject, transform: &DisplayToPdf) -> Result<Vec<Operation>> {
    let (x, y, size) = transform.text_origin(text.left, text.top, text.font_size);
    let step = size * TEXT_LINE_HEIGHT;
    let mut operations = Vec::new();
    for (i, line) in text.text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let encoded = encode_win_ansi(line)?;
        operations.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                real(x),
                real(y - step * i as f64),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encoded, StringFormat::Literal)],
        ));
    }
    Ok(operations)
}

/// Encode for a WinAnsi simple font.
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            win_ansi_code(c).ok_or_else(|| {
                PdfixError::Encoding(format!("WinAnsi cannot encode {:?} (U+{:04X})", c, c as u32))
            })
        })
        .collect()
}

fn win_ansi_code(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => Some(match c {
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => return None,
        }),
    }
}

/// Embed pixels as a Flate-compressed RGB image, with the alpha channel as
/// a soft mask when `with_alpha` is set.
fn add_image(doc: &mut Document, pixels: &RgbaImage, with_alpha: bool) -> Result<ObjectId> {
    let (width, height) = pixels.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for p in pixels.pixels() {
        rgb.extend_from_slice(&p.0[..3]);
        alpha.push(p.0[3]);
    }

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if with_alpha {
        let mask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(&alpha)?,
        ));
        image_dict.set("SMask", Object::Reference(mask_id));
    }
    Ok(doc.add_object(Stream::new(image_dict, deflate(&rgb)?)))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PdfixError::Export(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| PdfixError::Export(e.to_string()))
}
