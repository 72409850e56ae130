//! Page rendering for the editing view
//!
//! The base image of a page comes from a [`PageRasterizer`]; the page's
//! annotation scene is laid on top at exactly the base image's size.

use std::sync::Arc;

use hayro::hayro_interpret::InterpreterSettings;
use hayro::hayro_syntax::Pdf;
use hayro::vello_cpu::color::palette::css::WHITE;
use hayro::{render, RenderSettings};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::debug;

use crate::config::EditorConfig;
use crate::coords::PageSize;
use crate::error::{PdfixError, Result};
use crate::raster;
use crate::scene::{PageScene, SceneObject};

/// Turns pages into pixels. Pages are 1-based.
pub trait PageRasterizer {
    fn page_count(&self) -> u32;

    /// Page size in points, i.e. the viewport at scale 1.0.
    fn page_size(&self, page: u32) -> Result<PageSize>;

    /// Rasterize the page at `scale` pixels per point on a white background.
    fn render_page(&self, page: u32, scale: f64) -> Result<RgbaImage>;

    fn viewport(&self, page: u32, scale: f64) -> Result<PageSize> {
        Ok(self.page_size(page)?.scaled(scale))
    }
}

fn check_scale(scale: f64) -> Result<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(PdfixError::Render(format!(
            "scale must be a positive finite value, got {}",
            scale
        )));
    }
    Ok(())
}

/// Rasterizer backed by hayro.
pub struct HayroRasterizer {
    pdf: Pdf,
}

impl HayroRasterizer {
    pub fn new(bytes: Arc<Vec<u8>>) -> Result<Self> {
        let pdf = Pdf::new(bytes)
            .map_err(|_| PdfixError::ParseError("failed to parse PDF with hayro".to_string()))?;
        Ok(Self { pdf })
    }

    fn page_index(&self, page: u32) -> Result<usize> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PdfixError::PageOutOfRange { page, page_count });
        }
        Ok(page as usize - 1)
    }
}

impl PageRasterizer for HayroRasterizer {
    fn page_count(&self) -> u32 {
        self.pdf.pages().len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize> {
        let index = self.page_index(page)?;
        let page_ref = self
            .pdf
            .pages()
            .get(index)
            .ok_or(PdfixError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            })?;
        let (width, height) = page_ref.render_dimensions();
        Ok(PageSize::new(width as f64, height as f64))
    }

    fn render_page(&self, page: u32, scale: f64) -> Result<RgbaImage> {
        check_scale(scale)?;
        let index = self.page_index(page)?;
        let page_ref = self
            .pdf
            .pages()
            .get(index)
            .ok_or(PdfixError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            })?;

        let render_settings = RenderSettings {
            x_scale: scale as f32,
            y_scale: scale as f32,
            bg_color: WHITE,
            ..Default::default()
        };
        let interpreter_settings = InterpreterSettings::default();
        let pixmap = render(page_ref, &interpreter_settings, &render_settings);

        let (width, height) = (pixmap.width() as u32, pixmap.height() as u32);
        RgbaImage::from_raw(width, height, pixmap.data_as_u8_slice().to_vec()).ok_or_else(|| {
            PdfixError::Render(format!("page {} produced a malformed pixmap", page))
        })
    }
}

/// Pages imported from plain images; one pixel maps to one point.
///
/// There is no PDF behind these pages, so exporting them always takes the
/// rasterizing path.
pub struct ImagePages {
    pages: Vec<RgbaImage>,
}

impl ImagePages {
    pub fn new(pages: Vec<RgbaImage>) -> Result<Self> {
        if pages.is_empty() {
            return Err(PdfixError::ParseError("no page images given".to_string()));
        }
        if let Some(pos) = pages.iter().position(|p| p.width() == 0 || p.height() == 0) {
            return Err(PdfixError::ParseError(format!(
                "page image {} has no pixels",
                pos + 1
            )));
        }
        Ok(Self { pages })
    }

    /// Decode encoded images (PNG, JPEG, ...) into pages.
    pub fn decode<B: AsRef<[u8]>>(encoded: &[B]) -> Result<Self> {
        let pages = encoded
            .iter()
            .enumerate()
            .map(|(i, bytes)| {
                image::load_from_memory(bytes.as_ref())
                    .map(|img| img.to_rgba8())
                    .map_err(|e| {
                        PdfixError::ParseError(format!("page image {}: {}", i + 1, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(pages)
    }

    fn get(&self, page: u32) -> Result<&RgbaImage> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or(PdfixError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            })
    }
}

impl PageRasterizer for ImagePages {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize> {
        let img = self.get(page)?;
        Ok(PageSize::new(img.width() as f64, img.height() as f64))
    }

    fn render_page(&self, page: u32, scale: f64) -> Result<RgbaImage> {
        check_scale(scale)?;
        let img = self.get(page)?;
        let width = ((img.width() as f64 * scale).round() as u32).max(1);
        let height = ((img.height() as f64 * scale).round() as u32).max(1);
        let mut out = RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        let scaled = if (width, height) == img.dimensions() {
            img.clone()
        } else {
            imageops::resize(img, width, height, FilterType::Triangle)
        };
        imageops::overlay(&mut out, &scaled, 0, 0);
        Ok(out)
    }
}

/// Chooses the display resolution and assembles the editing view of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRenderer {
    base_scale: f64,
    device_pixel_ratio: f64,
    min_scale: f64,
    viewport_width: Option<f64>,
}

impl PageRenderer {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            base_scale: config.base_scale,
            device_pixel_ratio: config.device_pixel_ratio,
            min_scale: config.min_scale,
            viewport_width: config.viewport_width,
        }
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Logical scale, shrunk toward `min_scale` when the page would
    /// overflow the viewport width.
    pub fn logical_scale(&self, page_size: PageSize) -> f64 {
        match self.viewport_width {
            Some(available) if page_size.width * self.base_scale > available => {
                (available / page_size.width).max(self.min_scale)
            }
            _ => self.base_scale,
        }
    }

    /// Pixels per point of the display surface.
    pub fn display_scale(&self, page_size: PageSize) -> f64 {
        self.logical_scale(page_size) * self.device_pixel_ratio
    }

    /// Display-space size of `page`, the coordinate space of its scene.
    pub fn display_size(&self, rasterizer: &dyn PageRasterizer, page: u32) -> Result<PageSize> {
        let size = rasterizer.page_size(page)?;
        Ok(size.scaled(self.display_scale(size)))
    }

    /// Base image at display resolution with the page's scene as overlay.
    /// A page without a stored scene gets an empty overlay.
    pub fn render(
        &self,
        rasterizer: &dyn PageRasterizer,
        page: u32,
        scene: Option<&PageScene>,
    ) -> Result<RenderedPage> {
        let size = rasterizer.page_size(page)?;
        let scale = self.display_scale(size);
        let base = rasterizer.render_page(page, scale)?;
        let display = PageSize::new(base.width() as f64, base.height() as f64);
        debug!(page, scale, width = base.width(), height = base.height(), "rendered page");
        Ok(RenderedPage {
            page,
            scale,
            display,
            css_size: PageSize::new(
                (display.width / self.device_pixel_ratio).round(),
                (display.height / self.device_pixel_ratio).round(),
            ),
            base,
            scene: scene.cloned().unwrap_or_default(),
        })
    }
}

/// One page as shown in the editor.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page: u32,
    pub scale: f64,
    /// Base image size; the overlay is sized to match.
    pub display: PageSize,
    /// On-screen size in logical units.
    pub css_size: PageSize,
    pub base: RgbaImage,
    pub scene: PageScene,
}

impl RenderedPage {
    /// Base image with the whole scene, text included, painted on top.
    pub fn composite(&self) -> Result<RgbaImage> {
        let mut out = self.base.clone();
        let objects: Vec<&SceneObject> = self.scene.objects.iter().collect();
        raster::paint_scene(&mut out, &objects, 1.0)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Bounds;
    use crate::scene::{RedactionObject, TextObject};

    fn blank_pages(sizes: &[(u32, u32)]) -> ImagePages {
        ImagePages::new(
            sizes
                .iter()
                .map(|(w, h)| RgbaImage::from_pixel(*w, *h, image::Rgba([200, 200, 200, 255])))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_display_scale_uses_base_and_dpr() {
        let config = EditorConfig {
            device_pixel_ratio: 2.0,
            ..EditorConfig::default()
        };
        let renderer = PageRenderer::from_config(&config);
        assert!((renderer.display_scale(PageSize::new(612.0, 792.0)) - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_display_scale_shrinks_to_viewport() {
        let config = EditorConfig {
            viewport_width: Some(800.0),
            ..EditorConfig::default()
        };
        let renderer = PageRenderer::from_config(&config);
        // 612 * 1.8 overflows 800, so 800 / 612 is used.
        let scale = renderer.display_scale(PageSize::new(612.0, 792.0));
        assert!((scale - 800.0 / 612.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_scale_never_below_minimum() {
        let config = EditorConfig {
            viewport_width: Some(300.0),
            ..EditorConfig::default()
        };
        let renderer = PageRenderer::from_config(&config);
        assert_eq!(renderer.display_scale(PageSize::new(612.0, 792.0)), 1.0);
    }

    #[test]
    fn test_render_without_scene_has_empty_overlay() {
        let pages = blank_pages(&[(100, 50)]);
        let renderer = PageRenderer::from_config(&EditorConfig {
            base_scale: 2.0,
            ..EditorConfig::default()
        });
        let rendered = renderer.render(&pages, 1, None).unwrap();
        assert!(rendered.scene.is_empty());
        assert_eq!(rendered.display, PageSize::new(200.0, 100.0));
        assert_eq!(rendered.composite().unwrap(), rendered.base);
    }

    #[test]
    fn test_composite_paints_scene() {
        let pages = blank_pages(&[(100, 100)]);
        let renderer = PageRenderer::from_config(&EditorConfig {
            base_scale: 1.0,
            ..EditorConfig::default()
        });
        let scene = PageScene::from_objects(vec![SceneObject::Redaction(RedactionObject::new(
            Bounds::new(0.0, 0.0, 10.0, 10.0),
        ))]);
        let rendered = renderer.render(&pages, 1, Some(&scene)).unwrap();
        let out = rendered.composite().unwrap();
        assert_eq!(out.get_pixel(5, 5).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(50, 50).0, [200, 200, 200, 255]);
    }

    #[test]
    fn test_composite_paints_text() {
        let pages = ImagePages::new(vec![RgbaImage::from_pixel(
            200,
            100,
            image::Rgba([255, 255, 255, 255]),
        )])
        .unwrap();
        let renderer = PageRenderer::from_config(&EditorConfig {
            base_scale: 1.0,
            ..EditorConfig::default()
        });
        let scene = PageScene::from_objects(vec![SceneObject::Text(TextObject::new(
            10.0, 20.0, "HELLO", 40.0, "#000000",
        ))]);
        let rendered = renderer.render(&pages, 1, Some(&scene)).unwrap();
        let out = rendered.composite().unwrap();
        assert_ne!(out, rendered.base);
        let inked = out
            .pixels()
            .filter(|p| p.0[0] < 128 && p.0[1] < 128 && p.0[2] < 128)
            .count();
        assert!(inked > 100);
    }

    #[test]
    fn test_image_pages_bounds() {
        let pages = blank_pages(&[(10, 10), (20, 30)]);
        assert_eq!(pages.page_count(), 2);
        assert_eq!(pages.page_size(2).unwrap(), PageSize::new(20.0, 30.0));
        assert!(matches!(
            pages.page_size(3),
            Err(PdfixError::PageOutOfRange { page: 3, page_count: 2 })
        ));
        assert!(pages.page_size(0).is_err());
    }

    #[test]
    fn test_image_pages_render_scales() {
        let pages = blank_pages(&[(10, 20)]);
        let img = pages.render_page(1, 2.5).unwrap();
        assert_eq!(img.dimensions(), (25, 50));
        assert!(pages.render_page(1, 0.0).is_err());
    }

    #[test]
    fn test_image_pages_reject_empty() {
        assert!(ImagePages::new(Vec::new()).is_err());
        assert!(ImagePages::decode::<Vec<u8>>(&[b"not an image".to_vec()]).is_err());
    }
}
