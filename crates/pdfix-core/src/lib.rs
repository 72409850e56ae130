//! PDF annotation editor core
//!
//! This crate holds the editing model behind pdfix: per-page annotation
//! scenes, undo history, drawing tools and the export pipeline that
//! composites annotations onto the original pages using lopdf.
//!
//! The entry point for front ends is [`Editor`]; lower-level pieces are
//! public for callers that manage their own state:
//! - [`scene`]: annotation objects and their JSON form
//! - [`export::export_document`]: scenes plus a source document to PDF bytes
//! - [`render::PageRasterizer`]: page pixels for display and image imports

pub mod canvas;
pub mod clipboard;
pub mod color;
pub mod command;
pub mod config;
pub mod coords;
pub mod editor;
pub mod error;
pub mod export;
pub mod raster;
pub mod render;
pub mod scene;
pub mod session;
pub mod store;
pub mod tool;
pub mod undo;

pub use canvas::{Canvas, ObjectId};
pub use command::{parse_script, replay, EditCommand, ReplayReport};
pub use config::EditorConfig;
pub use coords::{Bounds, PageSize, Point};
pub use editor::Editor;
pub use error::{PdfixError, SelectionRequired};
pub use export::{export_document, ExportInput};
pub use render::{HayroRasterizer, ImagePages, PageRasterizer, PageRenderer, RenderedPage};
pub use scene::{PageScene, SceneObject};
pub use session::DocumentSession;
pub use tool::{Brush, Tool};

use std::collections::BTreeMap;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfixError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| PdfixError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Parse a scene file: a JSON object mapping page numbers to page scenes,
/// e.g. `{"1": {"version": "1", "objects": []}}`.
pub fn parse_scene_file(json: &str) -> Result<BTreeMap<u32, PageScene>, PdfixError> {
    let raw: BTreeMap<String, PageScene> = serde_json::from_str(json)?;
    raw.into_iter()
        .map(|(key, scene)| {
            key.trim()
                .parse::<u32>()
                .map(|page| (page, scene))
                .map_err(|_| PdfixError::Serialization(format!("Invalid page key: {}", key)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_file_parses_page_keys() {
        let json = r#"{"2": {"objects": []}, "10": {"version": "1", "objects": []}}"#;
        let scenes = parse_scene_file(json).unwrap();
        assert_eq!(scenes.keys().copied().collect::<Vec<_>>(), vec![2, 10]);
    }

    #[test]
    fn test_scene_file_rejects_bad_key() {
        let err = parse_scene_file(r#"{"first": {"objects": []}}"#).unwrap_err();
        assert!(matches!(err, PdfixError::Serialization(_)));
    }

    #[test]
    fn test_page_count_of_garbage() {
        assert!(matches!(
            get_page_count(b"not a pdf"),
            Err(PdfixError::ParseError(_))
        ));
    }
}
