//! Editing session
//!
//! [`Editor`] owns every piece of editor state: the open document, stored
//! and live scenes, undo history, the active tool and the clipboard. Front
//! ends drive it with pointer events and commands.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::canvas::{Canvas, ObjectId};
use crate::clipboard::Clipboard;
use crate::config::EditorConfig;
use crate::coords::Point;
use crate::error::{PdfixError, Result, SelectionRequired};
use crate::export::{export_document, ExportInput};
use crate::render::{ImagePages, PageRenderer, RenderedPage};
use crate::scene::{PageScene, SceneObject};
use crate::session::DocumentSession;
use crate::store::AnnotationStore;
use crate::tool::{Brush, Tool, ToolContext, ToolMachine};
use crate::undo::{GestureLatch, UndoLog};

#[derive(Debug, Clone, Copy)]
enum Pointer {
    Down,
    Move,
    Up,
}

#[derive(Debug)]
pub struct Editor {
    config: EditorConfig,
    renderer: PageRenderer,
    document: Option<DocumentSession>,
    store: AnnotationStore,
    undo: UndoLog,
    canvas: Canvas,
    tools: ToolMachine,
    latch: GestureLatch,
    clipboard: Clipboard,
    brush: Brush,
    last_pointer: Option<Point>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            renderer: PageRenderer::from_config(&config),
            document: None,
            store: AnnotationStore::default(),
            undo: UndoLog::new(config.max_undo),
            canvas: Canvas::new(),
            tools: ToolMachine::new(),
            latch: GestureLatch::default(),
            clipboard: Clipboard::new(),
            brush: Brush::new(&config.stroke_color, config.stroke_width),
            last_pointer: None,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Open PDF bytes, replacing the current document. On failure the
    /// current document and its annotations are left as they were.
    pub fn open_pdf(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let session = DocumentSession::open_pdf(name, bytes)?;
        self.open_session(session)
    }

    /// Open page images as a document without an original PDF.
    pub fn open_images(&mut self, name: &str, pages: ImagePages) -> Result<()> {
        self.open_session(DocumentSession::from_images(name, pages))
    }

    pub fn open_session(&mut self, session: DocumentSession) -> Result<()> {
        let page_count = session.page_count();
        self.store.reset(page_count);
        self.undo.clear_all();
        self.canvas.clear();
        self.tools.set_tool(Tool::Select, &mut self.latch);
        self.last_pointer = None;
        self.document = Some(session);
        info!(page_count, "document loaded");
        self.show_page(1)
    }

    pub fn document(&self) -> Option<&DocumentSession> {
        self.document.as_ref()
    }

    fn session(&self) -> Result<&DocumentSession> {
        self.document.as_ref().ok_or(PdfixError::NoDocument)
    }

    pub fn current_page(&self) -> Result<u32> {
        Ok(self.session()?.current_page())
    }

    pub fn page_count(&self) -> Result<u32> {
        Ok(self.session()?.page_count())
    }

    /// Size the canvas for `page` and load its stored scene.
    fn show_page(&mut self, page: u32) -> Result<()> {
        let session = self.document.as_mut().ok_or(PdfixError::NoDocument)?;
        session.set_current_page(page)?;
        let display = self.renderer.display_size(session.rasterizer(), page)?;
        self.canvas.set_size(display);
        match self.store.load_scene(page) {
            Some(scene) => self.canvas.load_scene(scene),
            None => self.canvas.clear(),
        }
        debug!(page, objects = self.canvas.len(), "page shown");
        Ok(())
    }

    /// Save the live scene, then show `page`. Navigating to a page that does
    /// not exist changes nothing.
    pub fn go_to_page(&mut self, page: u32) -> Result<()> {
        let current = self.current_page()?;
        self.store.check_page(page)?;
        self.store.save_scene(current, self.canvas.to_scene())?;
        let tool = self.tools.tool();
        self.tools.set_tool(tool, &mut self.latch);
        self.show_page(page)
    }

    pub fn tool(&self) -> Tool {
        self.tools.tool()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tools.set_tool(tool, &mut self.latch);
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Color and width for subsequent strokes and outlines.
    pub fn set_brush(&mut self, color: &str, width: f64) {
        self.brush = Brush::new(color, width.max(0.0));
    }

    pub fn pointer_down(&mut self, at: Point) -> Result<()> {
        self.pointer(Pointer::Down, at)
    }

    pub fn pointer_move(&mut self, at: Point) -> Result<()> {
        self.pointer(Pointer::Move, at)
    }

    pub fn pointer_up(&mut self, at: Point) -> Result<()> {
        self.pointer(Pointer::Up, at)
    }

    fn pointer(&mut self, event: Pointer, at: Point) -> Result<()> {
        let page = self.current_page()?;
        self.last_pointer = Some(at);
        let mut ctx = ToolContext {
            page,
            canvas: &mut self.canvas,
            undo: &mut self.undo,
            latch: &mut self.latch,
            brush: &self.brush,
            text_size: self.config.text_size,
            redaction_pad: self.config.redaction_pad,
        };
        match event {
            Pointer::Down => self.tools.pointer_down(&mut ctx, at),
            Pointer::Move => self.tools.pointer_move(&mut ctx, at),
            Pointer::Up => self.tools.pointer_up(&mut ctx, at),
        }
        Ok(())
    }

    /// Restore the live scene to the last snapshot of the current page.
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        let page = self.current_page()?;
        let Some(scene) = self.undo.undo(page) else {
            return Ok(false);
        };
        let _guard = self.undo.suppress();
        let tool = self.tools.tool();
        self.tools.set_tool(tool, &mut self.latch);
        self.canvas.load_scene(&scene);
        debug!(page, remaining = self.undo.depth(page), "undo");
        Ok(true)
    }

    pub fn undo_depth(&self) -> Result<usize> {
        Ok(self.undo.depth(self.current_page()?))
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn select(&mut self, ids: &[ObjectId]) {
        self.canvas.select(ids);
    }

    pub fn select_all(&mut self) {
        self.canvas.select_all();
    }

    /// Select the topmost object under `at`, or nothing.
    pub fn select_at(&mut self, at: Point) -> Option<ObjectId> {
        let hit = self.canvas.hit_test(at);
        match hit {
            Some(id) => self.canvas.select(&[id]),
            None => self.canvas.clear_selection(),
        }
        hit
    }

    fn snapshot(&mut self) -> Result<()> {
        let page = self.current_page()?;
        let live = self.canvas.to_scene();
        self.undo.snapshot(page, &live);
        Ok(())
    }

    fn require_selection(&self) -> std::result::Result<Vec<ObjectId>, SelectionRequired> {
        let selected = self.canvas.selection().to_vec();
        if selected.is_empty() {
            Err(SelectionRequired)
        } else {
            Ok(selected)
        }
    }

    /// Delete the selection as one undoable action. Returns how many
    /// objects were removed.
    pub fn delete_selected(&mut self) -> std::result::Result<usize, SelectionRequired> {
        let selected = self.require_selection()?;
        if let Some(page) = self.document.as_ref().map(DocumentSession::current_page) {
            let live = self.canvas.to_scene();
            self.undo.snapshot(page, &live);
        }
        let removed = selected
            .into_iter()
            .filter_map(|id| self.canvas.remove(id))
            .count();
        Ok(removed)
    }

    /// Copy the selection into the clipboard, replacing its contents.
    pub fn copy(&mut self) -> std::result::Result<usize, SelectionRequired> {
        self.require_selection()?;
        let objects: Vec<SceneObject> = self
            .canvas
            .selected_objects()
            .into_iter()
            .cloned()
            .collect();
        let count = objects.len();
        self.clipboard.set(objects);
        Ok(count)
    }

    pub fn cut(&mut self) -> std::result::Result<usize, SelectionRequired> {
        self.copy()?;
        self.delete_selected()
    }

    /// Paste the clipboard centered on the last pointer position (or the
    /// page center) and select the pasted objects. Returns how many objects
    /// were added; an empty clipboard adds none.
    pub fn paste(&mut self) -> Result<usize> {
        self.current_page()?;
        let size = self.canvas.size();
        let center = self
            .last_pointer
            .unwrap_or(Point::new(size.width / 2.0, size.height / 2.0));
        let Some(objects) = self.clipboard.paste_at(center) else {
            return Ok(0);
        };
        self.snapshot()?;
        let ids: Vec<ObjectId> = objects
            .into_iter()
            .map(|object| self.canvas.add(object))
            .collect();
        self.canvas.select(&ids);
        Ok(ids.len())
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Remove every annotation from `page` together with its undo history.
    pub fn clear_page(&mut self, page: u32) -> Result<()> {
        let current = self.current_page()?;
        self.store.check_page(page)?;
        self.store.clear(page);
        self.undo.clear_page(page);
        if page == current {
            let tool = self.tools.tool();
            self.tools.set_tool(tool, &mut self.latch);
            self.canvas.clear();
        }
        info!(page, "page cleared");
        Ok(())
    }

    /// The live scene of the displayed page.
    pub fn live_scene(&self) -> PageScene {
        self.canvas.to_scene()
    }

    /// Scene of any page: live for the displayed one, stored otherwise.
    pub fn scene(&self, page: u32) -> Result<PageScene> {
        if page == self.current_page()? {
            return Ok(self.live_scene());
        }
        self.store.check_page(page)?;
        Ok(self.store.load_scene(page).cloned().unwrap_or_default())
    }

    /// Replace the scenes of the given pages, e.g. from a saved scene file.
    /// The displayed page is reloaded when it is among them.
    pub fn load_scenes(&mut self, scenes: BTreeMap<u32, PageScene>) -> Result<()> {
        let current = self.current_page()?;
        for page in scenes.keys() {
            self.store.check_page(*page)?;
        }
        for (page, scene) in scenes {
            if page == current {
                self.canvas.load_scene(&scene);
            }
            self.store.save_scene(page, scene)?;
        }
        Ok(())
    }

    /// Every page with annotations, current page taken from the canvas.
    pub fn scenes(&self) -> Result<BTreeMap<u32, PageScene>> {
        let current = self.current_page()?;
        let mut scenes: BTreeMap<u32, PageScene> = self
            .store
            .pages()
            .filter_map(|page| Some((page, self.store.load_scene(page)?.clone())))
            .collect();
        scenes.insert(current, self.live_scene());
        scenes.retain(|_, scene| !scene.is_empty());
        Ok(scenes)
    }

    /// Build the output PDF from the current state. Nothing is modified.
    pub fn export(&self) -> Result<Vec<u8>> {
        let session = self.session()?;
        let scenes = self.scenes()?;
        info!(annotated_pages = scenes.len(), "exporting");
        export_document(&ExportInput {
            original: session.original(),
            rasterizer: session.rasterizer(),
            renderer: &self.renderer,
            export_scale: self.config.export_scale,
            scenes: &scenes,
        })
    }

    /// The displayed page with its live annotations.
    pub fn render_current(&self) -> Result<RenderedPage> {
        let session = self.session()?;
        let live = self.live_scene();
        self.renderer
            .render(session.rasterizer(), session.current_page(), Some(&live))
    }
}
