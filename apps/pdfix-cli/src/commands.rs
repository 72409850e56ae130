//! Subcommand implementations
//!
//! Each command loads a fresh [`Editor`], optionally seeds it with saved
//! scenes, and writes its result to a file or stdout.

use anyhow::{bail, Context};
use pdfix_core::{
    parse_scene_file, parse_script, replay, Editor, EditorConfig, ImagePages, PageRenderer,
    ReplayReport,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;

/// Open `inputs` in a new editor. A single `.pdf` input keeps its original
/// bytes for vector export; anything else is decoded as one image per page.
pub fn open_editor(config: &EditorConfig, inputs: &[PathBuf]) -> anyhow::Result<Editor> {
    let first = match inputs.first() {
        Some(first) => first,
        None => bail!("No input files given"),
    };
    let name = display_name(first);
    let mut editor = Editor::new(config.clone());

    if is_pdf(first) {
        if inputs.len() > 1 {
            bail!("Only one PDF can be edited at a time ({} given)", inputs.len());
        }
        let bytes =
            fs::read(first).with_context(|| format!("Failed to read {}", first.display()))?;
        editor
            .open_pdf(&name, bytes)
            .with_context(|| format!("Failed to open {}", first.display()))?;
    } else {
        let mut encoded = Vec::with_capacity(inputs.len());
        for path in inputs {
            if is_pdf(path) {
                bail!("Cannot mix PDFs and images: {}", path.display());
            }
            encoded.push(fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?);
        }
        let pages = ImagePages::decode(&encoded).context("Failed to decode page images")?;
        editor.open_images(&name, pages)?;
    }
    Ok(editor)
}

/// Replace the editor's scenes with those saved in a scene file.
pub fn load_scene_file(editor: &mut Editor, path: &Path) -> anyhow::Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene file: {}", path.display()))?;
    let scenes = parse_scene_file(&json)
        .with_context(|| format!("Invalid scene file: {}", path.display()))?;
    info!(pages = scenes.len(), "loaded scenes");
    editor.load_scenes(scenes)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct Inspection {
    pub name: String,
    pub page_count: u32,
    pub has_original: bool,
    pub pages: Vec<PageInfo>,
}

#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub width: f64,
    pub height: f64,
    pub display_width: f64,
    pub display_height: f64,
    pub objects: usize,
}

pub fn inspect(editor: &Editor) -> anyhow::Result<Inspection> {
    let document = editor.document().context("No document open")?;
    let renderer = PageRenderer::from_config(editor.config());
    let rasterizer = document.rasterizer();

    let mut pages = Vec::new();
    for page in 1..=document.page_count() {
        let size = rasterizer.page_size(page)?;
        let display = renderer.display_size(rasterizer, page)?;
        pages.push(PageInfo {
            page,
            width: size.width,
            height: size.height,
            display_width: display.width,
            display_height: display.height,
            objects: editor.scene(page)?.len(),
        });
    }
    Ok(Inspection {
        name: document.name().to_string(),
        page_count: document.page_count(),
        has_original: document.original().is_some(),
        pages,
    })
}

/// Write a PNG preview of `page` with its annotations.
pub fn render_preview(editor: &mut Editor, page: u32, output: &Path) -> anyhow::Result<()> {
    editor.go_to_page(page)?;
    let rendered = editor.render_current()?;
    rendered
        .composite()?
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(page, path = %output.display(), "wrote preview");
    Ok(())
}

/// Export to `explicit`, or to the configured output location.
pub fn export(editor: &Editor, config: &Config, explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let suggested = editor
        .document()
        .map(|doc| doc.export_name())
        .context("No document open")?;
    let path = config.output.resolve(explicit, &suggested);
    let bytes = editor.export()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "exported");
    Ok(path)
}

pub fn replay_script(editor: &mut Editor, script: &Path) -> anyhow::Result<ReplayReport> {
    let json = fs::read_to_string(script)
        .with_context(|| format!("Failed to read script: {}", script.display()))?;
    let commands = parse_script(&json).with_context(|| format!("Invalid script: {}", script.display()))?;
    let report = replay(editor, &commands)?;
    Ok(report)
}

/// Current scenes in the scene-file format accepted by [`load_scene_file`].
pub fn scenes_json(editor: &Editor) -> anyhow::Result<String> {
    let scenes = editor.scenes()?;
    let keyed: std::collections::BTreeMap<String, _> = scenes
        .into_iter()
        .map(|(page, scene)| (page.to_string(), scene))
        .collect();
    Ok(serde_json::to_string_pretty(&keyed)?)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
