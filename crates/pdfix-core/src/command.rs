//! Scripted editor commands
//!
//! A script is a JSON array of commands, e.g.
//! `[{"action":"tool","tool":"rectangle"},{"action":"down","x":10,"y":10}]`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coords::Point;
use crate::editor::Editor;
use crate::error::Result;
use crate::tool::Tool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum EditCommand {
    Tool {
        tool: Tool,
    },
    Down {
        x: f64,
        y: f64,
    },
    Move {
        x: f64,
        y: f64,
    },
    Up {
        x: f64,
        y: f64,
    },
    Undo,
    Page {
        page: u32,
    },
    /// Select the topmost object at a point, or everything when no point is
    /// given.
    Select {
        #[serde(default)]
        at: Option<Point>,
    },
    Delete,
    Copy,
    Cut,
    Paste,
    /// Clear a page; defaults to the displayed one.
    Clear {
        #[serde(default)]
        page: Option<u32>,
    },
    Brush {
        color: String,
        width: f64,
    },
}

/// What a command did that a user should hear about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CommandOutcome {
    Applied,
    /// Nothing to act on; carries the message to show.
    Guidance { message: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    pub applied: usize,
    pub guidance: Vec<String>,
    pub metrics: Option<ReplayMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayMetrics {
    pub command_count: usize,
    pub annotated_pages: usize,
    pub object_count: usize,
}

pub fn parse_script(json: &str) -> Result<Vec<EditCommand>> {
    Ok(serde_json::from_str(json)?)
}

impl EditCommand {
    pub fn apply(&self, editor: &mut Editor) -> Result<CommandOutcome> {
        match self {
            EditCommand::Tool { tool } => editor.set_tool(*tool),
            EditCommand::Down { x, y } => editor.pointer_down(Point::new(*x, *y))?,
            EditCommand::Move { x, y } => editor.pointer_move(Point::new(*x, *y))?,
            EditCommand::Up { x, y } => editor.pointer_up(Point::new(*x, *y))?,
            EditCommand::Undo => {
                editor.undo()?;
            }
            EditCommand::Page { page } => editor.go_to_page(*page)?,
            EditCommand::Select { at } => match at {
                Some(point) => {
                    editor.select_at(*point);
                }
                None => editor.select_all(),
            },
            EditCommand::Delete => return Ok(guided(editor.delete_selected())),
            EditCommand::Copy => return Ok(guided(editor.copy())),
            EditCommand::Cut => return Ok(guided(editor.cut())),
            EditCommand::Paste => {
                editor.paste()?;
            }
            EditCommand::Clear { page } => {
                let page = match page {
                    Some(page) => *page,
                    None => editor.current_page()?,
                };
                editor.clear_page(page)?;
            }
            EditCommand::Brush { color, width } => editor.set_brush(color, *width),
        }
        Ok(CommandOutcome::Applied)
    }
}

fn guided<T, E: std::fmt::Display>(result: std::result::Result<T, E>) -> CommandOutcome {
    match result {
        Ok(_) => CommandOutcome::Applied,
        Err(e) => CommandOutcome::Guidance {
            message: e.to_string(),
        },
    }
}

/// Apply `commands` in order, stopping at the first error.
pub fn replay(editor: &mut Editor, commands: &[EditCommand]) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();
    for (index, command) in commands.iter().enumerate() {
        debug!(index, ?command, "replaying");
        match command.apply(editor)? {
            CommandOutcome::Applied => report.applied += 1,
            CommandOutcome::Guidance { message } => report.guidance.push(message),
        }
    }
    let scenes = editor.scenes()?;
    report.metrics = Some(ReplayMetrics {
        command_count: commands.len(),
        annotated_pages: scenes.len(),
        object_count: scenes.values().map(|s| s.len()).sum(),
    });
    Ok(report)
}
