//! pdfix binary
//!
//! Logs go to stderr so JSON output on stdout stays parseable.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pdfix_cli::{commands, Config};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfix")]
#[command(version, about = "Annotate, redact and sign PDFs and scanned pages")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print page geometry and annotation counts as JSON
    Inspect {
        /// A PDF, or one image per page
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Scene file to load before inspecting
        #[arg(short, long)]
        scenes: Option<PathBuf>,
    },
    /// Write a PNG preview of one page with its annotations
    Render {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(short, long)]
        scenes: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Apply a scene file and export the edited PDF
    Export {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        scenes: PathBuf,
        /// Defaults to `<input>-edited.pdf`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a JSON command script, then export
    Replay {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        script: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also save the resulting scenes
        #[arg(long)]
        save_scenes: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("pdfix v{}", env!("CARGO_PKG_VERSION"));
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Inspect { inputs, scenes } => {
            let mut editor = commands::open_editor(&config.editor, &inputs)?;
            if let Some(scenes) = scenes {
                commands::load_scene_file(&mut editor, &scenes)?;
            }
            let inspection = commands::inspect(&editor)?;
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        }
        Command::Render {
            inputs,
            page,
            scenes,
            output,
        } => {
            let mut editor = commands::open_editor(&config.editor, &inputs)?;
            if let Some(scenes) = scenes {
                commands::load_scene_file(&mut editor, &scenes)?;
            }
            commands::render_preview(&mut editor, page, &output)?;
        }
        Command::Export {
            inputs,
            scenes,
            output,
        } => {
            let mut editor = commands::open_editor(&config.editor, &inputs)?;
            commands::load_scene_file(&mut editor, &scenes)?;
            let path = commands::export(&editor, &config, output.as_deref())?;
            println!("{}", path.display());
        }
        Command::Replay {
            inputs,
            script,
            output,
            save_scenes,
        } => {
            let mut editor = commands::open_editor(&config.editor, &inputs)?;
            let report = commands::replay_script(&mut editor, &script)?;
            for message in &report.guidance {
                tracing::warn!("{}", message);
            }
            if let Some(path) = save_scenes {
                let json = commands::scenes_json(&editor)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            let path = commands::export(&editor, &config, output.as_deref())?;
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
            println!("{}", path.display());
        }
    }

    Ok(())
}
