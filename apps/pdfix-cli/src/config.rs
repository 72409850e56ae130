//! Configuration file for the pdfix command line
//!
//! ```toml
//! [editor]
//! base_scale = 1.8
//! export_scale = 4.0
//!
//! [output]
//! directory = "out"
//! ```
//!
//! Both tables are optional.

use anyhow::Context;
use pdfix_core::EditorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config
            .editor
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid [editor] settings")?;
        Ok(config)
    }

    /// Config file if given, built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name used when no output path is given (default: derived from
    /// the input name, `<stem>-edited.pdf`)
    #[serde(default)]
    pub file_name: Option<String>,
    /// Directory for outputs without an explicit path (default: current directory)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl OutputConfig {
    /// `explicit` if given, else the configured (or `suggested`) file name
    /// in the configured directory.
    pub fn resolve(&self, explicit: Option<&Path>, suggested: &str) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        let name = self.file_name.as_deref().unwrap_or(suggested);
        match &self.directory {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}
