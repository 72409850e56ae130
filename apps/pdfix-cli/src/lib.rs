//! pdfix command line
//!
//! Thin wrapper over `pdfix-core` for batch editing: open a PDF or page
//! images, apply a saved scene file or a command script, then export or
//! preview the result.

pub mod commands;
pub mod config;

pub use config::Config;
