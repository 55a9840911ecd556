//! CLI command handlers

pub mod commands;

pub use commands::{apply, load_config, preview, sections};
