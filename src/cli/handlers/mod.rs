//! Command handlers for the CLI.

mod config;
mod export;
mod preview;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::CommandFactory;
use serde::Serialize;

use crate::domain::RecordId;
use crate::library::JsonLibrary;

use super::output::Output;
use super::{Cli, CompletionsArgs};

pub use config::handle_config;
pub use export::handle_export;
pub use preview::handle_preview;

// ===========================================
// Shared Utilities
// ===========================================

/// Opens the library snapshot named on the command line.
pub(crate) fn open_library(path: &Path) -> Result<JsonLibrary> {
    JsonLibrary::open(path).with_context(|| format!("failed to open library {}", path.display()))
}

/// Resolves the records to export: explicit keys, or every top-level record.
pub(crate) fn select_records(library: &JsonLibrary, keys: &[String], all: bool) -> Result<Vec<RecordId>> {
    if all {
        return Ok(library.top_level_ids());
    }
    keys.iter()
        .map(|key| -> Result<RecordId> { Ok(library.find_by_key(key)?.id) })
        .collect()
}

/// Prints a value as pretty JSON wrapped in `{"data": ...}`.
pub(crate) fn print_json<T: Serialize>(data: T) -> Result<()> {
    let json = serde_json::to_string_pretty(&Output::new(data))?;
    println!("{json}");
    Ok(())
}

/// Handle the `completions` command.
pub fn handle_completions(args: &CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let mut stdout = std::io::stdout();
    clap_complete::generate(args.shell, &mut cmd, "mdnotes", &mut stdout);
    stdout.flush()?;
    Ok(())
}
