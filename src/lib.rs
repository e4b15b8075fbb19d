//! mdnotes - export library records and their notes to Markdown

pub mod cli;
pub mod domain;
pub mod export;
pub mod infra;
pub mod library;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use cli::{
    Cli, Command,
    handlers::{handle_completions, handle_config, handle_export, handle_preview},
};
use infra::{PrefsFile, init_tracing};

/// Main entry point for the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose).map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    let prefs_path = cli.prefs.clone().unwrap_or_else(PrefsFile::default_path);
    let mut prefs = PrefsFile::load(&prefs_path)
        .with_context(|| format!("failed to load preferences from {}", prefs_path.display()))?;

    match &cli.command {
        Command::Export(args) => handle_export(args, &prefs),
        Command::Preview(args) => handle_preview(args, &prefs),
        Command::Config(args) => handle_config(args, &mut prefs),
        Command::Completions(args) => handle_completions(args),
    }
}
