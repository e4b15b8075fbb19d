//! CLI command definitions and handlers

pub mod handlers;
pub mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::export::FileLayout;
use output::OutputFormat;

/// mdnotes - export library records and notes to Markdown
#[derive(Parser, Debug)]
#[command(name = "mdnotes", version, about, long_about = None)]
pub struct Cli {
    /// Preference file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub prefs: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export records and notes to Markdown files
    Export(ExportArgs),

    /// Render a record or note to stdout without writing anything
    Preview(PreviewArgs),

    /// Read and change preferences
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// File layout override for the `export` command
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LayoutArg {
    /// One file per record, notes included
    Single,
    /// A hub file plus one file per note
    Split,
}

impl From<LayoutArg> for FileLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Single => FileLayout::Single,
            LayoutArg::Split => FileLayout::Split,
        }
    }
}

/// Arguments for the `export` command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Library snapshot (JSON)
    #[arg(short, long)]
    pub library: PathBuf,

    /// Record key to export (can be specified multiple times)
    #[arg(short, long = "item", action = ArgAction::Append, required_unless_present = "all")]
    pub items: Vec<String>,

    /// Export every top-level record
    #[arg(long, conflicts_with = "items")]
    pub all: bool,

    /// Output directory (overrides the 'directory' preference)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// File layout (overrides the 'file_conf' preference)
    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,

    /// Render and report without writing files or linking attachments
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `preview` command
#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Library snapshot (JSON)
    #[arg(short, long)]
    pub library: PathBuf,

    /// Record or note key
    pub key: String,

    /// Print all files merged into one document
    #[arg(long)]
    pub merged: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `config` command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// List every preference with its current value
    List {
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },

    /// Print one preference
    Get {
        /// Preference name (e.g. link_style, files.hub.prefix)
        name: String,
    },

    /// Change one preference
    Set {
        /// Preference name
        name: String,

        /// New value
        value: String,
    },

    /// Print the preference file path
    Path,
}

/// Arguments for the `completions` command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for (bash, zsh, fish)
    #[arg(value_enum)]
    pub shell: Shell,
}
