//! Handler for the `preview` command.

use anyhow::Result;

use crate::cli::PreviewArgs;
use crate::cli::output::OutputFormat;
use crate::domain::ExportFile;
use crate::export::{ExportConfig, Exporter};
use crate::infra::{LocalFs, PrefsFile};
use crate::library::RecordStore;

use super::{open_library, print_json};

/// Handle the `preview` command.
pub fn handle_preview(args: &PreviewArgs, prefs: &PrefsFile) -> Result<()> {
    let config = ExportConfig::from_prefs(prefs);
    let mut library = open_library(&args.library)?;
    let record = library.find_by_key(&args.key)?;
    let subject = library.subject(record)?;

    let exporter = Exporter::new(&mut library, &LocalFs, &config);
    let files = if args.merged {
        vec![exporter.single_file(&subject)?]
    } else {
        exporter.files(&subject)?
    };

    print_files(args.format, &files)
}

fn print_files(format: OutputFormat, files: &[ExportFile]) -> Result<()> {
    match format {
        OutputFormat::Human => {
            for (i, file) in files.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("==> {} <==", file.file_name());
                print!("{}", file.content);
                if !file.content.ends_with('\n') {
                    println!();
                }
            }
        }
        OutputFormat::Json => print_json(files)?,
        OutputFormat::Paths => {
            for file in files {
                println!("{}", file.file_name());
            }
        }
    }
    Ok(())
}
