//! Handler for the `export` command.

use anyhow::{Context, Result, bail};

use crate::cli::ExportArgs;
use crate::cli::output::OutputFormat;
use crate::export::{BatchReport, ExportConfig, ExportError, Exporter};
use crate::infra::{LocalFs, PrefsFile, normalize_path};

use super::{open_library, print_json, select_records};

/// Handle the `export` command.
pub fn handle_export(args: &ExportArgs, prefs: &PrefsFile) -> Result<()> {
    let mut config = ExportConfig::from_prefs(prefs);
    if let Some(output) = &args.output {
        config.output_dir = Some(output.clone());
    }
    if let Some(layout) = args.layout {
        config.layout = layout.into();
    }

    let Some(output_dir) = config.output_dir.clone() else {
        return Err(ExportError::NoOutputDirectory.into());
    };

    let mut library = open_library(&args.library)?;
    let ids = select_records(&library, &args.items, args.all)?;

    if !args.dry_run {
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("failed to create output directory {}", output_dir.display())
        })?;
    }
    // Linked attachment paths must not depend on the working directory.
    let output_dir = std::path::absolute(&output_dir).with_context(|| {
        format!("failed to resolve output directory {}", output_dir.display())
    })?;
    config.output_dir = Some(normalize_path(&output_dir));

    let report = Exporter::new(&mut library, &LocalFs, &config).export_batch(&ids, args.dry_run)?;

    if library.is_dirty() {
        library
            .save()
            .with_context(|| format!("failed to save links to {}", args.library.display()))?;
    }

    print_report(args.format, &report)?;

    if !report.is_success() {
        bail!(
            "{} of {} records failed to export",
            report.failures.len(),
            ids.len()
        );
    }
    Ok(())
}

fn print_report(format: OutputFormat, report: &BatchReport) -> Result<()> {
    match format {
        OutputFormat::Human => {
            let verb = if report.dry_run { "Would write" } else { "Wrote" };
            println!("{verb} {} files", report.written.len());
            for path in &report.written {
                println!("  {}", path.display());
            }
            if !report.skipped.is_empty() {
                println!("Skipped {} existing hub files", report.skipped.len());
                for path in &report.skipped {
                    println!("  {}", path.display());
                }
            }
            for failure in &report.failures {
                eprintln!("  failed: record {}: {}", failure.id, failure.error);
            }
        }
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Paths => {
            for path in &report.written {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}
