//! Handler for the `config` command.

use anyhow::{Context, Result, bail};

use crate::cli::output::{OutputFormat, PrefListing};
use crate::cli::{ConfigArgs, ConfigCommand};
use crate::export::{FileLayout, LinkStyle, PdfLinkStyle, default_preferences, parse_tag_table};
use crate::infra::{PrefValue, PreferenceStore, PrefsFile};

use super::print_json;

/// Handle the `config` command.
pub fn handle_config(args: &ConfigArgs, prefs: &mut PrefsFile) -> Result<()> {
    match &args.command {
        ConfigCommand::List { format } => list(*format, prefs),
        ConfigCommand::Get { name } => {
            let value = effective_value(prefs, name)
                .with_context(|| format!("unknown preference '{name}'"))?;
            println!("{value}");
            Ok(())
        }
        ConfigCommand::Set { name, value } => {
            let value = validate(name, value)?;
            prefs.set(name, value.clone());
            prefs.save()?;
            println!("{name} = {value}");
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", prefs.path().display());
            Ok(())
        }
    }
}

/// Stored value of a preference, falling back to its default.
fn effective_value(prefs: &PrefsFile, name: &str) -> Option<PrefValue> {
    prefs.get(name).or_else(|| {
        default_preferences()
            .into_iter()
            .find(|(known, _)| *known == name)
            .map(|(_, value)| value)
    })
}

fn list(format: OutputFormat, prefs: &PrefsFile) -> Result<()> {
    let listings: Vec<PrefListing> = default_preferences()
        .into_iter()
        .map(|(name, default)| {
            let stored = prefs.get(name);
            PrefListing {
                name: name.to_string(),
                set: stored.is_some(),
                value: stored.unwrap_or(default).to_string(),
            }
        })
        .collect();

    match format {
        OutputFormat::Human => {
            let width = listings.iter().map(|l| l.name.len()).max().unwrap_or(0);
            for listing in &listings {
                let marker = if listing.set { "*" } else { " " };
                println!("{marker} {:<width$}  {}", listing.name, listing.value);
            }
        }
        OutputFormat::Json => print_json(&listings)?,
        OutputFormat::Paths => {
            for listing in &listings {
                println!("{}", listing.name);
            }
        }
    }
    Ok(())
}

/// Checks a value against the preference it is meant for.
fn validate(name: &str, raw: &str) -> Result<PrefValue> {
    let Some((_, default)) = default_preferences().into_iter().find(|(known, _)| *known == name)
    else {
        bail!("unknown preference '{name}'");
    };

    match name {
        "link_style" => {
            raw.parse::<LinkStyle>().map_err(anyhow::Error::msg)?;
        }
        "pdf_link_style" => {
            raw.parse::<PdfLinkStyle>().map_err(anyhow::Error::msg)?;
        }
        "file_conf" => {
            raw.parse::<FileLayout>().map_err(anyhow::Error::msg)?;
        }
        "html_to_md" => {
            parse_tag_table(raw).context("html_to_md must be a JSON object of tag to token")?;
        }
        _ => {}
    }

    if let PrefValue::Bool(_) = default {
        return match PrefValue::parse(raw) {
            value @ PrefValue::Bool(_) => Ok(value),
            _ => bail!("'{name}' expects true or false"),
        };
    }
    Ok(PrefValue::Text(raw.to_string()))
}
