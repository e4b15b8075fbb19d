//! Export settings assembled once per run from the preference store.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::infra::{PrefValue, PreferenceStore};

/// Default HTML tag to Markdown token table.
pub const DEFAULT_TAG_TABLE: &[(&str, &str)] = &[
    ("<p>", ""),
    ("</p>", ""),
    ("<strong>", "**"),
    ("</strong>", "**"),
    ("<b>", "**"),
    ("</b>", "**"),
    ("<u>", "#### "),
    ("</u>", ""),
    ("<em>", "*"),
    ("</em>", "*"),
    ("<blockquote>", "> "),
    ("</blockquote>", ""),
    ("<br><br>", "\n\n"),
];

fn default_tag_table() -> Vec<(String, String)> {
    DEFAULT_TAG_TABLE
        .iter()
        .map(|(tag, token)| (tag.to_string(), token.to_string()))
        .collect()
}

/// The default tag table as the JSON object stored in `html_to_md`.
pub fn default_tag_table_json() -> String {
    let map: serde_json::Map<String, serde_json::Value> = DEFAULT_TAG_TABLE
        .iter()
        .map(|(tag, token)| (tag.to_string(), serde_json::Value::from(*token)))
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// Preference names and their defaults, in display order.
pub fn default_preferences() -> Vec<(&'static str, PrefValue)> {
    vec![
        ("bullet", "*".into()),
        ("link_style", "plain".into()),
        ("pdf_link_style", "zotero".into()),
        ("citekey_title", false.into()),
        ("file_conf", "single".into()),
        ("directory", "".into()),
        ("templates.directory", "".into()),
        ("files.hub.prefix", "".into()),
        ("files.hub.suffix", "".into()),
        ("files.standalone.prefix", "".into()),
        ("files.standalone.suffix", "".into()),
        ("files.note.prefix", "".into()),
        ("files.note.suffix", "".into()),
        ("files.metadata.prefix", "".into()),
        ("files.metadata.suffix", "-zotero".into()),
        ("create_hub_file", true.into()),
        ("attach_to_library", true.into()),
        ("html_to_md", PrefValue::Text(default_tag_table_json())),
        ("vault.name", "".into()),
        ("vault.attach_uri", false.into()),
    ]
}

/// How internal links between exported files are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    #[default]
    Plain,
    Wiki,
    Markdown,
}

impl FromStr for LinkStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "" => Ok(LinkStyle::Plain),
            "wiki" => Ok(LinkStyle::Wiki),
            "markdown" => Ok(LinkStyle::Markdown),
            other => Err(format!("unknown link style '{other}'")),
        }
    }
}

/// How PDF attachments are linked from metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfLinkStyle {
    /// Deep link opening the PDF in the library app.
    #[default]
    Library,
    /// `file://` URI of the attachment.
    File,
    /// Wiki link to the attachment title.
    Wiki,
}

impl FromStr for PdfLinkStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zotero" | "library" | "" => Ok(PdfLinkStyle::Library),
            "file" => Ok(PdfLinkStyle::File),
            "wiki" => Ok(PdfLinkStyle::Wiki),
            other => Err(format!("unknown PDF link style '{other}'")),
        }
    }
}

/// Whether each record exports to one file or one file per note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileLayout {
    #[default]
    Single,
    Split,
}

impl FromStr for FileLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "" => Ok(FileLayout::Single),
            "split" => Ok(FileLayout::Split),
            other => Err(format!("unknown file layout '{other}'")),
        }
    }
}

/// Categories of output files, each with its own prefix and suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Hub,
    StandaloneNote,
    ChildNote,
    Metadata,
}

impl FileCategory {
    /// Preference key stem for this category's prefix and suffix.
    pub fn pref_stem(self) -> &'static str {
        match self {
            FileCategory::Hub => "files.hub",
            FileCategory::StandaloneNote => "files.standalone",
            FileCategory::ChildNote => "files.note",
            FileCategory::Metadata => "files.metadata",
        }
    }
}

/// Prefix and suffix wrapped around a base file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Affixes {
    pub prefix: String,
    pub suffix: String,
}

/// Naming rules applied to one file category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention<'a> {
    pub use_citation_key_as_title: bool,
    pub link_style: LinkStyle,
    pub prefix: &'a str,
    pub suffix: &'a str,
}

/// All settings one export run needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportConfig {
    pub bullet: String,
    pub link_style: LinkStyle,
    pub pdf_link_style: PdfLinkStyle,
    pub citekey_title: bool,
    pub layout: FileLayout,
    pub output_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
    pub hub: Affixes,
    pub standalone: Affixes,
    pub note: Affixes,
    pub metadata: Affixes,
    pub create_hub_file: bool,
    pub attach_to_library: bool,
    /// Tag to token pairs applied to note markup.
    pub html_to_md: Vec<(String, String)>,
    pub vault_name: String,
    pub attach_vault_uri: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            bullet: "*".to_string(),
            link_style: LinkStyle::Plain,
            pdf_link_style: PdfLinkStyle::Library,
            citekey_title: false,
            layout: FileLayout::Single,
            output_dir: None,
            templates_dir: None,
            hub: Affixes::default(),
            standalone: Affixes::default(),
            note: Affixes::default(),
            metadata: Affixes {
                prefix: String::new(),
                suffix: "-zotero".to_string(),
            },
            create_hub_file: true,
            attach_to_library: true,
            html_to_md: default_tag_table(),
            vault_name: String::new(),
            attach_vault_uri: false,
        }
    }
}

impl ExportConfig {
    /// Reads every export setting from the store, falling back to defaults.
    ///
    /// Unrecognized enum values and an unparseable tag table are logged and
    /// replaced with their defaults.
    pub fn from_prefs<P: PreferenceStore + ?Sized>(prefs: &P) -> Self {
        let defaults = Self::default();
        let text = |name: &str| prefs.get_str(name);
        let flag = |name: &str, default: bool| prefs.get_bool(name).unwrap_or(default);
        let dir = |name: &str| {
            text(name)
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
        };
        let affixes = |category: FileCategory, default: &Affixes| Affixes {
            prefix: text(&format!("{}.prefix", category.pref_stem()))
                .unwrap_or_else(|| default.prefix.clone()),
            suffix: text(&format!("{}.suffix", category.pref_stem()))
                .unwrap_or_else(|| default.suffix.clone()),
        };

        let html_to_md = match text("html_to_md") {
            Some(raw) => parse_tag_table(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "invalid html_to_md table, using default");
                defaults.html_to_md.clone()
            }),
            None => defaults.html_to_md.clone(),
        };

        Self {
            bullet: text("bullet").unwrap_or(defaults.bullet.clone()),
            link_style: parse_or_default(text("link_style"), "link_style"),
            pdf_link_style: parse_or_default(text("pdf_link_style"), "pdf_link_style"),
            citekey_title: flag("citekey_title", defaults.citekey_title),
            layout: parse_or_default(text("file_conf"), "file_conf"),
            output_dir: dir("directory"),
            templates_dir: dir("templates.directory"),
            hub: affixes(FileCategory::Hub, &defaults.hub),
            standalone: affixes(FileCategory::StandaloneNote, &defaults.standalone),
            note: affixes(FileCategory::ChildNote, &defaults.note),
            metadata: affixes(FileCategory::Metadata, &defaults.metadata),
            create_hub_file: flag("create_hub_file", defaults.create_hub_file),
            attach_to_library: flag("attach_to_library", defaults.attach_to_library),
            html_to_md,
            vault_name: text("vault.name").unwrap_or_default(),
            attach_vault_uri: flag("vault.attach_uri", defaults.attach_vault_uri),
        }
    }

    pub fn affixes(&self, category: FileCategory) -> &Affixes {
        match category {
            FileCategory::Hub => &self.hub,
            FileCategory::StandaloneNote => &self.standalone,
            FileCategory::ChildNote => &self.note,
            FileCategory::Metadata => &self.metadata,
        }
    }

    /// Naming rules for a file category.
    pub fn naming(&self, category: FileCategory) -> NamingConvention<'_> {
        let affixes = self.affixes(category);
        NamingConvention {
            use_citation_key_as_title: self.citekey_title,
            link_style: self.link_style,
            prefix: &affixes.prefix,
            suffix: &affixes.suffix,
        }
    }
}

fn parse_or_default<T: FromStr<Err = String> + Default>(raw: Option<String>, name: &str) -> T {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|err: String| {
            warn!(preference = name, error = %err, "using default");
            T::default()
        }),
        None => T::default(),
    }
}

/// Parses a JSON object of tag to token pairs.
pub fn parse_tag_table(raw: &str) -> Result<Vec<(String, String)>, serde_json::Error> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    Ok(map
        .into_iter()
        .map(|(tag, token)| {
            let token = match token {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (tag, token)
        })
        .collect())
}
