//! Output file names and internal links.

use crate::domain::{BibliographicRecord, Subject};
use crate::infra::{dash_title, valid_file_name};
use crate::library::KeyManager;

use super::config::{ExportConfig, FileCategory, LinkStyle};
use super::html_note::note_title;

/// Formats a file name as an internal link in the given style.
///
/// ```
/// use mdnotes::export::{LinkStyle, format_internal_link};
///
/// assert_eq!(format_internal_link("Smith 2020", LinkStyle::Wiki), "[[Smith 2020]]");
/// assert_eq!(format_internal_link("Smith 2020", LinkStyle::Markdown), "[Smith 2020](smith-2020)");
/// assert_eq!(format_internal_link("Smith 2020", LinkStyle::Plain), "Smith 2020");
/// ```
pub fn format_internal_link(name: &str, style: LinkStyle) -> String {
    match style {
        LinkStyle::Wiki => format!("[[{name}]]"),
        LinkStyle::Markdown => format!("[{name}]({})", dash_title(name)),
        LinkStyle::Plain => name.to_string(),
    }
}

/// Resolves file names for records under one export configuration.
pub struct FileNamer<'a> {
    config: &'a ExportConfig,
    keys: &'a dyn KeyManager,
}

impl<'a> FileNamer<'a> {
    pub fn new(config: &'a ExportConfig, keys: &'a dyn KeyManager) -> Self {
        Self { config, keys }
    }

    /// Base name of a top-level record before affixes.
    ///
    /// Uses the citation key when configured and available, otherwise the
    /// title. Citation keys are kept verbatim; non-wiki link styles
    /// lower-case and dash titles.
    pub fn base_name(&self, record: &BibliographicRecord) -> String {
        let naming = self.config.naming(FileCategory::Hub);
        if naming.use_citation_key_as_title
            && let Some(key) = self.keys.citation_key(record.id)
        {
            return key;
        }
        self.style(record.title())
    }

    /// Name of a record's hub file.
    pub fn hub_name(&self, record: &BibliographicRecord) -> String {
        self.wrap(&self.base_name(record), FileCategory::Hub)
    }

    /// Name of a record's metadata file.
    pub fn metadata_name(&self, record: &BibliographicRecord) -> String {
        self.wrap(&self.base_name(record), FileCategory::Metadata)
    }

    /// Name of a note attached to `parent`: `"{parent base} - {note title}"`.
    pub fn child_note_name(&self, note: &BibliographicRecord, parent: &BibliographicRecord) -> String {
        let title = note_title(note.note.as_deref().unwrap_or(""));
        let base = format!("{} - {}", self.base_name(parent), title);
        self.wrap(&base, FileCategory::ChildNote)
    }

    /// Name of a note without a parent, styled like a record title.
    pub fn standalone_name(&self, note: &BibliographicRecord) -> String {
        let title = note_title(note.note.as_deref().unwrap_or(""));
        self.wrap(&self.style(&title), FileCategory::StandaloneNote)
    }

    /// Name of the primary file written for a subject.
    pub fn subject_name(&self, subject: &Subject) -> String {
        match subject {
            Subject::TopLevel(record) => self.hub_name(record),
            Subject::ChildNote { note, parent } => self.child_note_name(note, parent),
            Subject::StandaloneNote(note) => self.standalone_name(note),
        }
    }

    /// Formats a file name with the configured link style.
    pub fn link(&self, name: &str) -> String {
        format_internal_link(name, self.config.link_style)
    }

    fn style(&self, raw: &str) -> String {
        match self.config.link_style {
            LinkStyle::Wiki => raw.to_string(),
            LinkStyle::Plain | LinkStyle::Markdown => dash_title(raw),
        }
    }

    fn wrap(&self, base: &str, category: FileCategory) -> String {
        let naming = self.config.naming(category);
        format!("{}{}{}", naming.prefix, valid_file_name(base), naming.suffix)
    }
}
