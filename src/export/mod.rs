//! Rendering records and notes to Markdown files.
//!
//! The pipeline runs one way: record → fields → normalized note text →
//! rendered template → named output file.

mod bundle;
mod config;
mod fields;
mod html_note;
mod naming;
mod template;

pub use bundle::{BatchReport, ExportError, Exporter, RecordFailure, vault_uri};
pub use config::{
    Affixes, DEFAULT_TAG_TABLE, ExportConfig, FileCategory, FileLayout, LinkStyle,
    NamingConvention, PdfLinkStyle, default_preferences, default_tag_table_json, parse_tag_table,
};
pub use fields::{FieldExtractor, date_added, item_type_label};
pub use html_note::{MarkdownNote, NoteNormalizer, TagReplacer, format_note_title, note_title};
pub use naming::{FileNamer, format_internal_link};
pub use template::{
    DEFAULT_CHILD_TEMPLATE, DEFAULT_HUB_TEMPLATE, TemplateEngine, TemplateError, TemplateKind,
    replace_wildcards, resolve_template,
};
