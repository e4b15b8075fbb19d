//! Flat field records for templates.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::domain::{
    BibliographicRecord, MetadataRecord, NoteRecord, RecordKind, UNDEFINED,
};
use crate::infra::path_to_file_uri;
use crate::library::{KeyManager, LibraryResult, RecordStore};

use super::config::{ExportConfig, LinkStyle, PdfLinkStyle};
use super::html_note::{NoteNormalizer, note_title};
use super::naming::{FileNamer, format_internal_link};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Display labels for item types.
const TYPE_LABELS: &[(&str, &str)] = &[
    ("artwork", "Illustration"),
    ("audioRecording", "Recording"),
    ("bill", "Legislation"),
    ("blogPost", "Blog post"),
    ("book", "Book"),
    ("bookSection", "Chapter"),
    ("case", "Legal case"),
    ("computerProgram", "Data"),
    ("conferencePaper", "Conference paper"),
    ("email", "Letter"),
    ("encyclopediaArticle", "Encyclopaedia article"),
    ("film", "Film"),
    ("forumPost", "Forum post"),
    ("hearing", "Hearing"),
    ("instantMessage", "Instant message"),
    ("interview", "Interview"),
    ("journalArticle", "Article"),
    ("letter", "Letter"),
    ("magazineArticle", "Magazine article"),
    ("manuscript", "Manuscript"),
    ("map", "Image"),
    ("newspaperArticle", "Newspaper article"),
    ("patent", "Patent"),
    ("podcast", "Podcast"),
    ("presentation", "Presentation"),
    ("radioBroadcast", "Radio broadcast"),
    ("report", "Report"),
    ("statute", "Legislation"),
    ("thesis", "Thesis"),
    ("tvBroadcast", "TV broadcast"),
    ("videoRecording", "Recording"),
    ("webpage", "Webpage"),
];

/// Display label of an item type, if it has one.
pub fn item_type_label(item_type: &str) -> Option<&'static str> {
    TYPE_LABELS
        .iter()
        .find(|(name, _)| *name == item_type)
        .map(|(_, label)| *label)
}

/// Normalizes a stored timestamp to `YYYY-MM-DD`.
///
/// Returns an empty string when the value cannot be parsed.
pub fn date_added(raw: &str) -> String {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Builds template fields from library records.
pub struct FieldExtractor<'a> {
    store: &'a dyn RecordStore,
    keys: &'a dyn KeyManager,
    config: &'a ExportConfig,
    namer: FileNamer<'a>,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        keys: &'a dyn KeyManager,
        config: &'a ExportConfig,
    ) -> Self {
        Self {
            store,
            keys,
            config,
            namer: FileNamer::new(config, keys),
        }
    }

    pub fn namer(&self) -> &FileNamer<'a> {
        &self.namer
    }

    /// Fields of a top-level record.
    pub fn metadata(&self, record: &BibliographicRecord) -> LibraryResult<MetadataRecord> {
        let mut fields = MetadataRecord::new();

        fields.insert("author", Vec::<String>::new());
        for role in record.creator_roles() {
            fields.insert(role, record.creator_names(role));
        }
        fields.insert("authors", record.creator_names("author"));

        for (name, value) in &record.fields {
            fields.insert(name.as_str(), value.as_str());
        }

        if let Some(label) = item_type_label(&record.item_type) {
            fields.insert("itemType", label);
        }
        fields.insert(
            "citekey",
            self.keys
                .citation_key(record.id)
                .unwrap_or_else(|| UNDEFINED.to_string()),
        );
        fields.insert("collections", self.collection_names(record));

        let related = self.related_names(record)?;
        fields.insert("relatedLinks", self.links(&related));
        fields.insert("related", related);
        fields.insert("tags", record.tags.clone());
        fields.insert("pdfAttachments", self.pdf_links(record)?);
        fields.insert(
            "localLibrary",
            format!("zotero://select/items/{}_{}", record.library_id, record.key),
        );
        fields.insert("cloudLibrary", record.uri.clone().unwrap_or_default());
        fields.insert("dateAdded", date_added(record.field("dateAdded")));

        let notes: Vec<String> = self
            .store
            .notes(record.id)?
            .iter()
            .map(|note| self.namer.child_note_name(note, record))
            .collect();
        fields.insert("noteLinks", self.links(&notes));
        fields.insert("notes", notes);

        let hub = self.namer.hub_name(record);
        let metadata = self.namer.metadata_name(record);
        fields.insert("hubLink", self.namer.link(&hub));
        fields.insert("metadataLink", self.namer.link(&metadata));
        fields.insert("mdnotesFileName", hub.as_str());
        fields.insert("hubFileName", hub);
        fields.insert("metadataFileName", metadata);

        Ok(fields)
    }

    /// Normalized note plus the fields its template may use.
    ///
    /// `parent` is `None` for standalone notes, whose hub and metadata
    /// names are empty.
    pub fn note_record(
        &self,
        note: &BibliographicRecord,
        parent: Option<&BibliographicRecord>,
        normalizer: &NoteNormalizer,
    ) -> LibraryResult<NoteRecord> {
        let markdown = normalizer.normalize(note.note.as_deref().unwrap_or(""));
        let related = self.related_names(note)?;

        let (hub_file_name, metadata_file_name) = match parent {
            Some(parent) => (
                self.namer.hub_name(parent),
                self.namer.metadata_name(parent),
            ),
            None => (String::new(), String::new()),
        };
        let hub_link = if hub_file_name.is_empty() {
            String::new()
        } else {
            self.namer.link(&hub_file_name)
        };

        Ok(NoteRecord {
            title: markdown.title,
            body: markdown.body,
            tags: note.tags.clone(),
            related_links: self.links(&related),
            related,
            hub_file_name,
            hub_link,
            metadata_file_name,
        })
    }

    fn collection_names(&self, record: &BibliographicRecord) -> Vec<String> {
        record
            .collections
            .iter()
            .filter_map(|id| {
                let name = self.store.collection_name(*id);
                if name.is_none() {
                    warn!(collection = id.0, record = %record.key, "unknown collection");
                }
                name
            })
            .collect()
    }

    /// Link text for each related record, by the related record's kind.
    fn related_names(&self, record: &BibliographicRecord) -> LibraryResult<Vec<String>> {
        let mut names = Vec::with_capacity(record.relations.len());
        for id in &record.relations {
            let related = match self.store.record(*id) {
                Ok(related) => related,
                Err(err) => {
                    warn!(record = %record.key, error = %err, "skipping related record");
                    continue;
                }
            };
            let name = match related.kind() {
                RecordKind::Regular => self.namer.hub_name(&related),
                RecordKind::ChildNote { parent } => {
                    let parent = self.store.record(parent)?;
                    self.namer.child_note_name(&related, &parent)
                }
                RecordKind::StandaloneNote => note_title(related.note.as_deref().unwrap_or("")),
                RecordKind::Attachment => {
                    debug!(record = %related.key, "attachments are not linked as related");
                    continue;
                }
            };
            names.push(name);
        }
        Ok(names)
    }

    fn pdf_links(&self, record: &BibliographicRecord) -> LibraryResult<Vec<String>> {
        let mut links = Vec::new();
        for attachment in self.store.attachments(record.id)? {
            let Some(info) = &attachment.attachment else {
                continue;
            };
            if info.content_type != PDF_CONTENT_TYPE {
                continue;
            }
            let link = match self.config.pdf_link_style {
                PdfLinkStyle::Library => {
                    format!("zotero://open-pdf/library/items/{}", attachment.key)
                }
                PdfLinkStyle::Wiki => format_internal_link(attachment.title(), LinkStyle::Wiki),
                PdfLinkStyle::File => match &info.path {
                    Some(path) => path_to_file_uri(path),
                    None => {
                        debug!(attachment = %attachment.key, "pdf without a file path");
                        continue;
                    }
                },
            };
            links.push(link);
        }
        Ok(links)
    }

    fn links(&self, names: &[String]) -> Vec<String> {
        names.iter().map(|name| self.namer.link(name)).collect()
    }
}
