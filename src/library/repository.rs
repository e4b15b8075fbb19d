//! Provider traits for reading a library and linking attachments into it.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{BibliographicRecord, CollectionId, RecordId, RecordKind, Subject};

/// Content type of file attachments pointing at exported Markdown.
pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown";
/// Content type of scheme-link attachments pointing into the vault app.
pub const VAULT_CONTENT_TYPE: &str = "x-scheme-handler/obsidian";

/// Errors that can occur during library operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// No record with this id exists.
    #[error("record not found: {id}")]
    RecordNotFound { id: RecordId },

    /// No record with this key exists.
    #[error("no record with key '{key}'")]
    KeyNotFound { key: String },

    /// The record is an attachment and cannot be exported.
    #[error("record {id} is an attachment")]
    NotExportable { id: RecordId },

    /// The library file could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The library file is not a valid snapshot.
    #[error("invalid library snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The snapshot could not be encoded for saving.
    #[error("failed to serialize library snapshot {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for library operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Read access to records, their children and collections.
pub trait RecordStore {
    /// Retrieves a record by id.
    fn record(&self, id: RecordId) -> LibraryResult<BibliographicRecord>;

    /// Child records (attachments and notes) of a record, in library order.
    fn children(&self, id: RecordId) -> LibraryResult<Vec<BibliographicRecord>>;

    /// Name of a collection, if it exists.
    fn collection_name(&self, id: CollectionId) -> Option<String>;

    /// Attachment children of a record.
    fn attachments(&self, id: RecordId) -> LibraryResult<Vec<BibliographicRecord>> {
        Ok(self
            .children(id)?
            .into_iter()
            .filter(BibliographicRecord::is_attachment)
            .collect())
    }

    /// Note children of a record.
    fn notes(&self, id: RecordId) -> LibraryResult<Vec<BibliographicRecord>> {
        Ok(self
            .children(id)?
            .into_iter()
            .filter(BibliographicRecord::is_note)
            .collect())
    }

    /// Classifies a record as an export subject, resolving a note's parent.
    fn subject(&self, record: BibliographicRecord) -> LibraryResult<Subject> {
        match record.kind() {
            RecordKind::Regular => Ok(Subject::TopLevel(record)),
            RecordKind::StandaloneNote => Ok(Subject::StandaloneNote(record)),
            RecordKind::ChildNote { parent } => {
                let parent = self.record(parent)?;
                Ok(Subject::ChildNote {
                    note: record,
                    parent,
                })
            }
            RecordKind::Attachment => Err(LibraryError::NotExportable { id: record.id }),
        }
    }
}

/// Maps records to citation keys.
pub trait KeyManager {
    fn citation_key(&self, id: RecordId) -> Option<String>;
}

/// Creates link attachments under a record.
pub trait AttachmentLinker {
    /// Links a file on disk as an attachment of `parent`.
    fn link_file(&mut self, parent: RecordId, path: &Path) -> LibraryResult<()>;

    /// Links a URL as an attachment of `parent`.
    fn link_url(
        &mut self,
        parent: RecordId,
        url: &str,
        content_type: &str,
        title: &str,
    ) -> LibraryResult<()>;
}

/// Returns true if `parent` already has an attachment equal to `candidate`.
///
/// Markdown file attachments match only by path; vault scheme-link
/// attachments match only by URL. Other attachments never match.
pub fn has_attachment<S: RecordStore + ?Sized>(
    store: &S,
    parent: RecordId,
    candidate: &str,
) -> LibraryResult<bool> {
    for attachment in store.attachments(parent)? {
        let Some(info) = &attachment.attachment else {
            continue;
        };
        let matches = match info.content_type.as_str() {
            MARKDOWN_CONTENT_TYPE => info
                .path
                .as_deref()
                .is_some_and(|p| p.to_string_lossy() == candidate),
            VAULT_CONTENT_TYPE => info.url.as_deref() == Some(candidate),
            _ => false,
        };
        if matches {
            return Ok(true);
        }
    }
    Ok(false)
}
