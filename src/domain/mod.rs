//! Core types: records, subjects, field records, export files

mod export_file;
mod metadata;
mod record;

pub use export_file::ExportFile;
pub use metadata::{FieldValue, MetadataRecord, NoteRecord, UNDEFINED};
pub use record::{
    ATTACHMENT_TYPE, AttachmentInfo, BibliographicRecord, CollectionId, Creator, NOTE_TYPE,
    RecordId, RecordKind, Subject,
};
