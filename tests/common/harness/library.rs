//! Builder for library snapshots with sensible defaults.

// Allow dead code since this is a test utility with methods for future tests
#![allow(dead_code)]

use mdnotes::domain::{
    ATTACHMENT_TYPE, AttachmentInfo, BibliographicRecord, CollectionId, Creator, NOTE_TYPE,
    RecordId,
};
use mdnotes::library::Collection;

/// Builder for a JSON library snapshot.
///
/// Records are addressed by their numeric id; modifier methods panic if the
/// id has not been added yet.
#[derive(Debug, Default)]
pub struct TestLibrary {
    collections: Vec<Collection>,
    items: Vec<BibliographicRecord>,
}

impl TestLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named collection.
    pub fn collection(mut self, id: u64, name: &str) -> Self {
        self.collections.push(Collection {
            id: CollectionId(id),
            name: name.to_string(),
        });
        self
    }

    /// Adds a regular record with only a title.
    pub fn item(mut self, id: u64, key: &str, item_type: &str, title: &str) -> Self {
        let mut record = BibliographicRecord {
            id: RecordId(id),
            key: key.to_string(),
            library_id: 1,
            item_type: item_type.to_string(),
            ..Default::default()
        };
        record.fields.insert("title".to_string(), title.to_string());
        self.items.push(record);
        self
    }

    /// Adds a journal article by Jane Doe with a date and URL.
    pub fn paper(self, id: u64, key: &str, title: &str) -> Self {
        self.item(id, key, "journalArticle", title)
            .author(id, "Jane", "Doe")
            .field(id, "date", "2020-05-01")
            .field(id, "url", "https://example.org/paper")
    }

    /// Sets a field on a record.
    pub fn field(mut self, id: u64, name: &str, value: &str) -> Self {
        self.record_mut(id)
            .fields
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn author(mut self, id: u64, first: &str, last: &str) -> Self {
        self.record_mut(id)
            .creators
            .push(Creator::person("author", first, last));
        self
    }

    pub fn tag(mut self, id: u64, tag: &str) -> Self {
        self.record_mut(id).tags.push(tag.to_string());
        self
    }

    pub fn citekey(mut self, id: u64, key: &str) -> Self {
        self.record_mut(id).citation_key = Some(key.to_string());
        self
    }

    pub fn in_collection(mut self, id: u64, collection: u64) -> Self {
        self.record_mut(id).collections.push(CollectionId(collection));
        self
    }

    pub fn related(mut self, id: u64, other: u64) -> Self {
        self.record_mut(id).relations.push(RecordId(other));
        self
    }

    /// Adds a note; `parent` of `None` makes it standalone.
    pub fn note(mut self, id: u64, key: &str, parent: Option<u64>, html: &str) -> Self {
        self.items.push(BibliographicRecord {
            id: RecordId(id),
            key: key.to_string(),
            library_id: 1,
            item_type: NOTE_TYPE.to_string(),
            parent_id: parent.map(RecordId),
            note: Some(html.to_string()),
            ..Default::default()
        });
        self
    }

    /// Adds a PDF attachment stored at `path`.
    pub fn pdf(mut self, id: u64, key: &str, parent: u64, title: &str, path: &str) -> Self {
        let mut record = BibliographicRecord {
            id: RecordId(id),
            key: key.to_string(),
            library_id: 1,
            item_type: ATTACHMENT_TYPE.to_string(),
            parent_id: Some(RecordId(parent)),
            attachment: Some(AttachmentInfo {
                content_type: "application/pdf".to_string(),
                path: Some(path.into()),
                url: None,
            }),
            ..Default::default()
        };
        record.fields.insert("title".to_string(), title.to_string());
        self.items.push(record);
        self
    }

    /// Serializes the snapshot as stored on disk.
    pub fn to_json(&self) -> String {
        let snapshot = serde_json::json!({
            "collections": self.collections,
            "items": self.items,
        });
        serde_json::to_string_pretty(&snapshot).expect("Failed to serialize library")
    }

    fn record_mut(&mut self, id: u64) -> &mut BibliographicRecord {
        self.items
            .iter_mut()
            .find(|r| r.id == RecordId(id))
            .unwrap_or_else(|| panic!("no record with id {id} in test library"))
    }
}
