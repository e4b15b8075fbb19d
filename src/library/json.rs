//! Library backed by a JSON snapshot file.
//!
//! The snapshot lists collections and items; child notes and attachments are
//! items with a `parentId`. Links created during an export are appended as
//! attachment items and written back with [`JsonLibrary::save`].

use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::{
    ATTACHMENT_TYPE, AttachmentInfo, BibliographicRecord, CollectionId, RecordId,
};

use super::repository::{
    AttachmentLinker, KeyManager, LibraryError, LibraryResult, MARKDOWN_CONTENT_TYPE, RecordStore,
};

/// A named collection in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    collections: Vec<Collection>,
    #[serde(default)]
    items: Vec<BibliographicRecord>,
}

/// In-memory library loaded from (and saved to) a JSON snapshot.
#[derive(Debug, Default)]
pub struct JsonLibrary {
    path: Option<PathBuf>,
    snapshot: Snapshot,
    dirty: bool,
}

impl JsonLibrary {
    /// Loads a snapshot from disk.
    pub fn open(path: &Path) -> LibraryResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LibraryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(|e| LibraryError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            snapshot,
            dirty: false,
        })
    }

    /// Builds an unsaved library from records and collections.
    pub fn from_records(items: Vec<BibliographicRecord>, collections: Vec<Collection>) -> Self {
        Self {
            path: None,
            snapshot: Snapshot { collections, items },
            dirty: false,
        }
    }

    /// Whether links were added since the snapshot was loaded.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// All records, in snapshot order.
    pub fn records(&self) -> &[BibliographicRecord] {
        &self.snapshot.items
    }

    /// Finds a record by its library key (case-insensitive).
    pub fn find_by_key(&self, key: &str) -> LibraryResult<BibliographicRecord> {
        self.snapshot
            .items
            .iter()
            .find(|r| r.key.eq_ignore_ascii_case(key))
            .cloned()
            .ok_or_else(|| LibraryError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// Ids of regular top-level records, the default batch selection.
    pub fn top_level_ids(&self) -> Vec<RecordId> {
        self.snapshot
            .items
            .iter()
            .filter(|r| r.parent_id.is_none() && !r.is_note() && !r.is_attachment())
            .map(|r| r.id)
            .collect()
    }

    /// Writes the snapshot back to the file it was opened from.
    ///
    /// Uses a temporary file and atomic rename. In-memory libraries are a no-op.
    pub fn save(&mut self) -> LibraryResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let io_err = |source| LibraryError::Io {
            path: path.clone(),
            source,
        };

        let contents = serde_json::to_string_pretty(&self.snapshot).map_err(|e| {
            LibraryError::Serialize {
                path: path.clone(),
                source: e,
            }
        })?;
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
        temp.write_all(contents.as_bytes()).map_err(io_err)?;
        temp.persist(&path).map_err(|e| io_err(e.error))?;

        self.dirty = false;
        Ok(())
    }

    fn next_id(&self) -> RecordId {
        let max = self.snapshot.items.iter().map(|r| r.id.0).max().unwrap_or(0);
        RecordId(max + 1)
    }

    fn push_attachment(
        &mut self,
        parent: RecordId,
        title: &str,
        info: AttachmentInfo,
    ) -> LibraryResult<()> {
        let parent_record = self.record(parent)?;
        let id = self.next_id();
        let mut record = BibliographicRecord {
            id,
            key: generate_key(id),
            library_id: parent_record.library_id,
            item_type: ATTACHMENT_TYPE.to_string(),
            parent_id: Some(parent),
            attachment: Some(info),
            ..Default::default()
        };
        record.fields.insert("title".to_string(), title.to_string());
        self.snapshot.items.push(record);
        self.dirty = true;
        Ok(())
    }
}

const KEY_ALPHABET: &[u8] = b"23456789ABCDEFGHIJKLMNPQRSTUVWXYZ";

/// Derives an eight character record key from an id.
fn generate_key(id: RecordId) -> String {
    let base = KEY_ALPHABET.len() as u64;
    let mut n = id.0;
    let mut key = vec![KEY_ALPHABET[0]; 8];
    for slot in key.iter_mut().rev() {
        *slot = KEY_ALPHABET[(n % base) as usize];
        n /= base;
    }
    String::from_utf8_lossy(&key).into_owned()
}

impl RecordStore for JsonLibrary {
    fn record(&self, id: RecordId) -> LibraryResult<BibliographicRecord> {
        self.snapshot
            .items
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(LibraryError::RecordNotFound { id })
    }

    fn children(&self, id: RecordId) -> LibraryResult<Vec<BibliographicRecord>> {
        Ok(self
            .snapshot
            .items
            .iter()
            .filter(|r| r.parent_id == Some(id))
            .cloned()
            .collect())
    }

    fn collection_name(&self, id: CollectionId) -> Option<String> {
        self.snapshot
            .collections
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    }
}

impl KeyManager for JsonLibrary {
    fn citation_key(&self, id: RecordId) -> Option<String> {
        self.snapshot
            .items
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| r.citation_key.clone())
            .filter(|k| !k.is_empty())
    }
}

impl AttachmentLinker for JsonLibrary {
    fn link_file(&mut self, parent: RecordId, path: &Path) -> LibraryResult<()> {
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let info = AttachmentInfo {
            content_type: MARKDOWN_CONTENT_TYPE.to_string(),
            path: Some(path.to_path_buf()),
            url: None,
        };
        self.push_attachment(parent, &title, info)
    }

    fn link_url(
        &mut self,
        parent: RecordId,
        url: &str,
        content_type: &str,
        title: &str,
    ) -> LibraryResult<()> {
        let info = AttachmentInfo {
            content_type: content_type.to_string(),
            path: None,
            url: Some(url.to_string()),
        };
        self.push_attachment(parent, title, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{VAULT_CONTENT_TYPE, has_attachment};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> JsonLibrary {
        let json = r#"{
            "collections": [{"id": 1, "name": "Climate"}],
            "items": [
                {"id": 1, "key": "AAAA1111", "itemType": "report",
                 "fields": {"title": "Climate Change Report"}, "collections": [1]},
                {"id": 2, "key": "BBBB2222", "itemType": "note", "parentId": 1,
                 "note": "<p>Reading notes</p>"},
                {"id": 3, "key": "CCCC3333", "itemType": "attachment", "parentId": 1,
                 "attachment": {"contentType": "application/pdf", "path": "/lib/report.pdf"}},
                {"id": 4, "key": "DDDD4444", "itemType": "note", "note": "<p>Loose</p>"}
            ]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        JsonLibrary {
            path: None,
            snapshot,
            dirty: false,
        }
    }

    #[test]
    fn children_split_into_notes_and_attachments() {
        let lib = sample();
        let notes = lib.notes(RecordId(1)).unwrap();
        let attachments = lib.attachments(RecordId(1)).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, RecordId(2));
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].id, RecordId(3));
    }

    #[test]
    fn missing_record_is_an_error() {
        let lib = sample();
        assert!(matches!(
            lib.record(RecordId(99)),
            Err(LibraryError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn find_by_key_ignores_case() {
        let lib = sample();
        assert_eq!(lib.find_by_key("aaaa1111").unwrap().id, RecordId(1));
        assert!(lib.find_by_key("nope").is_err());
    }

    #[test]
    fn top_level_ids_skip_notes_and_attachments() {
        let lib = sample();
        assert_eq!(lib.top_level_ids(), vec![RecordId(1)]);
    }

    #[test]
    fn collection_names_resolve() {
        let lib = sample();
        assert_eq!(lib.collection_name(CollectionId(1)).as_deref(), Some("Climate"));
        assert_eq!(lib.collection_name(CollectionId(2)), None);
    }

    #[test]
    fn subject_resolves_parent_of_child_note() {
        let lib = sample();
        let note = lib.record(RecordId(2)).unwrap();
        match lib.subject(note).unwrap() {
            crate::domain::Subject::ChildNote { parent, .. } => assert_eq!(parent.id, RecordId(1)),
            other => panic!("unexpected subject: {other:?}"),
        }
        let attachment = lib.record(RecordId(3)).unwrap();
        assert!(lib.subject(attachment).is_err());
    }

    #[test]
    fn linked_file_is_detected_by_path_only() {
        let mut lib = sample();
        lib.link_file(RecordId(1), Path::new("/out/report.md")).unwrap();
        assert!(lib.is_dirty());
        assert!(has_attachment(&lib, RecordId(1), "/out/report.md").unwrap());
        assert!(!has_attachment(&lib, RecordId(1), "/out/other.md").unwrap());
        // a PDF with a matching path is not a markdown link
        assert!(!has_attachment(&lib, RecordId(1), "/lib/report.pdf").unwrap());
    }

    #[test]
    fn linked_url_is_detected_by_url_only() {
        let mut lib = sample();
        let uri = "obsidian://open?vault=v&file=report";
        lib.link_url(RecordId(1), uri, VAULT_CONTENT_TYPE, "report")
            .unwrap();
        assert!(has_attachment(&lib, RecordId(1), uri).unwrap());
        assert!(!has_attachment(&lib, RecordId(1), "report").unwrap());
    }

    #[test]
    fn generated_keys_are_eight_chars_and_distinct() {
        let a = generate_key(RecordId(5));
        let b = generate_key(RecordId(6));
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn save_round_trips_links() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(
            &path,
            r#"{"items": [{"id": 1, "key": "AAAA1111", "itemType": "book"}]}"#,
        )
        .unwrap();

        let mut lib = JsonLibrary::open(&path).unwrap();
        lib.link_file(RecordId(1), Path::new("/out/a.md")).unwrap();
        lib.save().unwrap();
        assert!(!lib.is_dirty());

        let reopened = JsonLibrary::open(&path).unwrap();
        assert_eq!(reopened.records().len(), 2);
        assert!(has_attachment(&reopened, RecordId(1), "/out/a.md").unwrap());
    }

    #[test]
    fn serialize_error_names_the_direction() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err = LibraryError::Serialize {
            path: PathBuf::from("/lib.json"),
            source,
        };
        assert!(err.to_string().starts_with("failed to serialize library snapshot /lib.json"));
    }

    #[test]
    fn open_rejects_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonLibrary::open(&path),
            Err(LibraryError::Parse { .. })
        ));
    }
}
