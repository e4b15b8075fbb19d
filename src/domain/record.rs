//! Bibliographic records as read from a library.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Numeric record identifier, unique within a library.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric collection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub u64);

/// Item type of notes.
pub const NOTE_TYPE: &str = "note";
/// Item type of attachments.
pub const ATTACHMENT_TYPE: &str = "attachment";

/// A creator (author, editor, ...) attached to a record.
///
/// Institutional creators only carry `name`; personal creators carry
/// `first_name` and `last_name`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub creator_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Creator {
    /// Creates a personal creator with the given role.
    pub fn person(role: &str, first: &str, last: &str) -> Self {
        Self {
            creator_type: role.to_string(),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            name: None,
        }
    }

    /// Display name: `"{first} {last}"`, or the single-field name.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{first} {last}").trim().to_string()
    }
}

/// File or link details of an attachment record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A record in the library: a regular item, a note, or an attachment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BibliographicRecord {
    pub id: RecordId,
    pub key: String,
    #[serde(default)]
    pub library_id: u64,
    pub item_type: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub creators: Vec<Creator>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collections: Vec<CollectionId>,
    #[serde(default)]
    pub relations: Vec<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// What kind of record this is, decided from item type and parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Regular,
    ChildNote { parent: RecordId },
    StandaloneNote,
    Attachment,
}

impl BibliographicRecord {
    /// Returns a field value, or `""` when absent.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.field("title")
    }

    pub fn kind(&self) -> RecordKind {
        match (self.item_type.as_str(), self.parent_id) {
            (NOTE_TYPE, Some(parent)) => RecordKind::ChildNote { parent },
            (NOTE_TYPE, None) => RecordKind::StandaloneNote,
            (ATTACHMENT_TYPE, _) => RecordKind::Attachment,
            _ => RecordKind::Regular,
        }
    }

    pub fn is_note(&self) -> bool {
        self.item_type == NOTE_TYPE
    }

    pub fn is_attachment(&self) -> bool {
        self.item_type == ATTACHMENT_TYPE
    }

    /// Names of creators with the given role, in original order.
    pub fn creator_names(&self, role: &str) -> Vec<String> {
        self.creators
            .iter()
            .filter(|c| c.creator_type == role)
            .map(Creator::display_name)
            .collect()
    }

    /// Distinct creator roles present on the record, in first-seen order.
    pub fn creator_roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = Vec::new();
        for creator in &self.creators {
            if !roles.contains(&creator.creator_type.as_str()) {
                roles.push(&creator.creator_type);
            }
        }
        roles
    }
}

/// An export subject: a record classified once for naming and rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    TopLevel(BibliographicRecord),
    ChildNote {
        note: BibliographicRecord,
        parent: BibliographicRecord,
    },
    StandaloneNote(BibliographicRecord),
}

impl Subject {
    /// The record this subject was built from.
    pub fn record(&self) -> &BibliographicRecord {
        match self {
            Subject::TopLevel(record) | Subject::StandaloneNote(record) => record,
            Subject::ChildNote { note, .. } => note,
        }
    }

    /// The top-level record that owns attachments created for this subject.
    pub fn owner(&self) -> &BibliographicRecord {
        match self {
            Subject::TopLevel(record) | Subject::StandaloneNote(record) => record,
            Subject::ChildNote { parent, .. } => parent,
        }
    }
}
