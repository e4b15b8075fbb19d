//! Flat field records handed to templates.

use std::collections::BTreeMap;

use serde::Serialize;

/// Sentinel rendered for fields that cannot be resolved by wildcards.
pub const UNDEFINED: &str = "undefined";

/// A single field value: text or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Flattens the value to a single string; lists are joined with `", "`.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Field name to value mapping, built once per export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataRecord(BTreeMap<String, FieldValue>);

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Text form of a field, if present.
    pub fn text(&self, name: &str) -> Option<String> {
        self.0.get(name).map(FieldValue::to_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

/// A note converted to Markdown, plus the fields its template may use.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRecord {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub related: Vec<String>,
    pub related_links: Vec<String>,
    pub hub_file_name: String,
    pub hub_link: String,
    pub metadata_file_name: String,
}

impl NoteRecord {
    /// Field view used for template rendering.
    pub fn to_metadata(&self) -> MetadataRecord {
        let mut record = MetadataRecord::new();
        record.insert("title", self.title.as_str());
        record.insert("noteContent", self.body.as_str());
        record.insert("tags", self.tags.clone());
        record.insert("related", self.related.clone());
        record.insert("relatedLinks", self.related_links.clone());
        record.insert("hubFileName", self.hub_file_name.as_str());
        record.insert("hubLink", self.hub_link.as_str());
        record.insert("metadataFileName", self.metadata_file_name.as_str());
        record
    }
}
