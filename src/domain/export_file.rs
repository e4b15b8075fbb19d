//! Output unit of an export.

use serde::Serialize;

/// A named Markdown document ready to be written.
///
/// `name` is the base name without the `.md` extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFile {
    pub name: String,
    pub content: String,
}

impl ExportFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// File name on disk.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.name)
    }
}
