//! Library providers: record store, key manager, attachment linker

mod json;
mod repository;

pub use json::{Collection, JsonLibrary};
pub use repository::{
    AttachmentLinker, KeyManager, LibraryError, LibraryResult, MARKDOWN_CONTENT_TYPE,
    RecordStore, VAULT_CONTENT_TYPE, has_attachment,
};
