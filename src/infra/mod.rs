//! File I/O, preferences, naming helpers, logging

mod fs;
mod logging;
mod prefs;
mod slug;

pub use fs::{DirEntryInfo, FileSystem, FsError, LocalFs, markdown_path, normalize_path};
pub use logging::init_tracing;
pub use prefs::{
    MemoryPreferences, PREF_NAMESPACE, PrefValue, PreferenceStore, PrefsError, PrefsFile,
};
pub use slug::{dash_title, encode_file_path, path_to_file_uri, valid_file_name};
