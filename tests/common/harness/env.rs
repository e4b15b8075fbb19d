//! Isolated test environment with temp directory.

// Allow dead code since this is a test utility with methods for future tests
#![allow(dead_code)]

use super::{MdnotesCommand, TestLibrary};
use mdnotes::domain::BibliographicRecord;
use mdnotes::infra::{PrefValue, PreferenceStore, PrefsFile};
use mdnotes::library::JsonLibrary;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated test environment with a temporary root directory.
///
/// Holds the library snapshot, the preference file, and the export output
/// directory; everything is cleaned up on drop.
pub struct TestEnv {
    /// The temporary directory (kept for lifetime management)
    _temp_dir: TempDir,
    root: PathBuf,
}

impl TestEnv {
    /// Creates a new isolated test environment.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn library_path(&self) -> PathBuf {
        self.root.join("library.json")
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.root.join("prefs.toml")
    }

    /// Export target; not created until something writes to it.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("out")
    }

    /// Writes the library snapshot and returns its path.
    pub fn write_library(&self, library: &TestLibrary) -> PathBuf {
        let path = self.library_path();
        std::fs::write(&path, library.to_json()).expect("Failed to write library");
        path
    }

    /// Reloads the library snapshot from disk.
    pub fn library(&self) -> JsonLibrary {
        JsonLibrary::open(&self.library_path()).expect("Failed to open library")
    }

    /// Attachment records currently linked to the record with `key`.
    pub fn attachments_of(&self, key: &str) -> Vec<BibliographicRecord> {
        let library = self.library();
        let owner = library.find_by_key(key).expect("Unknown key").id;
        library
            .records()
            .iter()
            .filter(|r| r.is_attachment() && r.parent_id == Some(owner))
            .cloned()
            .collect()
    }

    /// Stores a preference in the environment's preference file.
    pub fn set_pref(&self, name: &str, value: impl Into<PrefValue>) {
        let mut prefs = PrefsFile::load(&self.prefs_path()).expect("Failed to load prefs");
        prefs.set(name, value.into());
        prefs.save().expect("Failed to save prefs");
    }

    /// Creates an MdnotesCommand bound to this environment's preference file.
    pub fn cmd(&self) -> MdnotesCommand {
        MdnotesCommand::new().prefs(&self.prefs_path())
    }

    /// Writes a file relative to the root, creating parent directories.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Sorted names of the files in the output directory.
    pub fn output_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.output_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Reads an exported file by name.
    pub fn read_output(&self, name: &str) -> String {
        let path = self.output_dir().join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
