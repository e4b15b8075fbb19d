//! File system provider with atomic writes.

use std::io::{self, Write as IoWrite};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors during file system operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("atomic write failed for {path}: {source}")]
    AtomicWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parent directory does not exist: {path}")]
    ParentNotFound { path: PathBuf },

    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("invalid encoding in {path}: {encoding}")]
    InvalidEncoding { path: PathBuf, encoding: String },
}

impl FsError {
    /// Creates an appropriate FsError from an io::Error.
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path: path.into() },
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied { path: path.into() },
            _ => FsError::Io {
                path: path.into(),
                source: error,
            },
        }
    }
}

/// A directory entry as seen by [`FileSystem::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

/// File operations the exporter performs.
pub trait FileSystem {
    /// Reads a UTF-8 text file.
    fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Writes a UTF-8 text file, replacing any existing content.
    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    fn exists(&self, path: &Path) -> bool;

    /// Lists the immediate entries of a directory.
    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntryInfo>, FsError>;
}

/// The local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        let bytes = std::fs::read(path).map_err(|e| FsError::from_io(path, e))?;
        let content = String::from_utf8(bytes).map_err(|e| FsError::InvalidEncoding {
            path: path.into(),
            encoding: format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
        })?;
        if let Some(stripped) = content.strip_prefix('\u{FEFF}') {
            return Ok(stripped.to_string());
        }
        Ok(content)
    }

    /// Uses a temporary file and atomic rename to prevent partial writes.
    /// The parent directory must exist.
    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        if !parent.exists() {
            return Err(FsError::ParentNotFound {
                path: parent.into(),
            });
        }

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| FsError::Io {
            path: path.into(),
            source: e,
        })?;

        temp.write_all(contents.as_bytes())
            .map_err(|e| FsError::Io {
                path: path.into(),
                source: e,
            })?;

        temp.persist(path).map_err(|e| FsError::AtomicWrite {
            path: path.into(),
            source: e.error,
        })?;

        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntryInfo>, FsError> {
        if !dir.exists() {
            return Err(FsError::NotFound { path: dir.into() });
        }
        if !dir.is_dir() {
            return Err(FsError::NotADirectory { path: dir.into() });
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed"));
                FsError::from_io(dir, source)
            })?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }
}

/// Lexically normalizes a path, dropping `.` and resolving `..`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Path of the Markdown file `{name}.md` inside `dir`.
pub fn markdown_path(dir: &Path, name: &str) -> PathBuf {
    normalize_path(dir).join(format!("{name}.md"))
}
