//! Preference store and its TOML file adapter.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Table holding all preferences in the preference file.
pub const PREF_NAMESPACE: &str = "mdnotes";

/// Errors reading or writing the preference file.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("I/O error on preferences {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unsupported value for preference '{name}': expected string, boolean or integer")]
    InvalidValue { name: String },
}

/// A single preference value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl PrefValue {
    /// Interprets command-line input: booleans and integers are typed,
    /// everything else is text.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => PrefValue::Bool(true),
            "false" => PrefValue::Bool(false),
            _ => raw
                .parse::<i64>()
                .map(PrefValue::Int)
                .unwrap_or_else(|_| PrefValue::Text(raw.to_string())),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(b) => Some(*b),
            PrefValue::Int(i) => Some(*i != 0),
            PrefValue::Text(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefValue::Bool(b) => write!(f, "{b}"),
            PrefValue::Int(i) => write!(f, "{i}"),
            PrefValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        PrefValue::Text(value.to_string())
    }
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        PrefValue::Bool(value)
    }
}

/// String-keyed configuration values.
pub trait PreferenceStore {
    fn get(&self, name: &str) -> Option<PrefValue>;

    fn set(&mut self, name: &str, value: PrefValue);

    /// Text form of a preference.
    fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.to_string())
    }

    fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }
}

/// Preferences held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryPreferences {
    values: BTreeMap<String, PrefValue>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, name: &str, value: impl Into<PrefValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &PrefValue)> {
        self.values.iter()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, name: &str) -> Option<PrefValue> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: PrefValue) {
        self.values.insert(name.to_string(), value);
    }
}

/// Preferences persisted in the `[mdnotes]` table of a TOML file.
///
/// Both quoted (`"files.hub.prefix" = ""`) and dotted
/// (`files.hub.prefix = ""`) keys are accepted.
#[derive(Debug, Clone)]
pub struct PrefsFile {
    path: PathBuf,
    values: MemoryPreferences,
}

impl PrefsFile {
    /// Loads preferences from a file.
    ///
    /// Returns empty preferences if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, PrefsError> {
        let mut prefs = Self {
            path: path.to_path_buf(),
            values: MemoryPreferences::new(),
        };

        if !path.exists() {
            return Ok(prefs);
        }

        let contents = std::fs::read_to_string(path).map_err(|e| PrefsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table: toml::Table = toml::from_str(&contents).map_err(|e| PrefsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(toml::Value::Table(section)) = table.get(PREF_NAMESPACE) {
            flatten_into(&mut prefs.values, "", section)?;
        }
        Ok(prefs)
    }

    /// Returns the path to the preference file.
    ///
    /// Default: `~/.config/mdnotes/prefs.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mdnotes")
            .join("prefs.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &PrefValue)> {
        self.values.entries()
    }

    /// Writes all preferences back to the file, creating parent directories.
    pub fn save(&self) -> Result<(), PrefsError> {
        let mut section = toml::Table::new();
        for (name, value) in self.values.entries() {
            let value = match value {
                PrefValue::Bool(b) => toml::Value::Boolean(*b),
                PrefValue::Int(i) => toml::Value::Integer(*i),
                PrefValue::Text(s) => toml::Value::String(s.clone()),
            };
            section.insert(name.clone(), value);
        }
        let mut root = toml::Table::new();
        root.insert(PREF_NAMESPACE.to_string(), toml::Value::Table(section));
        let contents = toml::to_string_pretty(&root)?;

        let io_err = |source| PrefsError::Io {
            path: self.path.clone(),
            source,
        };
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(io_err)?;
        let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
        temp.write_all(contents.as_bytes()).map_err(io_err)?;
        temp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl PreferenceStore for PrefsFile {
    fn get(&self, name: &str) -> Option<PrefValue> {
        self.values.get(name)
    }

    fn set(&mut self, name: &str, value: PrefValue) {
        self.values.set(name, value);
    }
}

fn flatten_into(
    out: &mut MemoryPreferences,
    prefix: &str,
    table: &toml::Table,
) -> Result<(), PrefsError> {
    for (key, value) in table {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let pref = match value {
            toml::Value::Table(nested) => {
                flatten_into(out, &name, nested)?;
                continue;
            }
            toml::Value::String(s) => PrefValue::Text(s.clone()),
            toml::Value::Boolean(b) => PrefValue::Bool(*b),
            toml::Value::Integer(i) => PrefValue::Int(*i),
            _ => return Err(PrefsError::InvalidValue { name }),
        };
        out.set(&name, pref);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn parse_types_cli_input() {
        assert_eq!(PrefValue::parse("true"), PrefValue::Bool(true));
        assert_eq!(PrefValue::parse("12"), PrefValue::Int(12));
        assert_eq!(PrefValue::parse("wiki"), PrefValue::Text("wiki".into()));
    }

    #[test]
    fn text_booleans_are_readable_as_bool() {
        let prefs = MemoryPreferences::new().with("flag", "true");
        assert_eq!(prefs.get_bool("flag"), Some(true));
        assert_eq!(prefs.get_bool("missing"), None);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsFile::load(&dir.path().join("prefs.toml")).unwrap();
        assert_eq!(prefs.entries().count(), 0);
    }

    #[test]
    fn load_accepts_quoted_and_dotted_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(
            &path,
            r#"
[mdnotes]
bullet = "-"
"files.hub.prefix" = "@"
files.note.suffix = "-n"
attach_to_library = false
"#,
        )
        .unwrap();

        let prefs = PrefsFile::load(&path).unwrap();
        assert_eq!(prefs.get_str("bullet").as_deref(), Some("-"));
        assert_eq!(prefs.get_str("files.hub.prefix").as_deref(), Some("@"));
        assert_eq!(prefs.get_str("files.note.suffix").as_deref(), Some("-n"));
        assert_eq!(prefs.get_bool("attach_to_library"), Some(false));
    }

    #[test]
    fn load_ignores_other_tables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "[other]\nbullet = \"+\"\n").unwrap();
        let prefs = PrefsFile::load(&path).unwrap();
        assert_eq!(prefs.get("bullet"), None);
    }

    #[test]
    fn load_rejects_arrays() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "[mdnotes]\nbullet = [1, 2]\n").unwrap();
        assert!(matches!(
            PrefsFile::load(&path),
            Err(PrefsError::InvalidValue { .. })
        ));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prefs.toml");
        let mut prefs = PrefsFile::load(&path).unwrap();
        prefs.set("link_style", PrefValue::from("wiki"));
        prefs.set("citekey_title", PrefValue::from(true));
        prefs.save().unwrap();

        let reloaded = PrefsFile::load(&path).unwrap();
        assert_eq!(reloaded.get_str("link_style").as_deref(), Some("wiki"));
        assert_eq!(reloaded.get_bool("citekey_title"), Some(true));
    }

    #[test]
    fn save_replaces_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "[mdnotes]\nbullet = \"-\"\n").unwrap();

        let mut prefs = PrefsFile::load(&path).unwrap();
        prefs.set("bullet", PrefValue::from("+"));
        prefs.save().unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("prefs.toml")]);
        let reloaded = PrefsFile::load(&path).unwrap();
        assert_eq!(reloaded.get_str("bullet").as_deref(), Some("+"));
    }

    #[test]
    fn default_path_is_in_config_dir() {
        assert!(PrefsFile::default_path().ends_with("mdnotes/prefs.toml"));
    }
}
