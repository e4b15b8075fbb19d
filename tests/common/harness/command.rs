//! Fluent wrapper around assert_cmd::Command.

// Allow dead code since this is a test utility with methods for future tests
#![allow(dead_code)]

use assert_cmd::Command;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Fluent wrapper around `assert_cmd::Command` for the `mdnotes` binary.
pub struct MdnotesCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl MdnotesCommand {
    /// Creates a new command for the `mdnotes` binary.
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Runs the command from `dir`, for relative path arguments.
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Sets the `--prefs` option so the user's preference file is never read.
    pub fn prefs(mut self, path: &Path) -> Self {
        self.args.push("--prefs".to_string());
        self.args.push(path.to_string_lossy().to_string());
        self
    }

    /// Adds arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Adds a path argument.
    pub fn path(self, path: &Path) -> Self {
        self.args([path.to_string_lossy()])
    }

    /// Runs the command and returns an Assert for making assertions.
    #[allow(deprecated)]
    pub fn assert(self) -> assert_cmd::assert::Assert {
        let mut cmd = Command::cargo_bin("mdnotes").expect("Failed to find mdnotes binary");
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd.assert()
    }

    /// Runs the command, expects success, and returns stdout as a string.
    pub fn output_success(self) -> String {
        let output = self.assert().success().get_output().stdout.clone();
        String::from_utf8(output).expect("Output was not valid UTF-8")
    }

    /// Runs the command, expects success, and parses stdout as JSON.
    pub fn output_json<T: DeserializeOwned>(self) -> T {
        let output = self.output_success();
        serde_json::from_str(&output).expect("Failed to parse output as JSON")
    }

    // ===========================================
    // Command Shortcuts
    // ===========================================

    /// Configures for the `export` command against a library snapshot.
    pub fn export(self, library: &Path) -> Self {
        self.args(["export", "--library"]).path(library)
    }

    /// Configures for the `preview` command of one record.
    pub fn preview(self, library: &Path, key: &str) -> Self {
        self.args(["preview", "--library"]).path(library).args([key])
    }

    /// Configures for a `config` subcommand.
    pub fn config<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args(["config"]).args(args)
    }

    /// Sets the output directory.
    pub fn output(self, dir: &Path) -> Self {
        self.args(["--output"]).path(dir)
    }

    /// Selects one record by key.
    pub fn item(self, key: &str) -> Self {
        self.args(["--item", key])
    }

    /// Selects every top-level record.
    pub fn all(self) -> Self {
        self.args(["--all"])
    }

    /// Adds `--format json`.
    pub fn format_json(self) -> Self {
        self.args(["--format", "json"])
    }

    /// Adds `--format paths`.
    pub fn format_paths(self) -> Self {
        self.args(["--format", "paths"])
    }
}

impl Default for MdnotesCommand {
    fn default() -> Self {
        Self::new()
    }
}
