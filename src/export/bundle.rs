//! Export bundles: rendering, writing and linking back into the library.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{BibliographicRecord, ExportFile, RecordId, Subject};
use crate::infra::{FileSystem, FsError, encode_file_path, markdown_path};
use crate::library::{
    AttachmentLinker, KeyManager, LibraryError, RecordStore, VAULT_CONTENT_TYPE, has_attachment,
};

use super::config::{ExportConfig, FileLayout};
use super::fields::FieldExtractor;
use super::html_note::NoteNormalizer;
use super::template::{TemplateEngine, TemplateError, TemplateKind, resolve_template};

/// Errors that abort a record's export, or the whole batch.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("no output directory: pass --output or set the 'directory' preference")]
    NoOutputDirectory,
}

/// A record whose export failed.
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub id: RecordId,
    pub error: String,
}

/// Outcome of a batch export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Files written (or that would be written in a dry run).
    pub written: Vec<PathBuf>,
    /// Hub files left untouched.
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<RecordFailure>,
    pub dry_run: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Renders subjects into files and writes them under the output directory.
pub struct Exporter<'a, L> {
    library: &'a mut L,
    fs: &'a dyn FileSystem,
    config: &'a ExportConfig,
    normalizer: NoteNormalizer,
    engine: TemplateEngine,
}

impl<'a, L> Exporter<'a, L>
where
    L: RecordStore + KeyManager + AttachmentLinker,
{
    pub fn new(library: &'a mut L, fs: &'a dyn FileSystem, config: &'a ExportConfig) -> Self {
        Self {
            library,
            fs,
            config,
            normalizer: NoteNormalizer::new(config),
            engine: TemplateEngine::new(),
        }
    }

    /// Rendered files for a subject.
    ///
    /// A top-level record yields its hub file followed by one file per child
    /// note. A note yields a single file.
    pub fn files(&self, subject: &Subject) -> Result<Vec<ExportFile>, ExportError> {
        let extractor = FieldExtractor::new(&*self.library, &*self.library, self.config);
        let namer = extractor.namer();

        match subject {
            Subject::TopLevel(record) => {
                let hub_template = self.template(TemplateKind::Hub)?;
                let fields = extractor.metadata(record)?;
                let mut files = vec![ExportFile::new(
                    namer.hub_name(record),
                    self.engine.render(&hub_template, &fields)?,
                )];

                let notes = self.library.notes(record.id)?;
                if !notes.is_empty() {
                    let child_template = self.template(TemplateKind::Child)?;
                    for note in &notes {
                        let content = self.render_note(&extractor, &child_template, note, Some(record))?;
                        files.push(ExportFile::new(namer.child_note_name(note, record), content));
                    }
                }
                Ok(files)
            }
            Subject::ChildNote { note, parent } => {
                let template = self.template(TemplateKind::Child)?;
                let content = self.render_note(&extractor, &template, note, Some(parent))?;
                Ok(vec![ExportFile::new(namer.child_note_name(note, parent), content)])
            }
            Subject::StandaloneNote(note) => {
                let template = self.template(TemplateKind::Child)?;
                let content = self.render_note(&extractor, &template, note, None)?;
                Ok(vec![ExportFile::new(namer.standalone_name(note), content)])
            }
        }
    }

    /// All files of a subject merged into one, named like the first.
    pub fn single_file(&self, subject: &Subject) -> Result<ExportFile, ExportError> {
        let files = self.files(subject)?;
        let name = files.first().map(|f| f.name.clone()).unwrap_or_default();
        let content = files.iter().fold(String::new(), |mut acc, file| {
            acc.push_str(&file.content);
            acc.push_str("\n\n");
            acc
        });
        Ok(ExportFile::new(name, content))
    }

    /// Exports each record in turn.
    ///
    /// Fails only when no output directory is configured; per-record
    /// failures are logged and collected in the report.
    pub fn export_batch(&mut self, ids: &[RecordId], dry_run: bool) -> Result<BatchReport, ExportError> {
        let dir = self
            .config
            .output_dir
            .clone()
            .ok_or(ExportError::NoOutputDirectory)?;

        let mut report = BatchReport {
            dry_run,
            ..BatchReport::default()
        };

        for &id in ids {
            if let Err(err) = self.export_record(id, &dir, dry_run, &mut report) {
                warn!(record = %id, error = %err, "export failed");
                report.failures.push(RecordFailure {
                    id,
                    error: err.to_string(),
                });
            }
        }

        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            dry_run,
            "export finished"
        );
        Ok(report)
    }

    fn export_record(
        &mut self,
        id: RecordId,
        dir: &Path,
        dry_run: bool,
        report: &mut BatchReport,
    ) -> Result<(), ExportError> {
        let record = self.library.record(id)?;
        let subject = self.library.subject(record)?;
        let owner = subject.owner().id;

        match self.config.layout {
            FileLayout::Single => {
                let file = self.single_file(&subject)?;
                self.write(&file, dir, owner, dry_run, report)?;
            }
            FileLayout::Split => {
                let has_hub = matches!(subject, Subject::TopLevel(_));
                for (index, file) in self.files(&subject)?.iter().enumerate() {
                    if has_hub && index == 0 {
                        let path = markdown_path(dir, &file.name);
                        if !self.config.create_hub_file || self.fs.exists(&path) {
                            debug!(path = %path.display(), "skipping hub file");
                            report.skipped.push(path);
                            continue;
                        }
                    }
                    self.write(file, dir, owner, dry_run, report)?;
                }
            }
        }
        Ok(())
    }

    fn write(
        &mut self,
        file: &ExportFile,
        dir: &Path,
        owner: RecordId,
        dry_run: bool,
        report: &mut BatchReport,
    ) -> Result<(), ExportError> {
        let path = markdown_path(dir, &file.name);
        if dry_run {
            debug!(path = %path.display(), "dry run, not writing");
            report.written.push(path);
            return Ok(());
        }

        self.fs.write(&path, &file.content)?;
        debug!(path = %path.display(), bytes = file.content.len(), "wrote file");
        report.written.push(path.clone());
        self.link_back(owner, &path)
    }

    /// Links a written file into the library, once per path and once per
    /// vault URI.
    fn link_back(&mut self, owner: RecordId, path: &Path) -> Result<(), ExportError> {
        if self.config.attach_to_library {
            let candidate = path.to_string_lossy();
            if has_attachment(&*self.library, owner, &candidate)? {
                debug!(path = %candidate, "file already linked");
            } else {
                self.library.link_file(owner, path)?;
            }
        }

        if self.config.attach_vault_uri {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let uri = vault_uri(&self.config.vault_name, &stem);
            if has_attachment(&*self.library, owner, &uri)? {
                debug!(uri = %uri, "vault link already present");
            } else {
                self.library.link_url(owner, &uri, VAULT_CONTENT_TYPE, &stem)?;
            }
        }
        Ok(())
    }

    fn template(&self, kind: TemplateKind) -> Result<String, TemplateError> {
        resolve_template(self.fs, self.config.templates_dir.as_deref(), kind)
    }

    fn render_note(
        &self,
        extractor: &FieldExtractor<'_>,
        template: &str,
        note: &BibliographicRecord,
        parent: Option<&BibliographicRecord>,
    ) -> Result<String, ExportError> {
        let record = extractor.note_record(note, parent, &self.normalizer)?;
        Ok(self.engine.render(template, &record.to_metadata())?)
    }
}

/// Deep link opening a file in the vault application.
///
/// ```
/// use mdnotes::export::vault_uri;
///
/// assert_eq!(
///     vault_uri("Research", "smith-2020 - Summary"),
///     "obsidian://open?vault=Research&file=smith-2020%20-%20Summary"
/// );
/// ```
pub fn vault_uri(vault: &str, file_stem: &str) -> String {
    format!(
        "obsidian://open?vault={vault}&file={}",
        encode_file_path(file_stem)
    )
}
