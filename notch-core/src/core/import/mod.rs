//! Quiver library import pipeline.
//!
//! Importing runs in two phases. The scan phase reads every notebook's
//! metadata and topologically orders the set so parents are created before
//! children; the import phase walks that order, creating local records and
//! remapping foreign identifiers. Failures are isolated per record: one
//! corrupt note never aborts its notebook, and one unreadable notebook
//! never aborts the run. The caller receives a single [`ImportReport`]
//! summarising counts and structured errors.
//!
//! [`scan_for_duplicates`] is the read-only companion used to drive a
//! pre-import confirmation step; it shares its metadata-read step with the
//! importer so the two cannot drift apart.

pub mod format;
pub mod library;
pub mod progress;
pub mod resolver;

use crate::core::import::library::NoteRecord;
use crate::core::import::progress::{ImportPhase, ImportProgress};
use crate::core::import::resolver::OrderedNotebook;
use crate::{Result, Workspace};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Policy switches for an import run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Skip foreign notebooks whose name matches an existing local notebook,
    /// case-insensitively. The skip is shallow: children of a skipped
    /// notebook still import, as roots.
    pub skip_duplicates: bool,
}

/// One structured error captured during an import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    /// Best-known display title of the failed record.
    pub title: String,
    pub path: PathBuf,
    pub message: String,
}

impl ImportFailure {
    pub fn new(title: impl Into<String>, path: &Path, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// The aggregate result of an import run.
///
/// Always returned, even when the run fails outright; errors are carried
/// here rather than thrown past the pipeline boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub notebooks_imported: usize,
    pub notebooks_skipped: usize,
    pub notes_imported: usize,
    pub notes_failed: usize,
    pub errors: Vec<ImportFailure>,
    pub cancelled: bool,
}

/// The result of a read-only duplicate pre-scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateScan {
    /// Foreign notebook names colliding, case-insensitively, with an
    /// existing local notebook name.
    pub colliding_names: Vec<String>,
    /// Top-level notebook entries whose metadata was readable.
    pub total_notebooks_seen: usize,
}

/// A shared flag for requesting cancellation of a running import.
///
/// Checked at notebook boundaries only; a half-imported note is never
/// interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Scans the library at `path` and reports which top-level notebook names
/// collide with existing local notebooks, case-insensitively.
///
/// Read-only and idempotent; nothing is created. Entries whose metadata
/// cannot be read are excluded from both the total and the collision list.
///
/// # Errors
///
/// Returns an error only when `path` itself cannot be listed.
pub fn scan_for_duplicates(workspace: &Workspace, path: &Path) -> Result<DuplicateScan> {
    let scan = library::read_library(path)?;
    let existing: HashSet<String> = workspace
        .notebook_names()?
        .iter()
        .map(|n| n.to_lowercase())
        .collect();

    let colliding_names = scan
        .notebooks
        .iter()
        .filter(|n| existing.contains(&n.meta.name.to_lowercase()))
        .map(|n| n.meta.name.clone())
        .collect();

    Ok(DuplicateScan {
        colliding_names,
        total_notebooks_seen: scan.notebooks.len(),
    })
}

/// Convenience wrapper: runs a full import with no progress sink.
pub fn import_library(
    workspace: &mut Workspace,
    path: &Path,
    options: ImportOptions,
) -> ImportReport {
    Importer::new(workspace, options).run(path)
}

/// Drives one import run over a borrowed workspace.
///
/// All library reads and store mutations happen sequentially on the calling
/// thread: the resolver's ordering guarantee only holds if notebooks are
/// created strictly in resolved order. The foreign→local id map and the
/// duplicate-name set are owned by this value for the duration of the run;
/// concurrent runs against the same store are unsupported.
pub struct Importer<'a> {
    workspace: &'a mut Workspace,
    options: ImportOptions,
    progress: Option<Box<dyn FnMut(&ImportProgress) + 'a>>,
    cancel: CancelToken,
    phase: ImportPhase,
    report: ImportReport,
    notebooks_total: usize,
    notebooks_completed: usize,
    notes_total: usize,
    notes_completed: usize,
}

impl<'a> Importer<'a> {
    pub fn new(workspace: &'a mut Workspace, options: ImportOptions) -> Self {
        Self {
            workspace,
            options,
            progress: None,
            cancel: CancelToken::new(),
            phase: ImportPhase::Scanning,
            report: ImportReport::default(),
            notebooks_total: 0,
            notebooks_completed: 0,
            notes_total: 0,
            notes_completed: 0,
        }
    }

    /// Registers a sink that receives a snapshot at every phase and record
    /// boundary.
    #[must_use]
    pub fn with_progress(mut self, sink: impl FnMut(&ImportProgress) + 'a) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// Returns a token that can cancel this run from another thread. The
    /// token takes effect at the next notebook boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the import and returns the aggregate report.
    ///
    /// Never returns an error: a total inability to begin (unreadable
    /// library root, cyclic notebook declarations) is reported as a single
    /// failure entry on a zero-count report.
    pub fn run(mut self, path: &Path) -> ImportReport {
        let scan = match library::read_library(path) {
            Ok(scan) => scan,
            Err(e) => return self.fail(path, format!("Could not read library: {e}")),
        };
        // Unreadable notebook entries surface as notebook-level errors but
        // do not stop the run.
        self.report.errors.extend(scan.failures);

        let ordered = match resolver::order_by_dependency(scan.notebooks) {
            Ok(ordered) => ordered,
            Err(e) => return self.fail(path, e.user_message()),
        };

        let existing: HashSet<String> = match self.workspace.notebook_names() {
            Ok(names) => names.iter().map(|n| n.to_lowercase()).collect(),
            Err(e) => return self.fail(path, format!("Could not list local notebooks: {e}")),
        };

        // Scan phase complete: notebook totals are now known.
        self.notebooks_total = ordered.len();
        self.emit(None, None);
        self.phase = ImportPhase::Importing;

        let mut id_map: HashMap<String, String> = HashMap::new();
        for notebook in ordered {
            if self.cancel.is_cancelled() {
                log::info!(
                    "import cancelled after {} of {} notebooks",
                    self.notebooks_completed,
                    self.notebooks_total
                );
                self.report.cancelled = true;
                break;
            }
            self.import_notebook(notebook, &mut id_map, &existing);
        }

        self.phase = ImportPhase::Done;
        self.emit(None, None);
        self.report
    }

    /// Aborts the run before any mutation, with a single top-level failure.
    fn fail(mut self, path: &Path, message: String) -> ImportReport {
        log::warn!("import failed: {message}");
        self.phase = ImportPhase::Failed;
        self.report
            .errors
            .push(ImportFailure::new(library::directory_title(path), path, message));
        self.emit(None, None);
        self.report
    }

    fn emit(&mut self, current_notebook_name: Option<&str>, current_note_title: Option<&str>) {
        if let Some(sink) = self.progress.as_mut() {
            sink(&ImportProgress {
                phase: self.phase,
                current_notebook_name: current_notebook_name.map(str::to_string),
                current_note_title: current_note_title.map(str::to_string),
                notebooks_total: self.notebooks_total,
                notebooks_completed: self.notebooks_completed,
                notes_total: self.notes_total,
                notes_completed: self.notes_completed,
            });
        }
    }

    fn import_notebook(
        &mut self,
        notebook: OrderedNotebook,
        id_map: &mut HashMap<String, String>,
        existing: &HashSet<String>,
    ) {
        let name = notebook.entry.meta.name.clone();
        self.emit(Some(&name), None);

        if self.options.skip_duplicates && existing.contains(&name.to_lowercase()) {
            // Shallow skip: nothing is created and the notes are never
            // visited, but children of this notebook still import (their
            // parent uuid has no mapping, so they become roots).
            log::debug!("skipping duplicate notebook '{name}'");
            self.report.notebooks_skipped += 1;
            self.notebooks_completed += 1;
            self.emit(Some(&name), None);
            return;
        }

        // Topological order guarantees a mapped parent was already created.
        let parent_local = notebook
            .parent_uuid
            .as_ref()
            .and_then(|uuid| id_map.get(uuid))
            .cloned();

        let local = match self
            .workspace
            .create_notebook(&name, parent_local.as_deref())
        {
            Ok(local) => local,
            Err(e) => {
                log::warn!("failed to create notebook '{name}': {e}");
                self.report.errors.push(ImportFailure::new(
                    &name,
                    &notebook.entry.path,
                    format!("Could not create notebook: {e}"),
                ));
                self.notebooks_completed += 1;
                self.emit(Some(&name), None);
                return;
            }
        };
        id_map.insert(notebook.entry.meta.uuid.clone(), local.id.clone());

        match library::note_dirs(&notebook.entry.path) {
            Ok(dirs) => {
                // The running total grows as each notebook's directory is
                // opened; there is no global count up front.
                self.notes_total += dirs.len();
                for dir in dirs {
                    self.import_note(&local.id, &name, &dir);
                }
                self.report.notebooks_imported += 1;
            }
            Err(e) => {
                log::warn!("failed to list notes of '{name}': {e}");
                self.report.errors.push(ImportFailure::new(
                    &name,
                    &notebook.entry.path,
                    format!("Could not list notes: {e}"),
                ));
            }
        }

        self.notebooks_completed += 1;
        self.emit(Some(&name), None);
    }

    /// Imports one note directory, isolating any failure to this note.
    fn import_note(&mut self, notebook_id: &str, notebook_name: &str, note_path: &Path) {
        let record = match library::read_note(note_path) {
            Ok(record) => record,
            Err(e) => {
                // Best-known title: the meta file if it parses, else the
                // directory name.
                let title = library::read_note_meta(note_path)
                    .map(|m| m.title)
                    .unwrap_or_else(|_| library::directory_title(note_path));
                log::warn!("failed to read note '{title}': {e}");
                self.report
                    .errors
                    .push(ImportFailure::new(title, note_path, format!("Could not read note: {e}")));
                self.report.notes_failed += 1;
                self.notes_completed += 1;
                return;
            }
        };

        self.emit(Some(notebook_name), Some(&record.meta.title));

        match self.create_note_records(notebook_id, note_path, &record) {
            Ok(()) => self.report.notes_imported += 1,
            Err(e) => {
                log::warn!("failed to import note '{}': {e}", record.meta.title);
                self.report.errors.push(ImportFailure::new(
                    &record.meta.title,
                    note_path,
                    format!("Could not import note: {e}"),
                ));
                self.report.notes_failed += 1;
            }
        }
        self.notes_completed += 1;
    }

    fn create_note_records(
        &mut self,
        notebook_id: &str,
        note_path: &Path,
        record: &NoteRecord,
    ) -> Result<()> {
        let note = self
            .workspace
            .create_note(notebook_id, &record.meta.title, Some(&record.meta.uuid))?;

        // Drop the placeholder cell so imported blocks start at position 0.
        for cell in self.workspace.list_cells(&note.id)? {
            self.workspace.delete_cell(&cell.id)?;
        }

        for block in &record.content.cells {
            self.workspace.create_cell(
                &note.id,
                block.kind(),
                &block.data,
                block.normalized_language(),
                block.normalized_diagram_kind(),
            )?;
        }

        for tag_name in &record.meta.tags {
            let tag = self.workspace.ensure_tag(tag_name)?;
            self.workspace.add_tag_to_note(&note.id, &tag.id)?;
        }

        // Foreign timestamps are epoch seconds; local ones are milliseconds.
        self.workspace.update_note_timestamps(
            &note.id,
            record.meta.created_at * 1000,
            record.meta.updated_at * 1000,
        )?;

        let resources = library::note_resources(note_path);
        if !resources.is_empty() {
            log::debug!(
                "note '{}' has {} attachment(s); attachment import is deferred",
                record.meta.title,
                resources.len()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CellKind, DiagramKind};
    use std::fs;
    use tempfile::{NamedTempFile, TempDir};

    fn test_workspace() -> (NamedTempFile, Workspace) {
        let temp = NamedTempFile::new().unwrap();
        let ws = Workspace::create(temp.path()).unwrap();
        (temp, ws)
    }

    fn write_notebook(root: &Path, dir: &str, name: &str, uuid: &str, children: &[&str]) -> PathBuf {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        let children = children
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        fs::write(
            path.join("meta.json"),
            format!(r#"{{"name": "{name}", "uuid": "{uuid}", "children": [{children}]}}"#),
        )
        .unwrap();
        path
    }

    fn write_note(notebook: &Path, dir: &str, title: &str, uuid: &str, cells_json: &str) -> PathBuf {
        let path = notebook.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(
            path.join("meta.json"),
            format!(
                r#"{{"title": "{title}", "uuid": "{uuid}", "created_at": 1700000000,
                     "updated_at": 1700000100, "tags": []}}"#
            ),
        )
        .unwrap();
        fs::write(
            path.join("content.json"),
            format!(r#"{{"title": "{title}", "cells": {cells_json}}}"#),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_scan_for_duplicates_is_case_insensitive() {
        let (_temp, mut ws) = test_workspace();
        ws.create_notebook("Work", None).unwrap();

        let lib = TempDir::new().unwrap();
        write_notebook(lib.path(), "a.qvnotebook", "WORK", "1", &[]);
        write_notebook(lib.path(), "b.qvnotebook", "Play", "2", &[]);
        // Unreadable entries are excluded from totals and collisions.
        fs::create_dir(lib.path().join("broken.qvnotebook")).unwrap();

        let scan = scan_for_duplicates(&ws, lib.path()).unwrap();
        assert_eq!(scan.total_notebooks_seen, 2);
        assert_eq!(scan.colliding_names, vec!["WORK"]);
    }

    #[test]
    fn test_scan_does_not_mutate() {
        let (_temp, ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        write_notebook(lib.path(), "a.qvnotebook", "A", "1", &[]);

        scan_for_duplicates(&ws, lib.path()).unwrap();
        scan_for_duplicates(&ws, lib.path()).unwrap();
        assert!(ws.list_notebooks().unwrap().is_empty());
    }

    #[test]
    fn test_import_rebuilds_hierarchy_from_any_discovery_order() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        // Named so the child directory sorts before its parent.
        write_notebook(lib.path(), "a.qvnotebook", "Child", "c", &["gc"]);
        write_notebook(lib.path(), "b.qvnotebook", "Grandchild", "gc", &[]);
        write_notebook(lib.path(), "z.qvnotebook", "Parent", "p", &["c"]);

        let report = import_library(&mut ws, lib.path(), ImportOptions::default());
        assert_eq!(report.notebooks_imported, 3);
        assert!(report.errors.is_empty());

        let notebooks = ws.list_notebooks().unwrap();
        let by_name = |name: &str| notebooks.iter().find(|n| n.name == name).unwrap();
        assert_eq!(by_name("Parent").parent_id, None);
        assert_eq!(
            by_name("Child").parent_id.as_deref(),
            Some(by_name("Parent").id.as_str())
        );
        assert_eq!(
            by_name("Grandchild").parent_id.as_deref(),
            Some(by_name("Child").id.as_str())
        );
    }

    #[test]
    fn test_orphan_declared_parent_imports_as_root() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        // No discovered notebook declares "lonely" as a child.
        write_notebook(lib.path(), "a.qvnotebook", "Lonely", "lonely", &[]);

        let report = import_library(&mut ws, lib.path(), ImportOptions::default());
        assert_eq!(report.notebooks_imported, 1);
        assert_eq!(ws.list_notebooks().unwrap()[0].parent_id, None);
    }

    #[test]
    fn test_duplicate_skip_is_shallow() {
        let (_temp, mut ws) = test_workspace();
        ws.create_notebook("Work", None).unwrap();

        let lib = TempDir::new().unwrap();
        let work = write_notebook(lib.path(), "w.qvnotebook", "Work", "w", &["proj"]);
        write_note(&work, "n.qvnote", "Skipped note", "sn", "[]");
        write_notebook(lib.path(), "p.qvnotebook", "Projects", "proj", &[]);

        let options = ImportOptions {
            skip_duplicates: true,
        };
        let report = import_library(&mut ws, lib.path(), options);

        assert_eq!(report.notebooks_skipped, 1);
        assert_eq!(report.notebooks_imported, 1);
        assert_eq!(report.notes_imported, 0);

        // The child of the skipped notebook imported, attached to no parent.
        let notebooks = ws.list_notebooks().unwrap();
        let projects = notebooks.iter().find(|n| n.name == "Projects").unwrap();
        assert_eq!(projects.parent_id, None);
        // Only the pre-existing "Work" remains with that name.
        assert_eq!(notebooks.iter().filter(|n| n.name == "Work").count(), 1);
    }

    #[test]
    fn test_unskipped_duplicate_creates_second_notebook() {
        let (_temp, mut ws) = test_workspace();
        ws.create_notebook("Work", None).unwrap();

        let lib = TempDir::new().unwrap();
        write_notebook(lib.path(), "w.qvnotebook", "Work", "w", &[]);

        let report = import_library(&mut ws, lib.path(), ImportOptions::default());
        assert_eq!(report.notebooks_imported, 1);
        let notebooks = ws.list_notebooks().unwrap();
        assert_eq!(notebooks.iter().filter(|n| n.name == "Work").count(), 2);
    }

    #[test]
    fn test_notebook_failure_is_isolated() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        write_notebook(lib.path(), "a.qvnotebook", "One", "1", &[]);
        let bad = lib.path().join("b.qvnotebook");
        fs::create_dir_all(&bad).unwrap();
        fs::write(bad.join("meta.json"), "{definitely not json").unwrap();
        write_notebook(lib.path(), "c.qvnotebook", "Three", "3", &[]);

        let report = import_library(&mut ws, lib.path(), ImportOptions::default());
        assert_eq!(report.notebooks_imported, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].title, "b");

        let names: Vec<String> = ws
            .list_notebooks()
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert!(names.contains(&"One".to_string()));
        assert!(names.contains(&"Three".to_string()));
    }

    #[test]
    fn test_note_failure_is_isolated() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        let nb = write_notebook(lib.path(), "a.qvnotebook", "Notes", "1", &[]);
        for i in [1, 2, 4, 5] {
            write_note(&nb, &format!("n{i}.qvnote"), &format!("Note {i}"), &format!("u{i}"), "[]");
        }
        // Note 3 has readable metadata but no content.json.
        let broken = nb.join("n3.qvnote");
        fs::create_dir_all(&broken).unwrap();
        fs::write(
            broken.join("meta.json"),
            r#"{"title": "Note 3", "uuid": "u3", "created_at": 1, "updated_at": 1, "tags": []}"#,
        )
        .unwrap();

        let report = import_library(&mut ws, lib.path(), ImportOptions::default());
        assert_eq!(report.notebooks_imported, 1);
        assert_eq!(report.notes_imported, 4);
        assert_eq!(report.notes_failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].title, "Note 3");
    }

    #[test]
    fn test_unreadable_root_fails_with_report() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        let missing = lib.path().join("nowhere");

        let report = import_library(&mut ws, &missing, ImportOptions::default());
        assert_eq!(report.notebooks_imported, 0);
        assert_eq!(report.notes_imported, 0);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_cyclic_declarations_fail_before_any_mutation() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        write_notebook(lib.path(), "a.qvnotebook", "A", "a", &["b"]);
        write_notebook(lib.path(), "b.qvnotebook", "B", "b", &["a"]);

        let report = import_library(&mut ws, lib.path(), ImportOptions::default());
        assert_eq!(report.notebooks_imported, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(ws.list_notebooks().unwrap().is_empty());
    }

    #[test]
    fn test_note_content_imports_in_order_with_normalized_kinds() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        let nb = write_notebook(lib.path(), "a.qvnotebook", "Snippets", "1", &[]);
        write_note(
            &nb,
            "n.qvnote",
            "Mixed",
            "mixed-1",
            r##"[{"type": "markdown", "data": "# Title"},
                {"type": "code", "language": "rust", "data": "fn main() {}"},
                {"type": "diagram", "diagramType": "flowchart", "data": "a->b"},
                {"type": "hologram", "data": "???"}]"##,
        );

        let report = import_library(&mut ws, lib.path(), ImportOptions::default());
        assert_eq!(report.notes_imported, 1);

        let note = ws.find_note_by_source_id("mixed-1").unwrap().unwrap();
        let cells = ws.list_cells(&note.id).unwrap();
        assert_eq!(cells.len(), 4, "placeholder cell must be gone");
        assert_eq!(cells[0].kind, CellKind::Markdown);
        assert_eq!(cells[1].kind, CellKind::Code);
        assert_eq!(cells[1].language.as_deref(), Some("rust"));
        assert_eq!(cells[2].kind, CellKind::Diagram);
        assert_eq!(cells[2].diagram_kind, Some(DiagramKind::Flow));
        // Unrecognized foreign kind degrades to text.
        assert_eq!(cells[3].kind, CellKind::Text);
        assert_eq!(cells[3].content, "???");
        let positions: Vec<i32> = cells.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_timestamps_convert_seconds_to_milliseconds() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        let nb = write_notebook(lib.path(), "a.qvnotebook", "Stamped", "1", &[]);
        write_note(&nb, "n.qvnote", "Old note", "old-1", "[]");

        import_library(&mut ws, lib.path(), ImportOptions::default());

        let note = ws.find_note_by_source_id("old-1").unwrap().unwrap();
        assert_eq!(note.created_at, 1_700_000_000_000);
        assert_eq!(note.updated_at, 1_700_000_100_000);
    }

    #[test]
    fn test_source_identity_round_trip() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        let nb = write_notebook(lib.path(), "a.qvnotebook", "Linked", "1", &[]);
        write_note(&nb, "n.qvnote", "Target", "abc-123", "[]");

        import_library(&mut ws, lib.path(), ImportOptions::default());

        let found = ws.find_note_by_source_id("abc-123").unwrap().unwrap();
        assert_eq!(found.title, "Target");
        assert_eq!(found.source_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_tags_resolved_or_created_and_shared() {
        let (_temp, mut ws) = test_workspace();
        let pre_existing = ws.ensure_tag("shared").unwrap();

        let lib = TempDir::new().unwrap();
        let nb = write_notebook(lib.path(), "a.qvnotebook", "Tagged", "1", &[]);
        let note = nb.join("n.qvnote");
        fs::create_dir_all(&note).unwrap();
        fs::write(
            note.join("meta.json"),
            r#"{"title": "T", "uuid": "t1", "created_at": 1, "updated_at": 1,
                "tags": ["shared", "fresh"]}"#,
        )
        .unwrap();
        fs::write(note.join("content.json"), r#"{"title": "T", "cells": []}"#).unwrap();

        import_library(&mut ws, lib.path(), ImportOptions::default());

        let imported = ws.find_note_by_source_id("t1").unwrap().unwrap();
        assert_eq!(ws.tags_for_note(&imported.id).unwrap(), vec!["fresh", "shared"]);
        // The existing tag was reused, not duplicated.
        assert_eq!(ws.find_tag_by_name("shared").unwrap().unwrap().id, pre_existing.id);
    }

    #[test]
    fn test_escape_repair_applies_to_note_content() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        let nb = write_notebook(lib.path(), "a.qvnotebook", "Escapes", "1", &[]);
        let note = nb.join("n.qvnote");
        fs::create_dir_all(&note).unwrap();
        fs::write(
            note.join("meta.json"),
            r#"{"title": "Esc", "uuid": "e1", "created_at": 1, "updated_at": 1, "tags": []}"#,
        )
        .unwrap();
        // Raw \x00 is not a valid JSON escape; the normalizer repairs it.
        fs::write(
            note.join("content.json"),
            r#"{"title": "Esc", "cells": [{"type": "text", "data": "null byte: \x00"}]}"#,
        )
        .unwrap();

        let report = import_library(&mut ws, lib.path(), ImportOptions::default());
        assert_eq!(report.notes_imported, 1);
        assert_eq!(report.notes_failed, 0);

        let imported = ws.find_note_by_source_id("e1").unwrap().unwrap();
        let cells = ws.list_cells(&imported.id).unwrap();
        assert_eq!(cells[0].content, "null byte: \u{0}");
    }

    #[test]
    fn test_progress_snapshots_follow_the_state_machine() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        let nb1 = write_notebook(lib.path(), "a.qvnotebook", "First", "1", &[]);
        write_note(&nb1, "n1.qvnote", "A note", "p1", "[]");
        write_note(&nb1, "n2.qvnote", "Another", "p2", "[]");
        let nb2 = write_notebook(lib.path(), "b.qvnotebook", "Second", "2", &[]);
        write_note(&nb2, "n1.qvnote", "Later", "p3", "[]");

        let mut snapshots: Vec<ImportProgress> = Vec::new();
        let report = Importer::new(&mut ws, ImportOptions::default())
            .with_progress(|p| snapshots.push(p.clone()))
            .run(lib.path());
        assert_eq!(report.notes_imported, 3);

        // First snapshot: scan phase complete, notebook totals known.
        assert_eq!(snapshots[0].phase, ImportPhase::Scanning);
        assert_eq!(snapshots[0].notebooks_total, 2);
        assert_eq!(snapshots[0].notes_total, 0);

        // notes_total grows as notebooks are opened, never up front.
        let after_first_notebook = snapshots
            .iter()
            .find(|s| s.notebooks_completed == 1)
            .unwrap();
        assert_eq!(after_first_notebook.notes_total, 2);
        let last = snapshots.last().unwrap();
        assert_eq!(last.phase, ImportPhase::Done);
        assert_eq!(last.notes_total, 3);
        assert_eq!(last.notes_completed, 3);
        assert_eq!(last.notebooks_completed, 2);

        // Every note announced itself before being imported.
        let announced: Vec<&str> = snapshots
            .iter()
            .filter_map(|s| s.current_note_title.as_deref())
            .collect();
        assert_eq!(announced, vec!["A note", "Another", "Later"]);
    }

    #[test]
    fn test_cancellation_stops_at_notebook_boundary() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();
        let nb1 = write_notebook(lib.path(), "a.qvnotebook", "First", "1", &[]);
        write_note(&nb1, "n.qvnote", "Kept", "k1", "[]");
        let nb2 = write_notebook(lib.path(), "b.qvnotebook", "Second", "2", &[]);
        write_note(&nb2, "n.qvnote", "Never reached", "k2", "[]");

        let importer = Importer::new(&mut ws, ImportOptions::default());
        let token = importer.cancel_token();
        let report = importer
            .with_progress(move |p| {
                if p.notebooks_completed == 1 {
                    token.cancel();
                }
            })
            .run(lib.path());

        assert!(report.cancelled);
        assert_eq!(report.notebooks_imported, 1);
        assert_eq!(report.notes_imported, 1);
        assert!(ws.find_note_by_source_id("k2").unwrap().is_none());
    }

    #[test]
    fn test_empty_library_imports_nothing() {
        let (_temp, mut ws) = test_workspace();
        let lib = TempDir::new().unwrap();

        let report = import_library(&mut ws, lib.path(), ImportOptions::default());
        assert_eq!(report.notebooks_imported, 0);
        assert!(report.errors.is_empty());
        assert!(!report.cancelled);
    }
}
