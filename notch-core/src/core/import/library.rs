//! Filesystem reader for Quiver library directories.
//!
//! A library root contains `*.qvnotebook` directories; each of those holds a
//! `meta.json` plus `*.qvnote` note directories with their own `meta.json`
//! and `content.json`. Reading is tolerant: a malformed or unreadable entry
//! is reported as a structured failure, never a panic or an abort.

use crate::core::import::format::{self, NotebookMeta, NoteContent, NoteMeta};
use crate::core::import::ImportFailure;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// One discovered notebook directory with its parsed metadata.
#[derive(Debug, Clone)]
pub struct NotebookEntry {
    pub path: PathBuf,
    pub meta: NotebookMeta,
}

/// The outcome of listing a library root: every notebook whose metadata was
/// readable, plus one failure record per entry that was not.
///
/// This is the shared metadata-read step behind both the read-only duplicate
/// scan and the mutating import, so the two can never drift apart.
#[derive(Debug)]
pub struct LibraryScan {
    pub notebooks: Vec<NotebookEntry>,
    pub failures: Vec<ImportFailure>,
}

/// A note directory's parsed metadata and content, read together.
#[derive(Debug)]
pub struct NoteRecord {
    pub meta: NoteMeta,
    pub content: NoteContent,
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)?;
    Ok(format::parse_repaired(&raw)?)
}

/// Lists the `*.qvnotebook` entries under `root` and parses their metadata.
///
/// Entries are returned in name order so runs are deterministic regardless
/// of filesystem enumeration order.
///
/// # Errors
///
/// Returns an error only when `root` itself cannot be listed; per-entry
/// problems land in [`LibraryScan::failures`].
pub fn read_library(root: &Path) -> Result<LibraryScan> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir() && has_extension(p, "qvnotebook"))
        .collect();
    dirs.sort();

    let mut notebooks = Vec::new();
    let mut failures = Vec::new();
    for path in dirs {
        match read_json::<NotebookMeta>(&path.join("meta.json")) {
            Ok(meta) => notebooks.push(NotebookEntry { path, meta }),
            Err(e) => {
                log::warn!("skipping unreadable notebook at {}: {e}", path.display());
                failures.push(ImportFailure::new(
                    directory_title(&path),
                    &path,
                    format!("Could not read notebook metadata: {e}"),
                ));
            }
        }
    }

    Ok(LibraryScan {
        notebooks,
        failures,
    })
}

/// Lists the `*.qvnote` directories inside one notebook, in name order.
pub fn note_dirs(notebook_path: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(notebook_path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir() && has_extension(p, "qvnote"))
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Reads one note directory's `meta.json` and `content.json`.
pub fn read_note(note_path: &Path) -> Result<NoteRecord> {
    let meta: NoteMeta = read_json(&note_path.join("meta.json"))?;
    let content: NoteContent = read_json(&note_path.join("content.json"))?;
    Ok(NoteRecord { meta, content })
}

/// Reads only a note's `meta.json`, for a best-effort title when the full
/// record cannot be loaded.
pub fn read_note_meta(note_path: &Path) -> Result<NoteMeta> {
    read_json(&note_path.join("meta.json"))
}

/// Enumerates binary attachment files under a note's `resources/` directory.
///
/// Attachments are not imported by this pipeline; callers may log or count
/// them. A missing `resources/` directory yields an empty list.
pub fn note_resources(note_path: &Path) -> Vec<PathBuf> {
    let dir = note_path.join("resources");
    match fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// The directory's file stem, used as a best-effort display title for
/// entries whose metadata is unreadable.
pub fn directory_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("(unknown)")
        .to_string()
}
