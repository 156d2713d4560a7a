//! Progress snapshots pushed by the importer.
//!
//! Reporting is purely observational: the sink is called at phase and
//! record boundaries and never gates correctness. Snapshots serialize in
//! camelCase, consistent with all other caller-facing types in this project.

use serde::{Deserialize, Serialize};

/// The importer's state machine phase.
///
/// `Scanning` lasts until the complete notebook metadata set has been read
/// and ordered; only then can a per-notebook walk begin. `Failed` is reached
/// only when the library root itself is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPhase {
    Scanning,
    Importing,
    Done,
    Failed,
}

/// A point-in-time view of import progress.
///
/// `notes_total` is cumulative: it covers the notebooks processed so far
/// plus the current notebook. Note counts are not discoverable without
/// opening every notebook directory, so there is deliberately no up-front
/// grand total and the value grows as the run proceeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub phase: ImportPhase,
    pub current_notebook_name: Option<String>,
    pub current_note_title: Option<String>,
    pub notebooks_total: usize,
    pub notebooks_completed: usize,
    pub notes_total: usize,
    pub notes_completed: usize,
}
