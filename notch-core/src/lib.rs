//! Core library for Notch — a notebook-based note-taking application.
//!
//! The primary entry point is [`Workspace`], which represents an open Notch
//! database file. All document mutations go through `Workspace` methods.
//!
//! The [`core::import`] module holds the Quiver library import pipeline:
//! [`scan_for_duplicates`] for the read-only pre-import check and
//! [`Importer`] / [`import_library`] for the two-phase import run.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    cell::{Cell, CellKind, DiagramKind},
    error::{NotchError, Result},
    import::{
        import_library, scan_for_duplicates, CancelToken, DuplicateScan, ImportFailure,
        ImportOptions, ImportReport, Importer,
    },
    import::progress::{ImportPhase, ImportProgress},
    note::Note,
    notebook::Notebook,
    storage::Storage,
    tag::Tag,
    workspace::Workspace,
};
