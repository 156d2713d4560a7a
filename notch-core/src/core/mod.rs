//! Internal domain modules for the Notch core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod cell;
pub mod error;
pub mod import;
pub mod note;
pub mod notebook;
pub mod storage;
pub mod tag;
pub mod workspace;

#[doc(inline)]
pub use cell::{Cell, CellKind, DiagramKind};
#[doc(inline)]
pub use error::{NotchError, Result};
#[doc(inline)]
pub use import::{
    import_library, scan_for_duplicates, CancelToken, DuplicateScan, ImportFailure,
    ImportOptions, ImportReport, Importer,
};
#[doc(inline)]
pub use import::progress::{ImportPhase, ImportProgress};
#[doc(inline)]
pub use note::Note;
#[doc(inline)]
pub use notebook::Notebook;
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use tag::Tag;
#[doc(inline)]
pub use workspace::Workspace;
