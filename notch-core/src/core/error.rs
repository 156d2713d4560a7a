//! Error types for the Notch core library.

use thiserror::Error;

/// All errors that can occur within the Notch core library.
#[derive(Debug, Error)]
pub enum NotchError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A notebook ID was requested that does not exist in the database.
    #[error("Notebook not found: {0}")]
    NotebookNotFound(String),

    /// A note ID was requested that does not exist in the database.
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// A cell ID was requested that does not exist in the database.
    #[error("Cell not found: {0}")]
    CellNotFound(String),

    /// A write would violate a data-model invariant (kind/attribute mismatch,
    /// duplicate source identity, and so on).
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The opened file is not a valid Notch workspace.
    #[error("Invalid workspace: {0}")]
    InvalidWorkspace(String),

    /// The notebook declarations in an imported library form a cycle.
    #[error("Cyclic notebook hierarchy involving '{0}'")]
    ImportCycle(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON payload could not be parsed or serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`NotchError`].
pub type Result<T> = std::result::Result<T, NotchError>;

impl NotchError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::NotebookNotFound(_) => "Notebook no longer exists".to_string(),
            Self::NoteNotFound(_) => "Note no longer exists".to_string(),
            Self::CellNotFound(_) => "Cell no longer exists".to_string(),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::InvalidWorkspace(_) => "Could not open workspace file".to_string(),
            Self::ImportCycle(id) => {
                format!("The imported library declares a circular notebook hierarchy ({id})")
            }
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}
