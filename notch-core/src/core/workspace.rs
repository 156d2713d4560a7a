//! High-level workspace operations over a Notch SQLite database.

use crate::{Cell, CellKind, DiagramKind, Note, Notebook, NotchError, Result, Storage, Tag};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

/// An open Notch workspace backed by a SQLite database.
///
/// `Workspace` is the primary interface for all document mutations and is
/// the store handle threaded through the import pipeline. It owns a
/// [`Storage`] connection; callers open it at startup and keep it for the
/// lifetime of the process.
pub struct Workspace {
    storage: Storage,
}

/// Current wall-clock time in epoch milliseconds.
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn map_notebook_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notebook> {
    Ok(Notebook {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        position: row.get(3)?,
    })
}

fn map_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        notebook_id: row.get(1)?,
        title: row.get(2)?,
        favorite: row.get::<_, i64>(3)? != 0,
        trashed: row.get::<_, i64>(4)? != 0,
        position: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        source_id: row.get(8)?,
    })
}

fn map_cell_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cell> {
    Ok(Cell {
        id: row.get(0)?,
        note_id: row.get(1)?,
        kind: CellKind::from_str_lossy(&row.get::<_, String>(2)?),
        content: row.get(3)?,
        language: row.get(4)?,
        diagram_kind: row
            .get::<_, Option<String>>(5)?
            .as_deref()
            .and_then(DiagramKind::from_foreign),
        position: row.get(6)?,
    })
}

const NOTE_COLUMNS: &str =
    "id, notebook_id, title, favorite, trashed, position, created_at, updated_at, source_id";
const CELL_COLUMNS: &str = "id, note_id, kind, content, language, diagram_kind, position";

/// Rejects kind/attribute combinations the data model forbids: a language
/// tag belongs to code cells only, a diagram subtype to diagram cells only.
fn validate_cell_attrs(
    kind: CellKind,
    language: Option<&str>,
    diagram_kind: Option<DiagramKind>,
) -> Result<()> {
    if language.is_some() && kind != CellKind::Code {
        return Err(NotchError::ValidationFailed(format!(
            "A language tag is only valid on code cells, not '{}'",
            kind.as_str()
        )));
    }
    if diagram_kind.is_some() && kind != CellKind::Diagram {
        return Err(NotchError::ValidationFailed(format!(
            "A diagram subtype is only valid on diagram cells, not '{}'",
            kind.as_str()
        )));
    }
    Ok(())
}

impl Workspace {
    /// Creates a new workspace database at `path` and initialises the schema.
    ///
    /// # Errors
    ///
    /// Returns [`NotchError::Database`] for any SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::create(path)?;
        Ok(Self { storage })
    }

    /// Opens an existing workspace database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NotchError::InvalidWorkspace`] if the file is not a Notch
    /// database, or [`NotchError::Database`] for any SQLite failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::open(path)?;
        Ok(Self { storage })
    }

    /// Returns the underlying SQLite connection.
    pub fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    // ---- Notebooks ----------------------------------------------------

    /// Creates a notebook named `name`, optionally nested under `parent_id`,
    /// positioned after its last sibling.
    ///
    /// # Errors
    ///
    /// Returns [`NotchError::NotebookNotFound`] if `parent_id` does not
    /// reference an existing notebook. The parent must exist at creation
    /// time; the import resolver orders its work to guarantee this.
    pub fn create_notebook(&mut self, name: &str, parent_id: Option<&str>) -> Result<Notebook> {
        if let Some(pid) = parent_id {
            self.get_notebook(pid)?;
        }

        let position: i32 = self.connection().query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM notebooks WHERE parent_id IS ?",
            [parent_id],
            |row| row.get(0),
        )?;

        let notebook = Notebook {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
            position,
        };

        self.connection().execute(
            "INSERT INTO notebooks (id, name, parent_id, position) VALUES (?, ?, ?, ?)",
            rusqlite::params![notebook.id, notebook.name, notebook.parent_id, notebook.position],
        )?;

        Ok(notebook)
    }

    /// Fetches a single notebook by ID.
    pub fn get_notebook(&self, notebook_id: &str) -> Result<Notebook> {
        self.connection()
            .query_row(
                "SELECT id, name, parent_id, position FROM notebooks WHERE id = ?",
                [notebook_id],
                map_notebook_row,
            )
            .optional()?
            .ok_or_else(|| NotchError::NotebookNotFound(notebook_id.to_string()))
    }

    /// Returns all notebooks, ordered by parent then position.
    pub fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, name, parent_id, position FROM notebooks ORDER BY parent_id, position",
        )?;
        let rows = stmt
            .query_map([], map_notebook_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Returns the display names of all existing notebooks.
    ///
    /// Used by the duplicate detector to compare an incoming library against
    /// local data before any mutation occurs.
    pub fn notebook_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.connection().prepare("SELECT name FROM notebooks")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    // ---- Notes --------------------------------------------------------

    /// Creates a note in `notebook_id`, appended after the notebook's last
    /// note, seeded with a single empty text cell at position 0.
    ///
    /// `source_id` is the foreign identifier of an imported note; it must be
    /// unique across the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`NotchError::NotebookNotFound`] if the notebook does not
    /// exist, or [`NotchError::ValidationFailed`] if `source_id` is already
    /// taken by another note.
    pub fn create_note(
        &mut self,
        notebook_id: &str,
        title: &str,
        source_id: Option<&str>,
    ) -> Result<Note> {
        self.get_notebook(notebook_id)?;

        if let Some(sid) = source_id {
            if self.find_note_by_source_id(sid)?.is_some() {
                return Err(NotchError::ValidationFailed(format!(
                    "A note with source identity '{sid}' already exists"
                )));
            }
        }

        let now = now_ms();
        let position: i32 = self.connection().query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM notes WHERE notebook_id = ?",
            [notebook_id],
            |row| row.get(0),
        )?;

        let note = Note {
            id: Uuid::new_v4().to_string(),
            notebook_id: notebook_id.to_string(),
            title: title.to_string(),
            favorite: false,
            trashed: false,
            position,
            created_at: now,
            updated_at: now,
            source_id: source_id.map(str::to_string),
        };

        let tx = self.storage.connection_mut().transaction()?;
        tx.execute(
            "INSERT INTO notes (id, notebook_id, title, favorite, trashed, position, created_at, updated_at, source_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                note.id,
                note.notebook_id,
                note.title,
                note.favorite,
                note.trashed,
                note.position,
                note.created_at,
                note.updated_at,
                note.source_id,
            ],
        )?;
        // Every new note starts with one empty text cell.
        tx.execute(
            "INSERT INTO cells (id, note_id, kind, content, language, diagram_kind, position)
             VALUES (?, ?, 'text', '', NULL, NULL, 0)",
            rusqlite::params![Uuid::new_v4().to_string(), note.id],
        )?;
        tx.commit()?;

        Ok(note)
    }

    /// Fetches a single note by ID.
    pub fn get_note(&self, note_id: &str) -> Result<Note> {
        self.connection()
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
                [note_id],
                map_note_row,
            )
            .optional()?
            .ok_or_else(|| NotchError::NoteNotFound(note_id.to_string()))
    }

    /// Looks a note up by its retained foreign identifier.
    ///
    /// Hyperlinks authored in the foreign system encode this identifier, so
    /// link resolution goes through here after an import.
    pub fn find_note_by_source_id(&self, source_id: &str) -> Result<Option<Note>> {
        Ok(self
            .connection()
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE source_id = ?"),
                [source_id],
                map_note_row,
            )
            .optional()?)
    }

    /// Returns all notes in `notebook_id`, ordered by position.
    pub fn list_notes(&self, notebook_id: &str) -> Result<Vec<Note>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE notebook_id = ? ORDER BY position"
        ))?;
        let rows = stmt
            .query_map([notebook_id], map_note_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Overwrites a note's creation and update timestamps (epoch ms).
    ///
    /// Import uses this to restore the foreign record's original timestamps
    /// after the note and its cells have been written.
    pub fn update_note_timestamps(
        &mut self,
        note_id: &str,
        created_at: i64,
        updated_at: i64,
    ) -> Result<()> {
        let changed = self.connection().execute(
            "UPDATE notes SET created_at = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![created_at, updated_at, note_id],
        )?;
        if changed == 0 {
            return Err(NotchError::NoteNotFound(note_id.to_string()));
        }
        Ok(())
    }

    /// Sets or clears the favorite flag on a note.
    pub fn set_note_favorite(&mut self, note_id: &str, favorite: bool) -> Result<()> {
        let changed = self.connection().execute(
            "UPDATE notes SET favorite = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![favorite, now_ms(), note_id],
        )?;
        if changed == 0 {
            return Err(NotchError::NoteNotFound(note_id.to_string()));
        }
        Ok(())
    }

    /// Moves a note into or out of the trash (soft delete).
    pub fn set_note_trashed(&mut self, note_id: &str, trashed: bool) -> Result<()> {
        let changed = self.connection().execute(
            "UPDATE notes SET trashed = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![trashed, now_ms(), note_id],
        )?;
        if changed == 0 {
            return Err(NotchError::NoteNotFound(note_id.to_string()));
        }
        Ok(())
    }

    // ---- Cells --------------------------------------------------------

    /// Appends a cell to the end of `note_id`'s cell sequence.
    ///
    /// # Errors
    ///
    /// Returns [`NotchError::ValidationFailed`] if `language` or
    /// `diagram_kind` is set for a kind that does not carry that attribute.
    pub fn create_cell(
        &mut self,
        note_id: &str,
        kind: CellKind,
        content: &str,
        language: Option<&str>,
        diagram_kind: Option<DiagramKind>,
    ) -> Result<Cell> {
        validate_cell_attrs(kind, language, diagram_kind)?;
        self.get_note(note_id)?;

        let position: i32 = self.connection().query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM cells WHERE note_id = ?",
            [note_id],
            |row| row.get(0),
        )?;

        let cell = Cell {
            id: Uuid::new_v4().to_string(),
            note_id: note_id.to_string(),
            kind,
            content: content.to_string(),
            language: language.map(str::to_string),
            diagram_kind,
            position,
        };

        self.connection().execute(
            "INSERT INTO cells (id, note_id, kind, content, language, diagram_kind, position)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                cell.id,
                cell.note_id,
                cell.kind.as_str(),
                cell.content,
                cell.language,
                cell.diagram_kind.map(|d| d.as_str()),
                cell.position,
            ],
        )?;

        Ok(cell)
    }

    /// Inserts a cell at `index` within `note_id`, bumping the positions of
    /// all following cells to keep the sequence dense.
    ///
    /// `index` is clamped to `0..=N`.
    pub fn insert_cell(
        &mut self,
        note_id: &str,
        index: i32,
        kind: CellKind,
        content: &str,
        language: Option<&str>,
        diagram_kind: Option<DiagramKind>,
    ) -> Result<Cell> {
        validate_cell_attrs(kind, language, diagram_kind)?;
        self.get_note(note_id)?;

        let count: i32 = self.connection().query_row(
            "SELECT COUNT(*) FROM cells WHERE note_id = ?",
            [note_id],
            |row| row.get(0),
        )?;
        let index = index.clamp(0, count);

        let cell = Cell {
            id: Uuid::new_v4().to_string(),
            note_id: note_id.to_string(),
            kind,
            content: content.to_string(),
            language: language.map(str::to_string),
            diagram_kind,
            position: index,
        };

        let tx = self.storage.connection_mut().transaction()?;
        tx.execute(
            "UPDATE cells SET position = position + 1 WHERE note_id = ? AND position >= ?",
            rusqlite::params![note_id, index],
        )?;
        tx.execute(
            "INSERT INTO cells (id, note_id, kind, content, language, diagram_kind, position)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                cell.id,
                cell.note_id,
                cell.kind.as_str(),
                cell.content,
                cell.language,
                cell.diagram_kind.map(|d| d.as_str()),
                cell.position,
            ],
        )?;
        tx.commit()?;

        Ok(cell)
    }

    /// Replaces a cell's content and kind-specific attribute.
    pub fn update_cell(
        &mut self,
        cell_id: &str,
        content: &str,
        language: Option<&str>,
        diagram_kind: Option<DiagramKind>,
    ) -> Result<()> {
        let cell = self.get_cell(cell_id)?;
        validate_cell_attrs(cell.kind, language, diagram_kind)?;

        self.connection().execute(
            "UPDATE cells SET content = ?, language = ?, diagram_kind = ? WHERE id = ?",
            rusqlite::params![content, language, diagram_kind.map(|d| d.as_str()), cell_id],
        )?;
        Ok(())
    }

    /// Deletes a cell and closes the gap so positions stay dense.
    pub fn delete_cell(&mut self, cell_id: &str) -> Result<()> {
        let cell = self.get_cell(cell_id)?;

        let tx = self.storage.connection_mut().transaction()?;
        tx.execute("DELETE FROM cells WHERE id = ?", [cell_id])?;
        tx.execute(
            "UPDATE cells SET position = position - 1 WHERE note_id = ? AND position > ?",
            rusqlite::params![cell.note_id, cell.position],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Moves a cell to `new_index` within its note, shifting the cells in
    /// between. `new_index` is clamped to `0..N`.
    pub fn move_cell(&mut self, cell_id: &str, new_index: i32) -> Result<()> {
        let cell = self.get_cell(cell_id)?;
        let count: i32 = self.connection().query_row(
            "SELECT COUNT(*) FROM cells WHERE note_id = ?",
            [&cell.note_id],
            |row| row.get(0),
        )?;
        let new_index = new_index.clamp(0, count - 1);
        if new_index == cell.position {
            return Ok(());
        }

        let tx = self.storage.connection_mut().transaction()?;
        if new_index > cell.position {
            tx.execute(
                "UPDATE cells SET position = position - 1
                 WHERE note_id = ? AND position > ? AND position <= ?",
                rusqlite::params![cell.note_id, cell.position, new_index],
            )?;
        } else {
            tx.execute(
                "UPDATE cells SET position = position + 1
                 WHERE note_id = ? AND position >= ? AND position < ?",
                rusqlite::params![cell.note_id, new_index, cell.position],
            )?;
        }
        tx.execute(
            "UPDATE cells SET position = ? WHERE id = ?",
            rusqlite::params![new_index, cell_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Fetches a single cell by ID.
    pub fn get_cell(&self, cell_id: &str) -> Result<Cell> {
        self.connection()
            .query_row(
                &format!("SELECT {CELL_COLUMNS} FROM cells WHERE id = ?"),
                [cell_id],
                map_cell_row,
            )
            .optional()?
            .ok_or_else(|| NotchError::CellNotFound(cell_id.to_string()))
    }

    /// Returns all cells of `note_id`, ordered by position.
    pub fn list_cells(&self, note_id: &str) -> Result<Vec<Cell>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {CELL_COLUMNS} FROM cells WHERE note_id = ? ORDER BY position"
        ))?;
        let rows = stmt
            .query_map([note_id], map_cell_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ---- Tags ---------------------------------------------------------

    /// Creates a tag. Names are unique, case-sensitively.
    ///
    /// # Errors
    ///
    /// Returns [`NotchError::ValidationFailed`] if the name is already taken.
    pub fn create_tag(&mut self, name: &str) -> Result<Tag> {
        if self.find_tag_by_name(name)?.is_some() {
            return Err(NotchError::ValidationFailed(format!(
                "A tag named '{name}' already exists"
            )));
        }
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        self.connection().execute(
            "INSERT INTO tags (id, name) VALUES (?, ?)",
            rusqlite::params![tag.id, tag.name],
        )?;
        Ok(tag)
    }

    /// Looks a tag up by exact name.
    pub fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        Ok(self
            .connection()
            .query_row(
                "SELECT id, name FROM tags WHERE name = ?",
                [name],
                |row| {
                    Ok(Tag {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    /// Returns the tag named `name`, creating it if it does not exist yet.
    pub fn ensure_tag(&mut self, name: &str) -> Result<Tag> {
        match self.find_tag_by_name(name)? {
            Some(tag) => Ok(tag),
            None => self.create_tag(name),
        }
    }

    /// Associates a tag with a note. Adding the same tag twice is a no-op.
    pub fn add_tag_to_note(&mut self, note_id: &str, tag_id: &str) -> Result<()> {
        self.connection().execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?, ?)",
            rusqlite::params![note_id, tag_id],
        )?;
        Ok(())
    }

    /// Returns the names of all tags on `note_id`, sorted alphabetically.
    pub fn tags_for_note(&self, note_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.connection().prepare(
            "SELECT t.name FROM tags t
             JOIN note_tags nt ON nt.tag_id = t.id
             WHERE nt.note_id = ?
             ORDER BY t.name",
        )?;
        let names = stmt
            .query_map([note_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }
}
