use crate::Result;
use rusqlite::Connection;
use std::path::Path;

/// The current workspace schema version, recorded in `workspace_meta`.
const SCHEMA_VERSION: &str = "1";

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.execute(
            "INSERT INTO workspace_meta (key, value) VALUES (?, ?)",
            ["schema_version", SCHEMA_VERSION],
        )?;
        Ok(Self { conn })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Validate database structure
        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type='table'
             AND name IN ('notebooks', 'notes', 'cells', 'tags', 'note_tags', 'workspace_meta')",
            [],
            |row| row.get(0),
        )?;

        if table_count != 6 {
            return Err(crate::NotchError::InvalidWorkspace(
                "Not a valid Notch database".to_string(),
            ));
        }

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
