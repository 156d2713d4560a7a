use serde::{Deserialize, Serialize};

/// A notebook: a named container of notes, optionally nested under a parent
/// notebook. Notebooks form a forest; the parent reference must point at an
/// existing notebook at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub position: i32,
}
