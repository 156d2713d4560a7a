use serde::{Deserialize, Serialize};

/// A note within a notebook.
///
/// `created_at` and `updated_at` are epoch milliseconds. `source_id` holds
/// the foreign identifier of an imported note and is unique across the
/// workspace when present; rich-text hyperlinks authored in the foreign
/// system reference it, so it is retained permanently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub notebook_id: String,
    pub title: String,
    pub favorite: bool,
    pub trashed: bool,
    pub position: i32,
    pub created_at: i64,
    pub updated_at: i64,
    pub source_id: Option<String>,
}
