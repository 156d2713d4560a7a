use serde::{Deserialize, Serialize};

/// A tag. Names are unique across the workspace, case-sensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}
