//! Content cells and their kind enumeration.
//!
//! A note's body is an ordered sequence of [`Cell`]s. Each cell carries a
//! [`CellKind`] tag, an opaque string payload, and at most one kind-specific
//! attribute: a programming-language tag for code cells or a
//! [`DiagramKind`] for diagram cells. The two attributes are mutually
//! exclusive and validated by the workspace on every write.
//!
//! Cell positions within a note form a dense `0..N-1` sequence; the
//! workspace re-packs positions after every insert, delete, and move.

use serde::{Deserialize, Serialize};

/// The content kind of a [`Cell`].
///
/// Serialized as a lowercase string (`"text"`, `"code"`, ...) so the values
/// match both the database column and the front-end's cell-type strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Plain text.
    Text,
    /// Source code, optionally tagged with a language.
    Code,
    /// Markdown markup.
    Markdown,
    /// LaTeX markup.
    Latex,
    /// A text-described diagram, optionally tagged with a [`DiagramKind`].
    Diagram,
}

impl CellKind {
    /// Maps a foreign cell-type token onto the local enumeration.
    ///
    /// Unrecognized tokens degrade to [`CellKind::Text`] rather than erroring.
    #[must_use]
    pub fn from_foreign(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "code" => Self::Code,
            "markdown" => Self::Markdown,
            "latex" => Self::Latex,
            "diagram" => Self::Diagram,
            _ => Self::Text,
        }
    }

    /// The lowercase string stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Latex => "latex",
            Self::Diagram => "diagram",
        }
    }

    /// Parses the stored database string back into a kind.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        Self::from_foreign(s)
    }
}

/// The subtype of a diagram cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    /// A sequence diagram.
    Sequence,
    /// A flowchart.
    Flow,
}

impl DiagramKind {
    /// Maps a foreign diagram-type token onto the local enumeration.
    ///
    /// Both `"flow"` and `"flowchart"` map to [`DiagramKind::Flow`];
    /// unrecognized tokens map to `None` rather than erroring.
    #[must_use]
    pub fn from_foreign(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "sequence" => Some(Self::Sequence),
            "flow" | "flowchart" => Some(Self::Flow),
            _ => None,
        }
    }

    /// The lowercase string stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Flow => "flow",
        }
    }
}

/// One content block within a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: String,
    pub note_id: String,
    pub kind: CellKind,
    pub content: String,
    /// Programming-language tag; only valid when `kind` is [`CellKind::Code`].
    pub language: Option<String>,
    /// Diagram subtype; only valid when `kind` is [`CellKind::Diagram`].
    pub diagram_kind: Option<DiagramKind>,
    pub position: i32,
}
