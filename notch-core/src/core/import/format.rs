//! Foreign Quiver metadata formats and their normalization.
//!
//! Quiver libraries store JSON that is almost, but not quite, valid: string
//! payloads may contain raw `\xHH` hex escapes, which JSON does not define.
//! [`parse_repaired`] rewrites those to `\u00HH` before handing the payload
//! to serde. Foreign enum tokens (cell type, diagram type) are mapped onto
//! the local type system with safe defaults for anything unrecognized.

use crate::{CellKind, DiagramKind};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;

/// `meta.json` of a `*.qvnotebook` directory.
#[derive(Debug, Clone, Deserialize)]
pub struct NotebookMeta {
    pub name: String,
    pub uuid: String,
    /// Foreign UUIDs of child notebooks, used to rebuild the hierarchy.
    #[serde(default)]
    pub children: Vec<String>,
}

/// `meta.json` of a `*.qvnote` directory.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteMeta {
    pub title: String,
    pub uuid: String,
    /// Epoch seconds; local timestamps are epoch milliseconds.
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `content.json` of a `*.qvnote` directory.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteContent {
    pub title: String,
    #[serde(default)]
    pub cells: Vec<ForeignCell>,
}

/// One content block as declared by the foreign format.
#[derive(Debug, Clone, Deserialize)]
pub struct ForeignCell {
    #[serde(rename = "type")]
    pub cell_type: String,
    pub language: Option<String>,
    #[serde(rename = "diagramType")]
    pub diagram_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

impl ForeignCell {
    /// The local kind this block maps to; unrecognized types become text.
    pub fn kind(&self) -> CellKind {
        CellKind::from_foreign(&self.cell_type)
    }

    /// The language tag, kept only for code blocks.
    pub fn normalized_language(&self) -> Option<&str> {
        if self.kind() == CellKind::Code {
            self.language.as_deref()
        } else {
            None
        }
    }

    /// The diagram subtype, kept only for diagram blocks; unrecognized or
    /// absent subtypes become unset.
    pub fn normalized_diagram_kind(&self) -> Option<DiagramKind> {
        if self.kind() == CellKind::Diagram {
            self.diagram_type
                .as_deref()
                .and_then(DiagramKind::from_foreign)
        } else {
            None
        }
    }
}

/// Rewrites raw `\xHH` hex escapes to the `\u00HH` form JSON accepts.
///
/// Already-escaped backslashes (`\\x...`) are left alone: the pattern only
/// fires on an odd run of backslashes followed by `xHH`.
pub fn repair_hex_escapes(raw: &str) -> String {
    static HEX_ESCAPE: OnceLock<Regex> = OnceLock::new();
    let re = HEX_ESCAPE.get_or_init(|| {
        Regex::new(r"(?P<prefix>(?:^|[^\\])(?:\\\\)*)\\x(?P<hex>[0-9a-fA-F]{2})")
            .expect("hex escape pattern is valid")
    });
    // Two passes: adjacent matches can share their boundary character, which
    // a single replace_all pass would miss.
    let once = re.replace_all(raw, "$prefix\\u00$hex");
    re.replace_all(&once, "$prefix\\u00$hex").into_owned()
}

/// Repairs known-invalid escapes in `raw` and parses it as `T`.
pub fn parse_repaired<T: DeserializeOwned>(raw: &str) -> serde_json::Result<T> {
    serde_json::from_str(&repair_hex_escapes(raw))
}
