use serde::{Deserialize, Serialize};

use crate::infra::storage::entity::Model as Note;

/// Input for creating or updating a note.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteDto {
    /// Ignored on create.
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// List projection: the title and the start of the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSummary {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
}

const EXCERPT_CHARS: usize = 80;

impl From<Note> for NoteSummary {
    fn from(note: Note) -> Self {
        let excerpt = if note.body.chars().count() > EXCERPT_CHARS {
            let mut cut: String = note.body.chars().take(EXCERPT_CHARS).collect();
            cut.push_str("...");
            cut
        } else {
            note.body
        };
        Self {
            id: note.id,
            title: note.title,
            excerpt,
        }
    }
}
