use crudkit::{AccessDenied, Operation, ServiceHooks, ValidationSink};
use crudkit_security::SecurityContext;

use super::dto::NoteDto;
use crate::infra::storage::entity::Model as Note;

pub(crate) mod fields {
    pub const TITLE: &str = "Title";
    pub const BODY: &str = "Body";
}

/// Per-entity behavior of the notes service.
#[must_use]
pub fn notes_hooks(max_title_length: usize, max_body_length: usize) -> ServiceHooks<Note, NoteDto> {
    ServiceHooks::new(|dto: NoteDto| {
        Ok(Note {
            id: dto.id.unwrap_or_default(),
            title: dto.title,
            body: dto.body.unwrap_or_default(),
        })
    })
    .standardize(|mut note: Note| {
        note.title = note.title.trim().to_owned();
        note.body = note.body.trim().to_owned();
        note
    })
    .validate(move |note: &Note, sink: &ValidationSink| {
        if note.title.is_empty() {
            sink.add_error(fields::TITLE, "Title is required.");
        } else if note.title.chars().count() > max_title_length {
            sink.add_error(
                fields::TITLE,
                format!("Title must be at most {max_title_length} characters."),
            );
        }
        if note.body.chars().count() > max_body_length {
            sink.add_error(
                fields::BODY,
                format!("Body must be at most {max_body_length} characters."),
            );
        }
    })
    .check_permission(|ctx: &SecurityContext, operation: Operation| {
        if operation.is_write() && ctx.is_anonymous() {
            return Err(AccessDenied::new(format!("sign in to {operation} notes")));
        }
        Ok(())
    })
}
