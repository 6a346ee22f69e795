#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Notes module
//!
//! Tenant-scoped, soft-deletable notes served through a crudkit
//! [`CrudService`](crudkit::CrudService).
//!
//! - `domain/` - DTOs, projections and the service hooks (normalization,
//!   validation, permissions)
//! - `infra/storage/` - the `notes` sea-orm entity and its migrations
//! - `module.rs` - startup (migrations, row filter registration) and
//!   per-request service construction

pub mod config;
pub mod domain;
pub mod infra;
pub mod module;

pub use config::NotesConfig;
pub use domain::dto::{NoteDto, NoteSummary};
pub use domain::hooks::notes_hooks;
pub use infra::storage::entity::Model as Note;
pub use module::{NoteService, NotesModule};

#[cfg(test)]
pub(crate) mod test_support;
