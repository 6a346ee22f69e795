#![allow(clippy::unwrap_used, clippy::expect_used)]

use crudkit_security::SecurityContext;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use crate::config::NotesConfig;
use crate::domain::dto::NoteDto;
use crate::module::NotesModule;

/// Create an in-memory database for testing.
pub async fn inmem_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    Database::connect(opts)
        .await
        .expect("Failed to connect to in-memory database")
}

pub async fn ready_module() -> NotesModule {
    let module = NotesModule::default();
    module
        .init(inmem_db().await, NotesConfig::default())
        .await
        .expect("Failed to init notes module");
    module
}

#[must_use]
pub fn ctx_for_tenant(tenant: i64) -> SecurityContext {
    SecurityContext::builder()
        .subject_id(Uuid::new_v4())
        .tenant_id(tenant)
        .build()
}

#[must_use]
pub fn dto(id: Option<i64>, title: &str, body: &str) -> NoteDto {
    NoteDto {
        id,
        title: title.to_owned(),
        body: Some(body.to_owned()),
    }
}
